//! Declarative usage maps supplied by child drivers.
//!
//! A map is a `&'static [MapItem]`. Rows are built with the `const`
//! constructors below:
//!
//! ```rust
//! use hmap::codes::{BTN_LEFT, REL_X};
//! use hmap::map::{MapItem, UsageMap};
//! use hmap::usage::{button, generic_desktop};
//!
//! static MOUSE_MAP: UsageMap = &[
//!     MapItem::key("BTN_LEFT", button(1), BTN_LEFT).required(),
//!     MapItem::rel("X", generic_desktop::X, REL_X),
//! ];
//! # assert_eq!(MOUSE_MAP.len(), 2);
//! ```

use crate::codes::{EV_ABS, EV_KEY, EV_REL};
use crate::error::CallbackResult;
use crate::location::Location;
use crate::sink::EvdevSink;
use crate::usage::Usage;

pub type UsageMap = &'static [MapItem];

/// Phase in which a map callback is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState<'a> {
    /// Device attach; announce extra capabilities here.
    Attaching,
    /// A bound item was extracted from a report.
    Running {
        usage: Usage,
        location: &'a Location,
        value: i32,
    },
    /// All records of a report were dispatched (completion rows only).
    ReportDone,
    Detaching,
}

/// Callback signature shared by item and completion rows.
pub type MapCallback = fn(&mut dyn EvdevSink, CallbackState<'_>) -> CallbackResult;

/// Which main-item flavour a row accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelAbs {
    Any,
    Relative,
    Absolute,
}

impl RelAbs {
    pub fn admits(self, relative: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Relative => relative,
            Self::Absolute => !relative,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Payload {
    Event { ev_type: u16, code: u16 },
    Callback(MapCallback),
    Completion(MapCallback),
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event { ev_type, code } => f
                .debug_struct("Event")
                .field("ev_type", ev_type)
                .field("code", code)
                .finish(),
            Self::Callback(_) => f.write_str("Callback"),
            Self::Completion(_) => f.write_str("Completion"),
        }
    }
}

/// One row of a usage map.
#[derive(Debug, Clone, Copy)]
pub struct MapItem {
    pub name: &'static str,
    pub usage: Usage,
    pub payload: Payload,
    pub required: bool,
    pub relabs: RelAbs,
}

impl MapItem {
    const fn event(name: &'static str, usage: Usage, ev_type: u16, code: u16, relabs: RelAbs) -> Self {
        Self {
            name,
            usage,
            payload: Payload::Event { ev_type, code },
            required: false,
            relabs,
        }
    }

    const fn callback(name: &'static str, usage: Usage, cb: MapCallback, relabs: RelAbs) -> Self {
        Self {
            name,
            usage,
            payload: Payload::Callback(cb),
            required: false,
            relabs,
        }
    }

    pub const fn key(name: &'static str, usage: Usage, code: u16) -> Self {
        Self::event(name, usage, EV_KEY, code, RelAbs::Any)
    }

    pub const fn rel(name: &'static str, usage: Usage, code: u16) -> Self {
        Self::event(name, usage, EV_REL, code, RelAbs::Relative)
    }

    pub const fn abs(name: &'static str, usage: Usage, code: u16) -> Self {
        Self::event(name, usage, EV_ABS, code, RelAbs::Absolute)
    }

    pub const fn any_cb(name: &'static str, usage: Usage, cb: MapCallback) -> Self {
        Self::callback(name, usage, cb, RelAbs::Any)
    }

    pub const fn rel_cb(name: &'static str, usage: Usage, cb: MapCallback) -> Self {
        Self::callback(name, usage, cb, RelAbs::Relative)
    }

    pub const fn abs_cb(name: &'static str, usage: Usage, cb: MapCallback) -> Self {
        Self::callback(name, usage, cb, RelAbs::Absolute)
    }

    /// Row invoked once per report after all items, and at attach/detach.
    pub const fn completion(name: &'static str, cb: MapCallback) -> Self {
        Self {
            name,
            usage: Usage::new(0, 0),
            payload: Payload::Completion(cb),
            required: false,
            relabs: RelAbs::Any,
        }
    }

    /// Fail attach when this row binds nothing.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn has_cb(&self) -> bool {
        matches!(self.payload, Payload::Callback(_) | Payload::Completion(_))
    }

    pub const fn is_completion(&self) -> bool {
        matches!(self.payload, Payload::Completion(_))
    }

    /// `(type, code)` of an event row.
    pub const fn event_code(&self) -> Option<(u16, u16)> {
        match self.payload {
            Payload::Event { ev_type, code } => Some((ev_type, code)),
            _ => None,
        }
    }

    pub const fn is_key(&self) -> bool {
        matches!(self.payload, Payload::Event { ev_type: EV_KEY, .. })
    }
}
