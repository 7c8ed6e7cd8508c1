//! Probe and attach entry points.

use hmap::usage::digitizers;
use hmap::{EvdevSink, HidTransport, Hmap, HmapError, HmapResult, Usage, UsageMap};
use tracing::debug;

use crate::maps::{DIGITIZER_MAP, PEN_MAP};
use crate::quirks::apply_init_quirks;

/// Which map a top-level collection gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenKind {
    /// Digitizers/Pen: Microsoft pen map with required rows.
    Pen,
    /// Digitizers/Digitizer: generic map.
    Digitizer,
}

impl PenKind {
    /// Classify a top-level collection usage.
    pub fn from_collection(usage: Usage) -> Option<Self> {
        match usage {
            digitizers::PEN => Some(Self::Pen),
            digitizers::DIGITIZER => Some(Self::Digitizer),
            _ => None,
        }
    }

    pub fn map(self) -> UsageMap {
        match self {
            Self::Pen => PEN_MAP,
            Self::Digitizer => DIGITIZER_MAP,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Pen => "Pen",
            Self::Digitizer => "Digitizer",
        }
    }
}

/// Check the top-level collection, add the matching map and set the
/// device description.
///
/// # Errors
///
/// - [`HmapError::UnsupportedCollection`] for anything but Digitizers/Pen or
///   Digitizers/Digitizer
/// - descriptor, transport and required-row errors from the engine
pub fn probe<T: HidTransport, S: EvdevSink>(hmap: &mut Hmap<T, S>) -> HmapResult<PenKind> {
    let usage = hmap.descriptor()?.application().unwrap_or_default();
    let kind = PenKind::from_collection(usage).ok_or(HmapError::UnsupportedCollection { usage })?;

    hmap.add_map(kind.map())?;
    hmap.set_desc(kind.description());
    debug!("hpen: probed {} collection {}", kind.description(), usage);
    Ok(kind)
}

/// Apply device init quirks, then attach.
///
/// # Errors
///
/// Any attach error from [`Hmap::attach`].
pub fn attach<T: HidTransport, S: EvdevSink>(hmap: &mut Hmap<T, S>) -> HmapResult<()> {
    apply_init_quirks(hmap.transport_mut());
    hmap.attach()
}

/// [`probe`] followed by [`attach`].
///
/// # Errors
///
/// See [`probe`] and [`attach`].
pub fn probe_and_attach<T: HidTransport, S: EvdevSink>(
    hmap: &mut Hmap<T, S>,
) -> HmapResult<PenKind> {
    let kind = probe(hmap)?;
    attach(hmap)?;
    Ok(kind)
}
