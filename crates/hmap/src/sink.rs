//! Evdev sink interface and the adapter that fronts it.
//!
//! [`SinkAdapter`] keeps the per-code state an evdev device keeps: key
//! events that do not change a key, zero relative motion and repeated
//! absolute values are dropped before they reach the wrapped sink, as are
//! events for codes that were never announced.

use crate::codes::{
    ABS_CNT, EV_ABS, EV_CNT, EV_KEY, EV_REL, EV_SYN, INPUT_PROP_CNT, KEY_CNT, REL_CNT,
};
use crate::error::SinkError;
use bit_vec::BitVec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Bus, vendor, product and version of an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// Range description of an absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbsInfo {
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    pub const fn new(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            fuzz: 0,
            flat: 0,
            resolution: 0,
        }
    }
}

/// Consumer of announcements and input events.
pub trait EvdevSink {
    fn set_name(&mut self, name: &str);

    fn set_id(&mut self, id: InputId);

    fn support_event(&mut self, ev_type: u16);

    fn support_key(&mut self, code: u16);

    fn support_rel(&mut self, code: u16);

    fn support_abs(&mut self, code: u16, info: AbsInfo);

    fn support_prop(&mut self, prop: u16);

    fn push_event(&mut self, ev_type: u16, code: u16, value: i32);

    /// Close the current event frame (`SYN_REPORT`).
    fn sync(&mut self);

    /// Make the device visible to consumers.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink cannot be published.
    fn register(&mut self) -> Result<(), SinkError>;

    fn unregister(&mut self);
}

/// Stateful front of an [`EvdevSink`].
#[derive(Debug)]
pub struct SinkAdapter<S> {
    inner: S,
    types: BitVec,
    keys: BitVec,
    rels: BitVec,
    abs: BitVec,
    props: BitVec,
    key_state: BitVec,
    abs_state: [i32; ABS_CNT],
    registered: bool,
}

impl<S: EvdevSink> SinkAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            types: BitVec::from_elem(EV_CNT, false),
            keys: BitVec::from_elem(KEY_CNT, false),
            rels: BitVec::from_elem(REL_CNT, false),
            abs: BitVec::from_elem(ABS_CNT, false),
            props: BitVec::from_elem(INPUT_PROP_CNT, false),
            key_state: BitVec::from_elem(KEY_CNT, false),
            abs_state: [0; ABS_CNT],
            registered: false,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn supports_event(&self, ev_type: u16) -> bool {
        self.types.get(usize::from(ev_type)).unwrap_or(false)
    }

    pub fn supports_key(&self, code: u16) -> bool {
        self.keys.get(usize::from(code)).unwrap_or(false)
    }

    pub fn has_prop(&self, prop: u16) -> bool {
        self.props.get(usize::from(prop)).unwrap_or(false)
    }

    /// Current state of a key as last forwarded.
    pub fn key_down(&self, code: u16) -> bool {
        self.key_state.get(usize::from(code)).unwrap_or(false)
    }

    /// Forget announcements and per-code state.
    pub fn reset(&mut self) {
        for bits in [
            &mut self.types,
            &mut self.keys,
            &mut self.rels,
            &mut self.abs,
            &mut self.props,
            &mut self.key_state,
        ] {
            for idx in 0..bits.len() {
                bits.set(idx, false);
            }
        }
        self.abs_state = [0; ABS_CNT];
    }

    fn code_supported(&self, ev_type: u16, code: u16) -> bool {
        let code = usize::from(code);
        match ev_type {
            EV_KEY => self.keys.get(code).unwrap_or(false),
            EV_REL => self.rels.get(code).unwrap_or(false),
            EV_ABS => self.abs.get(code).unwrap_or(false),
            _ => true,
        }
    }

    /// Apply evdev filtering; returns true when the event must be forwarded.
    fn filter(&mut self, ev_type: u16, code: u16, value: i32) -> bool {
        if !self.supports_event(ev_type) || !self.code_supported(ev_type, code) {
            return false;
        }
        let idx = usize::from(code);
        match ev_type {
            EV_KEY => {
                // Autorepeat (2) always passes.
                if value == 2 {
                    return true;
                }
                let down = value != 0;
                if self.key_state.get(idx) == Some(down) {
                    return false;
                }
                self.key_state.set(idx, down);
                true
            }
            EV_REL => value != 0,
            EV_ABS => match self.abs_state.get_mut(idx) {
                Some(last) if *last == value => false,
                Some(last) => {
                    *last = value;
                    true
                }
                None => false,
            },
            _ => true,
        }
    }
}

impl<S: EvdevSink> EvdevSink for SinkAdapter<S> {
    fn set_name(&mut self, name: &str) {
        self.inner.set_name(name);
    }

    fn set_id(&mut self, id: InputId) {
        self.inner.set_id(id);
    }

    fn support_event(&mut self, ev_type: u16) {
        let idx = usize::from(ev_type);
        if idx < EV_CNT && !self.types.get(idx).unwrap_or(false) {
            self.types.set(idx, true);
            self.inner.support_event(ev_type);
        }
    }

    fn support_key(&mut self, code: u16) {
        let idx = usize::from(code);
        if idx < KEY_CNT && !self.keys.get(idx).unwrap_or(false) {
            self.keys.set(idx, true);
            self.inner.support_key(code);
        }
    }

    fn support_rel(&mut self, code: u16) {
        let idx = usize::from(code);
        if idx < REL_CNT && !self.rels.get(idx).unwrap_or(false) {
            self.rels.set(idx, true);
            self.inner.support_rel(code);
        }
    }

    fn support_abs(&mut self, code: u16, info: AbsInfo) {
        let idx = usize::from(code);
        if idx < ABS_CNT && !self.abs.get(idx).unwrap_or(false) {
            self.abs.set(idx, true);
            self.inner.support_abs(code, info);
        }
    }

    fn support_prop(&mut self, prop: u16) {
        let idx = usize::from(prop);
        if idx < INPUT_PROP_CNT && !self.props.get(idx).unwrap_or(false) {
            self.props.set(idx, true);
            self.inner.support_prop(prop);
        }
    }

    #[inline]
    fn push_event(&mut self, ev_type: u16, code: u16, value: i32) {
        if self.filter(ev_type, code, value) {
            self.inner.push_event(ev_type, code, value);
        } else {
            trace!(
                "Filtered event type={:#x} code={:#x} value={}",
                ev_type, code, value
            );
        }
    }

    #[inline]
    fn sync(&mut self) {
        self.inner.sync();
    }

    fn register(&mut self) -> Result<(), SinkError> {
        if self.registered {
            return Err(SinkError::AlreadyRegistered);
        }
        self.types.set(usize::from(EV_SYN), true);
        self.inner.register()?;
        self.registered = true;
        debug!("Evdev sink registered");
        Ok(())
    }

    fn unregister(&mut self) {
        if self.registered {
            self.inner.unregister();
            self.registered = false;
            debug!("Evdev sink unregistered");
        }
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ABS_X, BTN_LEFT, EV_PWR, REL_X};

    #[derive(Debug, Default)]
    struct VecSink {
        events: Vec<(u16, u16, i32)>,
        keys: Vec<u16>,
        syncs: usize,
        fail_register: bool,
        unregistered: usize,
    }

    impl EvdevSink for VecSink {
        fn set_name(&mut self, _name: &str) {}
        fn set_id(&mut self, _id: InputId) {}
        fn support_event(&mut self, _ev_type: u16) {}
        fn support_key(&mut self, code: u16) {
            self.keys.push(code);
        }
        fn support_rel(&mut self, _code: u16) {}
        fn support_abs(&mut self, _code: u16, _info: AbsInfo) {}
        fn support_prop(&mut self, _prop: u16) {}
        fn push_event(&mut self, ev_type: u16, code: u16, value: i32) {
            self.events.push((ev_type, code, value));
        }
        fn sync(&mut self) {
            self.syncs += 1;
        }
        fn register(&mut self) -> Result<(), SinkError> {
            if self.fail_register {
                Err(SinkError::RegistrationFailed("busy".to_string()))
            } else {
                Ok(())
            }
        }
        fn unregister(&mut self) {
            self.unregistered += 1;
        }
    }

    fn adapter() -> SinkAdapter<VecSink> {
        let mut sink = SinkAdapter::new(VecSink::default());
        sink.support_event(EV_KEY);
        sink.support_key(BTN_LEFT);
        sink.support_event(EV_REL);
        sink.support_rel(REL_X);
        sink.support_event(EV_ABS);
        sink.support_abs(ABS_X, AbsInfo::new(0, 100));
        sink
    }

    #[test]
    fn test_duplicate_announcements_forwarded_once() {
        let mut sink = adapter();
        sink.support_key(BTN_LEFT);
        assert_eq!(sink.inner().keys, vec![BTN_LEFT]);
    }

    #[test]
    fn test_key_state_filtering() {
        let mut sink = adapter();
        sink.push_event(EV_KEY, BTN_LEFT, 0);
        sink.push_event(EV_KEY, BTN_LEFT, 1);
        sink.push_event(EV_KEY, BTN_LEFT, 1);
        sink.push_event(EV_KEY, BTN_LEFT, 0);
        assert_eq!(
            sink.inner().events,
            vec![(EV_KEY, BTN_LEFT, 1), (EV_KEY, BTN_LEFT, 0)]
        );
        assert!(!sink.key_down(BTN_LEFT));
    }

    #[test]
    fn test_rel_and_abs_filtering() {
        let mut sink = adapter();
        sink.push_event(EV_REL, REL_X, 0);
        sink.push_event(EV_REL, REL_X, 3);
        sink.push_event(EV_REL, REL_X, 3);
        sink.push_event(EV_ABS, ABS_X, 50);
        sink.push_event(EV_ABS, ABS_X, 50);
        assert_eq!(
            sink.inner().events,
            vec![(EV_REL, REL_X, 3), (EV_REL, REL_X, 3), (EV_ABS, ABS_X, 50)]
        );
    }

    #[test]
    fn test_unannounced_events_dropped() {
        let mut sink = adapter();
        sink.push_event(EV_PWR, 0, 1);
        sink.push_event(EV_KEY, BTN_LEFT + 1, 1);
        assert!(sink.inner().events.is_empty());
    }

    #[test]
    fn test_sync_always_forwarded() {
        let mut sink = adapter();
        sink.sync();
        sink.sync();
        assert_eq!(sink.inner().syncs, 2);
    }

    #[test]
    fn test_register_failure_leaves_unregistered() {
        let mut sink = SinkAdapter::new(VecSink {
            fail_register: true,
            ..VecSink::default()
        });
        assert!(sink.register().is_err());
        assert!(!sink.is_registered());
        sink.unregister();
        assert_eq!(sink.inner().unregistered, 0);
    }

    #[test]
    fn test_unregister_resets_state() -> Result<(), SinkError> {
        let mut sink = adapter();
        sink.register()?;
        sink.push_event(EV_KEY, BTN_LEFT, 1);
        sink.unregister();
        assert!(!sink.key_down(BTN_LEFT));
        assert!(!sink.supports_key(BTN_LEFT));
        assert_eq!(sink.inner().unregistered, 1);
        Ok(())
    }
}
