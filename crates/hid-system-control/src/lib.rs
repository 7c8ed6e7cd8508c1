//! Generic Desktop system-control driver.
//!
//! Maps the System Control top-level collection (power, sleep, wake-up and
//! the system menu usages) to evdev keys.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

use hmap::codes::{
    KEY_CONTEXT_MENU, KEY_DOWN, KEY_EXIT, KEY_HELP, KEY_LEFT, KEY_MENU, KEY_POWER, KEY_POWER2,
    KEY_PROG1, KEY_RESTART, KEY_RIGHT, KEY_SELECT, KEY_SLEEP, KEY_UP, KEY_WAKEUP,
};
use hmap::usage::generic_desktop as gd;
use hmap::{EvdevSink, HidTransport, Hmap, HmapError, HmapResult, MapItem, UsageMap};
use tracing::debug;

pub const DESCRIPTION: &str = "System Control";

pub static SYSTEM_CONTROL_MAP: UsageMap = &[
    MapItem::key("POWER_DOWN", gd::SYSTEM_POWER_DOWN, KEY_POWER),
    MapItem::key("SLEEP", gd::SYSTEM_SLEEP, KEY_SLEEP),
    MapItem::key("WAKEUP", gd::SYSTEM_WAKEUP, KEY_WAKEUP),
    MapItem::key("CONTEXT_MENU", gd::SYSTEM_CONTEXT_MENU, KEY_CONTEXT_MENU),
    MapItem::key("MAIN_MENU", gd::SYSTEM_MAIN_MENU, KEY_MENU),
    MapItem::key("APP_MENU", gd::SYSTEM_APP_MENU, KEY_PROG1),
    MapItem::key("MENU_HELP", gd::SYSTEM_MENU_HELP, KEY_HELP),
    MapItem::key("MENU_EXIT", gd::SYSTEM_MENU_EXIT, KEY_EXIT),
    MapItem::key("MENU_SELECT", gd::SYSTEM_MENU_SELECT, KEY_SELECT),
    MapItem::key("MENU_RIGHT", gd::SYSTEM_MENU_RIGHT, KEY_RIGHT),
    MapItem::key("MENU_LEFT", gd::SYSTEM_MENU_LEFT, KEY_LEFT),
    MapItem::key("MENU_UP", gd::SYSTEM_MENU_UP, KEY_UP),
    MapItem::key("MENU_DOWN", gd::SYSTEM_MENU_DOWN, KEY_DOWN),
    MapItem::key("POWER_UP", gd::SYSTEM_POWER_UP, KEY_POWER2),
    MapItem::key("RESTART", gd::SYSTEM_RESTART, KEY_RESTART),
];

/// Check for a System Control top-level collection and add the map.
///
/// # Errors
///
/// [`HmapError::UnsupportedCollection`] for other collections, plus any
/// descriptor or transport error from the engine.
pub fn probe<T: HidTransport, S: EvdevSink>(hmap: &mut Hmap<T, S>) -> HmapResult<()> {
    let usage = hmap.descriptor()?.application().unwrap_or_default();
    if usage != gd::SYSTEM_CONTROL {
        return Err(HmapError::UnsupportedCollection { usage });
    }
    let caps = hmap.add_map(SYSTEM_CONTROL_MAP)?;
    hmap.set_desc(DESCRIPTION);
    debug!("hsctrl: {} of {} keys bound", caps.count(), SYSTEM_CONTROL_MAP.len());
    Ok(())
}

/// [`probe`] followed by [`Hmap::attach`].
///
/// # Errors
///
/// See [`probe`] and [`Hmap::attach`].
pub fn probe_and_attach<T: HidTransport, S: EvdevSink>(hmap: &mut Hmap<T, S>) -> HmapResult<()> {
    probe(hmap)?;
    hmap.attach()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_has_unique_usages() {
        let mut usages: Vec<_> = SYSTEM_CONTROL_MAP.iter().map(|row| row.usage).collect();
        usages.sort();
        usages.dedup();
        assert_eq!(usages.len(), SYSTEM_CONTROL_MAP.len());
    }

    #[test]
    fn test_all_rows_are_optional_keys() {
        assert!(SYSTEM_CONTROL_MAP.iter().all(|row| row.is_key() && !row.required));
    }
}
