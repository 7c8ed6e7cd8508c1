//! HID usage pages and usage identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A HID usage: 16-bit page plus 16-bit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Usage {
    pub page: u16,
    pub id: u16,
}

impl Usage {
    pub const fn new(page: u16, id: u16) -> Self {
        Self { page, id }
    }

    /// Split a 32-bit extended usage (page in the high half).
    pub const fn from_extended(raw: u32) -> Self {
        Self {
            page: (raw >> 16) as u16,
            id: (raw & 0xFFFF) as u16,
        }
    }

    pub const fn extended(self) -> u32 {
        ((self.page as u32) << 16) | self.id as u32
    }

    /// Inclusive range test; both bounds must be on this usage's page.
    pub fn in_range(self, min: Usage, max: Usage) -> bool {
        self.page == min.page && self.page == max.page && min.id <= self.id && self.id <= max.id
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}:{:#06x}", self.page, self.id)
    }
}

pub mod page {
    pub const GENERIC_DESKTOP: u16 = 0x01;
    pub const KEYBOARD: u16 = 0x07;
    pub const LED: u16 = 0x08;
    pub const BUTTON: u16 = 0x09;
    pub const CONSUMER: u16 = 0x0C;
    pub const DIGITIZERS: u16 = 0x0D;
}

/// Generic Desktop page (0x01).
pub mod generic_desktop {
    use super::{Usage, page::GENERIC_DESKTOP};

    const fn gd(id: u16) -> Usage {
        Usage::new(GENERIC_DESKTOP, id)
    }

    pub const POINTER: Usage = gd(0x01);
    pub const MOUSE: Usage = gd(0x02);
    pub const JOYSTICK: Usage = gd(0x04);
    pub const GAMEPAD: Usage = gd(0x05);
    pub const KEYBOARD: Usage = gd(0x06);
    pub const X: Usage = gd(0x30);
    pub const Y: Usage = gd(0x31);
    pub const Z: Usage = gd(0x32);
    pub const RX: Usage = gd(0x33);
    pub const RY: Usage = gd(0x34);
    pub const RZ: Usage = gd(0x35);
    pub const WHEEL: Usage = gd(0x38);
    pub const SYSTEM_CONTROL: Usage = gd(0x80);
    pub const SYSTEM_POWER_DOWN: Usage = gd(0x81);
    pub const SYSTEM_SLEEP: Usage = gd(0x82);
    pub const SYSTEM_WAKEUP: Usage = gd(0x83);
    pub const SYSTEM_CONTEXT_MENU: Usage = gd(0x84);
    pub const SYSTEM_MAIN_MENU: Usage = gd(0x85);
    pub const SYSTEM_APP_MENU: Usage = gd(0x86);
    pub const SYSTEM_MENU_HELP: Usage = gd(0x87);
    pub const SYSTEM_MENU_EXIT: Usage = gd(0x88);
    pub const SYSTEM_MENU_SELECT: Usage = gd(0x89);
    pub const SYSTEM_MENU_RIGHT: Usage = gd(0x8A);
    pub const SYSTEM_MENU_LEFT: Usage = gd(0x8B);
    pub const SYSTEM_MENU_UP: Usage = gd(0x8C);
    pub const SYSTEM_MENU_DOWN: Usage = gd(0x8D);
    pub const SYSTEM_POWER_UP: Usage = gd(0x8E);
    pub const SYSTEM_RESTART: Usage = gd(0x8F);
}

/// Digitizers page (0x0D).
pub mod digitizers {
    use super::{Usage, page::DIGITIZERS};

    const fn dig(id: u16) -> Usage {
        Usage::new(DIGITIZERS, id)
    }

    pub const DIGITIZER: Usage = dig(0x01);
    pub const PEN: Usage = dig(0x02);
    pub const TOUCH_SCREEN: Usage = dig(0x04);
    pub const STYLUS: Usage = dig(0x20);
    pub const TIP_PRESSURE: Usage = dig(0x30);
    pub const IN_RANGE: Usage = dig(0x32);
    pub const TOUCH: Usage = dig(0x33);
    pub const BATTERY_STRENGTH: Usage = dig(0x3B);
    pub const INVERT: Usage = dig(0x3C);
    pub const X_TILT: Usage = dig(0x3D);
    pub const Y_TILT: Usage = dig(0x3E);
    pub const TIP_SWITCH: Usage = dig(0x42);
    pub const SEC_TIP_SWITCH: Usage = dig(0x43);
    pub const BARREL_SWITCH: Usage = dig(0x44);
    pub const ERASER: Usage = dig(0x45);
    pub const TABLET_PICK: Usage = dig(0x46);
    pub const SEC_BARREL_SWITCH: Usage = dig(0x5A);
}

/// Consumer page (0x0C).
pub mod consumer {
    use super::{Usage, page::CONSUMER};

    pub const CONSUMER_CONTROL: Usage = Usage::new(CONSUMER, 0x01);
    pub const PLAY_PAUSE: Usage = Usage::new(CONSUMER, 0xCD);
    pub const MUTE: Usage = Usage::new(CONSUMER, 0xE2);
    pub const VOLUME_INCREMENT: Usage = Usage::new(CONSUMER, 0xE9);
    pub const VOLUME_DECREMENT: Usage = Usage::new(CONSUMER, 0xEA);
}

/// Button page (0x09): button `n` is usage id `n`.
pub const fn button(n: u16) -> Usage {
    Usage::new(page::BUTTON, n)
}

/// Keyboard/Keypad page (0x07).
pub const fn keyboard(id: u16) -> Usage {
    Usage::new(page::KEYBOARD, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_usage_roundtrip() {
        let usage = Usage::from_extended(0x000D_0042);
        assert_eq!(usage, digitizers::TIP_SWITCH);
        assert_eq!(usage.extended(), 0x000D_0042);
    }

    #[test]
    fn test_in_range_requires_same_page() {
        let min = keyboard(0x04);
        let max = keyboard(0x07);
        assert!(keyboard(0x04).in_range(min, max));
        assert!(keyboard(0x07).in_range(min, max));
        assert!(!keyboard(0x08).in_range(min, max));
        assert!(!button(0x05).in_range(min, max));
    }

    #[test]
    fn test_display() {
        assert_eq!(generic_desktop::X.to_string(), "0x0001:0x0030");
    }
}
