//! Common types shared by the configuration model and the engine

use alloc::string::{String, ToString};
use core::fmt;

use embassy_time::Duration;

/// Name of a GPIO line as written in the configuration ("GP0", "LED", ...)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(String);

impl PinId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// USB HID keyboard usage ID (page 0x07)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keycode(pub u8);

impl Keycode {
    pub const LEFT_CONTROL: Keycode = Keycode(0xE0);
    pub const RIGHT_GUI: Keycode = Keycode(0xE7);

    /// Modifier keys live in the report's modifier byte, not the key array.
    pub fn is_modifier(self) -> bool {
        (Self::LEFT_CONTROL.0..=Self::RIGHT_GUI.0).contains(&self.0)
    }

    /// Bit of this modifier inside the report's modifier byte.
    pub fn modifier_bit(self) -> Option<u8> {
        self.is_modifier()
            .then(|| 1 << (self.0 - Self::LEFT_CONTROL.0))
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// One step of a macro sequence, resolved at configuration load
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroStep {
    /// Assert the keycode on the host-visible report
    Press(Keycode),
    /// Release the keycode
    Release(Keycode),
    /// Block the whole engine for the given time
    Delay(Duration),
}
