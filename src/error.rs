//! Fatal engine errors
//!
//! Anything that surfaces as an [`EngineError`] stops the engine. The firmware
//! reports it and falls back to the fault blink.

use crate::config::ConfigError;
use crate::hid::HidError;
use crate::pins::PinError;
use crate::types::PinId;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Error initializing button: {0}")]
    Pin(#[from] PinError),
    #[error("Error reading GPIO {0}")]
    Read(PinId),
    #[error("Error writing GPIO {0}")]
    Write(PinId),
    #[error("Keyboard error: {0}")]
    Hid(#[from] HidError),
}
