//! Control actions
//!
//! Controls are buttons bound to something other than a keystroke macro. They
//! fire once per press edge and never repeat.

use alloc::vec::Vec;

use embedded_hal::digital::{OutputPin, PinState};

use crate::constants::PROBE_FILE;
use crate::error::EngineError;
use crate::storage::{Storage, StorageError};
use crate::types::PinId;

// ===================================================================
// Actions
// ===================================================================

/// Action a control button triggers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    /// Flip every configured LED
    ToggleLeds,
    /// Reset into reprogramming mode if storage is writable
    Program,
}

impl ControlAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "led" => Some(Self::ToggleLeds),
            "program" => Some(Self::Program),
            _ => None,
        }
    }
}

// ===================================================================
// LEDs
// ===================================================================

/// An indicator output and the level last written to it
pub struct Led<O> {
    pin: PinId,
    line: O,
    on: bool,
}

impl<O: OutputPin> Led<O> {
    /// Wrap a line that is already driven high.
    pub fn new(pin: PinId, line: O) -> Self {
        Self { pin, line, on: true }
    }

    pub fn set(&mut self, on: bool) -> Result<(), EngineError> {
        self.line
            .set_state(PinState::from(on))
            .map_err(|_| EngineError::Write(self.pin.clone()))?;
        self.on = on;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), EngineError> {
        self.set(!self.on)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pin(&self) -> &PinId {
        &self.pin
    }
}

/// All configured indicator LEDs
pub struct LedBank<O> {
    leds: Vec<Led<O>>,
}

impl<O: OutputPin> LedBank<O> {
    pub fn new(leds: Vec<Led<O>>) -> Self {
        Self { leds }
    }

    /// Flip every LED in declaration order.
    pub fn toggle_all(&mut self) -> Result<(), EngineError> {
        for led in &mut self.leds {
            led.toggle()?;
        }
        debug!("Toggled {} leds", self.leds.len());
        Ok(())
    }

    pub fn states(&self) -> Vec<bool> {
        self.leds.iter().map(Led::is_on).collect()
    }

    pub fn len(&self) -> usize {
        self.leds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }
}

// ===================================================================
// Reprogramming
// ===================================================================

/// Device reset capability
pub trait Reset {
    /// Restart the device. Hardware implementations never return.
    fn reset(&mut self);
}

/// Result of a `program` press
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramOutcome {
    /// Storage was writable and a reset was requested
    Resetting,
    /// Storage is still exposed to the host; nothing happened
    NotWritable(StorageError),
}

/// Probe that the device can write its storage, then reset.
///
/// Resetting while the host still owns the drive could corrupt it, so a
/// failed probe only logs and returns.
pub fn program<S: Storage, R: Reset>(storage: &mut S, reset: &mut R) -> ProgramOutcome {
    let probe = storage
        .write(PROBE_FILE, b"")
        .and_then(|()| storage.remove(PROBE_FILE));
    match probe {
        Ok(()) => {
            info!("Storage is writable, resetting");
            reset.reset();
            ProgramOutcome::Resetting
        }
        Err(e) => {
            warn!("File system is not writable by code, it is unsafe to restart ({})", e);
            ProgramOutcome::NotWritable(e)
        }
    }
}
