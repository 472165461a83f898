//! USB HID keyboard capability
//!
//! [`HidKeyboard`] is what the macro dispatcher talks to. [`ReportKeyboard`]
//! implements it on top of a boot-protocol keyboard report: six key slots plus
//! a modifier byte, re-sent to the host after every change.

use heapless::Vec;
use usbd_hid::descriptor::KeyboardReport;

use crate::types::Keycode;

/// Number of non-modifier keys a boot keyboard report can hold
pub const ROLLOVER: usize = 6;

/// HID transport failure
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidError {
    /// A seventh non-modifier key was pressed
    #[error("trying to press more than six keys at once (keycode {0})")]
    Rollover(Keycode),
    /// The report could not be handed to the USB stack
    #[error("keyboard report could not be sent")]
    Transport,
}

/// Host-visible keyboard
pub trait HidKeyboard {
    fn press(&mut self, keycode: Keycode) -> Result<(), HidError>;
    fn release(&mut self, keycode: Keycode) -> Result<(), HidError>;
}

/// Destination for finished keyboard reports
pub trait ReportSink {
    fn send(&mut self, report: &KeyboardReport) -> Result<(), HidError>;
}

/// Pressed-key bookkeeping for one keyboard report
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    modifier: u8,
    keys: Vec<u8, ROLLOVER>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns whether the report changed.
    pub fn press(&mut self, keycode: Keycode) -> Result<bool, HidError> {
        if let Some(bit) = keycode.modifier_bit() {
            let changed = self.modifier & bit == 0;
            self.modifier |= bit;
            return Ok(changed);
        }
        if self.keys.contains(&keycode.0) {
            return Ok(false);
        }
        self.keys
            .push(keycode.0)
            .map_err(|_| HidError::Rollover(keycode))?;
        Ok(true)
    }

    /// Drop a key. Returns whether the report changed.
    pub fn release(&mut self, keycode: Keycode) -> bool {
        if let Some(bit) = keycode.modifier_bit() {
            let changed = self.modifier & bit != 0;
            self.modifier &= !bit;
            return changed;
        }
        match self.keys.iter().position(|&k| k == keycode.0) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_pressed(&self, keycode: Keycode) -> bool {
        match keycode.modifier_bit() {
            Some(bit) => self.modifier & bit != 0,
            None => self.keys.contains(&keycode.0),
        }
    }

    pub fn report(&self) -> KeyboardReport {
        let mut keycodes = [0u8; ROLLOVER];
        keycodes[..self.keys.len()].copy_from_slice(&self.keys);
        KeyboardReport {
            modifier: self.modifier,
            reserved: 0,
            leds: 0,
            keycodes,
        }
    }
}

/// [`HidKeyboard`] that emits a full report on every change
pub struct ReportKeyboard<S> {
    state: KeyboardState,
    sink: S,
}

impl<S: ReportSink> ReportKeyboard<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: KeyboardState::new(),
            sink,
        }
    }

    pub fn state(&self) -> &KeyboardState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: ReportSink> HidKeyboard for ReportKeyboard<S> {
    fn press(&mut self, keycode: Keycode) -> Result<(), HidError> {
        if self.state.press(keycode)? {
            self.sink.send(&self.state.report())?;
        }
        Ok(())
    }

    fn release(&mut self, keycode: Keycode) -> Result<(), HidError> {
        if self.state.release(keycode) {
            self.sink.send(&self.state.report())?;
        }
        Ok(())
    }
}
