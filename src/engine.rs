//! Scan loop
//!
//! [`EngineState`] holds everything built from the configuration: one tracker
//! per key and control plus the LED bank. [`MainLoop`] owns the capabilities
//! (keyboard, delay, clock, storage, reset) and steps the state once per
//! [`MainLoop::tick`]. Everything runs on the caller's thread; macro delays and
//! the repeat pause stall the whole scan.

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::buttons::{InputTracker, Transition};
use crate::clock::Clock;
use crate::config::Configuration;
use crate::constants::{REPEAT_THRESHOLD, REPEAT_THROTTLE};
use crate::controls::{self, ControlAction, Led, LedBank, Reset};
use crate::error::EngineError;
use crate::hid::HidKeyboard;
use crate::pins::PinProvider;
use crate::sequence;
use crate::storage::Storage;
use crate::types::MacroStep;

// ===================================================================
// Engine State
// ===================================================================

/// A key button and the macro it plays
pub struct KeyBinding<I> {
    tracker: InputTracker<I>,
    repeating: bool,
    sequence: Vec<MacroStep>,
}

impl<I> KeyBinding<I> {
    pub fn tracker(&self) -> &InputTracker<I> {
        &self.tracker
    }
}

/// A control button and its action
pub struct ControlBinding<I> {
    tracker: InputTracker<I>,
    action: ControlAction,
}

impl<I> ControlBinding<I> {
    pub fn tracker(&self) -> &InputTracker<I> {
        &self.tracker
    }
}

/// Runtime state derived from a [`Configuration`]
pub struct EngineState<I, O> {
    keys: Vec<KeyBinding<I>>,
    controls: Vec<ControlBinding<I>>,
    leds: LedBank<O>,
}

impl<I: InputPin, O: OutputPin> EngineState<I, O> {
    /// Claim every configured line.
    ///
    /// Keys are registered first, then LEDs (driven on), then controls.
    /// A control with an unknown action still claims its pin but gets no
    /// tracker.
    pub fn build<P, C>(config: &Configuration, pins: &mut P, clock: &C) -> Result<Self, EngineError>
    where
        P: PinProvider<Input = I, Output = O>,
        C: Clock,
    {
        let mut keys = Vec::with_capacity(config.keys.len());
        for key in &config.keys {
            let line = pins.input(&key.gpio)?;
            keys.push(KeyBinding {
                tracker: InputTracker::new(key.gpio.clone(), line, clock.now())?,
                repeating: key.repeating,
                sequence: key.sequence.clone(),
            });
        }

        let mut leds = Vec::with_capacity(config.leds.len());
        for pin in &config.leds {
            let line = pins.output(pin, true)?;
            leds.push(Led::new(pin.clone(), line));
        }

        let mut controls = Vec::with_capacity(config.controls.len());
        for control in &config.controls {
            let line = pins.input(&control.gpio)?;
            let Some(action) = control.action else {
                debug!("Control {} has no action", control.gpio);
                continue;
            };
            controls.push(ControlBinding {
                tracker: InputTracker::new(control.gpio.clone(), line, clock.now())?,
                action,
            });
        }

        info!(
            "Registered {} keys, {} controls, {} leds",
            keys.len(),
            controls.len(),
            leds.len()
        );
        Ok(Self {
            keys,
            controls,
            leds: LedBank::new(leds),
        })
    }
}

impl<I, O> EngineState<I, O> {
    pub fn keys(&self) -> &[KeyBinding<I>] {
        &self.keys
    }

    pub fn controls(&self) -> &[ControlBinding<I>] {
        &self.controls
    }

    pub fn leds(&self) -> &LedBank<O> {
        &self.leds
    }
}

// ===================================================================
// Main Loop
// ===================================================================

/// Capabilities the scan loop drives
pub struct MainLoop<H, D, C, S, R> {
    hid: H,
    delay: D,
    clock: C,
    storage: S,
    reset: R,
}

impl<H, D, C, S, R> MainLoop<H, D, C, S, R>
where
    H: HidKeyboard,
    D: DelayNs,
    C: Clock,
    S: Storage,
    R: Reset,
{
    pub fn new(hid: H, delay: D, clock: C, storage: S, reset: R) -> Self {
        Self {
            hid,
            delay,
            clock,
            storage,
            reset,
        }
    }

    /// Scan every key, then every control, in declaration order.
    pub fn tick<I, O>(&mut self, state: &mut EngineState<I, O>) -> Result<(), EngineError>
    where
        I: InputPin,
        O: OutputPin,
    {
        for key in &mut state.keys {
            let now = self.clock.now();
            match key.tracker.advance(now)? {
                Transition::Pressed => {
                    debug!("Key {} fired", key.tracker.pin());
                    sequence::play(&key.sequence, &mut self.hid, &mut self.delay)?;
                }
                Transition::Held { since: Some(since) }
                    if key.repeating && now.saturating_duration_since(since) > REPEAT_THRESHOLD =>
                {
                    trace!("Key {} repeated", key.tracker.pin());
                    sequence::play(&key.sequence, &mut self.hid, &mut self.delay)?;
                    key.tracker.refresh(now);
                    self.delay.delay_ms(REPEAT_THROTTLE.as_millis() as u32);
                }
                _ => {}
            }
        }

        for control in &mut state.controls {
            let now = self.clock.now();
            if control.tracker.advance(now)? != Transition::Pressed {
                continue;
            }
            debug!("Control {} fired", control.tracker.pin());
            match control.action {
                ControlAction::ToggleLeds => state.leds.toggle_all()?,
                ControlAction::Program => {
                    controls::program(&mut self.storage, &mut self.reset);
                }
            }
        }
        Ok(())
    }

    /// Tick until something fails, and return what failed.
    pub fn run<I, O>(&mut self, state: &mut EngineState<I, O>) -> EngineError
    where
        I: InputPin,
        O: OutputPin,
    {
        loop {
            if let Err(e) = self.tick(state) {
                return e;
            }
        }
    }

    /// Load `config.json` and claim its lines.
    pub fn setup<P>(&mut self, pins: &mut P) -> Result<EngineState<P::Input, P::Output>, EngineError>
    where
        P: PinProvider,
    {
        let config = Configuration::load(&mut self.storage)?;
        EngineState::build(&config, pins, &self.clock)
    }

    pub fn hid(&self) -> &H {
        &self.hid
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Load the configuration, build the engine and run it.
///
/// Only returns on a fatal error, which has already been logged.
pub fn start<P, H, D, C, S, R>(pins: &mut P, main_loop: &mut MainLoop<H, D, C, S, R>) -> EngineError
where
    P: PinProvider,
    H: HidKeyboard,
    D: DelayNs,
    C: Clock,
    S: Storage,
    R: Reset,
{
    let error = match main_loop.setup(pins) {
        Ok(mut state) => {
            info!("Engine running");
            main_loop.run(&mut state)
        }
        Err(e) => e,
    };
    error!("{}", error);
    error
}
