//! Button edge tracking
//!
//! Every configured key and control gets an [`InputTracker`] that owns its
//! input line. The main loop calls [`InputTracker::advance`] once per tick and
//! decides what to fire from the returned [`Transition`].

use embassy_time::Instant;
use embedded_hal::digital::InputPin;

use crate::error::EngineError;
use crate::types::PinId;

// ===================================================================
// Transitions
// ===================================================================

/// What happened on a line since the previous tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Released before and now
    Idle,
    /// Press edge
    Pressed,
    /// Release edge
    Released,
    /// Asserted before and now. `since` is the last recorded press, if any.
    Held { since: Option<Instant> },
}

// ===================================================================
// Input Tracker
// ===================================================================

/// Logical state of one button
pub struct InputTracker<I> {
    pin: PinId,
    line: I,
    pressed: bool,
    last_press: Option<Instant>,
}

impl<I: InputPin> InputTracker<I> {
    /// Take ownership of `line` and sample its level as the starting state.
    ///
    /// A button already held at registration counts as pressed at `now`, so it
    /// does not fire until it has been released once.
    pub fn new(pin: PinId, mut line: I, now: Instant) -> Result<Self, EngineError> {
        let pressed = line.is_high().map_err(|_| EngineError::Read(pin.clone()))?;
        if pressed {
            debug!("{} held at startup", pin);
        }
        Ok(Self {
            pin,
            line,
            pressed,
            last_press: pressed.then_some(now),
        })
    }

    /// Sample the line and step the state machine.
    pub fn advance(&mut self, now: Instant) -> Result<Transition, EngineError> {
        let level = self
            .line
            .is_high()
            .map_err(|_| EngineError::Read(self.pin.clone()))?;

        let transition = match (self.pressed, level) {
            (false, false) => Transition::Idle,
            (false, true) => {
                self.pressed = true;
                self.last_press = Some(now);
                trace!("{} pressed", self.pin);
                Transition::Pressed
            }
            (true, false) => {
                // the press timestamp is kept; the next press edge replaces it
                self.pressed = false;
                trace!("{} released", self.pin);
                Transition::Released
            }
            (true, true) => Transition::Held {
                since: self.last_press,
            },
        };
        Ok(transition)
    }

    /// Restart the repeat interval from `now`.
    pub fn refresh(&mut self, now: Instant) {
        self.last_press = Some(now);
    }

    pub fn pin(&self) -> &PinId {
        &self.pin
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn last_press(&self) -> Option<Instant> {
        self.last_press
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock, State, Transaction};

    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn walks_the_transition_table() {
        let mut line = Mock::new(&[
            Transaction::get(State::Low),
            Transaction::get(State::Low),
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::Low),
        ]);
        let mut tracker = InputTracker::new(PinId::from("GP0"), line.clone(), at(0)).unwrap();
        assert!(!tracker.is_pressed());
        assert_eq!(tracker.last_press(), None);

        assert_eq!(tracker.advance(at(1)).unwrap(), Transition::Idle);
        assert_eq!(tracker.advance(at(2)).unwrap(), Transition::Pressed);
        assert_eq!(
            tracker.advance(at(3)).unwrap(),
            Transition::Held { since: Some(at(2)) }
        );
        assert_eq!(tracker.advance(at(4)).unwrap(), Transition::Released);
        assert_eq!(tracker.advance(at(5)).unwrap(), Transition::Idle);
        // release keeps the last press time
        assert_eq!(tracker.last_press(), Some(at(2)));

        line.done();
    }

    #[test]
    fn held_at_registration_does_not_fire() {
        let mut line = Mock::new(&[
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::High),
        ]);
        let mut tracker = InputTracker::new(PinId::from("GP3"), line.clone(), at(10)).unwrap();
        assert!(tracker.is_pressed());

        assert_eq!(
            tracker.advance(at(11)).unwrap(),
            Transition::Held { since: Some(at(10)) }
        );
        assert_eq!(tracker.advance(at(12)).unwrap(), Transition::Released);
        assert_eq!(tracker.advance(at(13)).unwrap(), Transition::Pressed);
        assert_eq!(tracker.last_press(), Some(at(13)));

        line.done();
    }

    #[test]
    fn refresh_moves_the_baseline() {
        let mut line = Mock::new(&[Transaction::get(State::High), Transaction::get(State::High)]);
        let mut tracker = InputTracker::new(PinId::from("GP1"), line.clone(), at(0)).unwrap();
        tracker.refresh(at(400));
        assert_eq!(
            tracker.advance(at(401)).unwrap(),
            Transition::Held { since: Some(at(400)) }
        );
        line.done();
    }
}
