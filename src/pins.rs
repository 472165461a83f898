//! GPIO line capability
//!
//! The engine never touches hardware registers directly. It asks a
//! [`PinProvider`] for an input (pull-down) or an output line by name and gets
//! back `embedded-hal` pins it owns from then on.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::constants::{GPIO_COUNT, GPIO_PREFIX, ONBOARD_LED_GPIO, ONBOARD_LED_NAME};
use crate::types::PinId;

/// Failure to obtain a GPIO line
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// The name does not denote a GPIO of this board
    #[error("Invalid GPIO {0}")]
    Invalid(PinId),
    /// The line already belongs to another input or output
    #[error("GPIO {0} is already in use")]
    InUse(PinId),
}

/// Source of digital lines, addressed by configuration pin names
pub trait PinProvider {
    type Input: InputPin;
    type Output: OutputPin;

    /// Claim `pin` as an input with pull-down. Asserted reads as high.
    fn input(&mut self, pin: &PinId) -> Result<Self::Input, PinError>;

    /// Claim `pin` as a driven output, initially at `initial`.
    fn output(&mut self, pin: &PinId, initial: bool) -> Result<Self::Output, PinError>;

    /// Read `pin` once as a pull-down input without keeping it.
    fn sample(&mut self, pin: &PinId) -> Result<bool, PinError>;
}

/// Map a configuration pin name onto an RP2040 GPIO number.
///
/// Accepts `GP0` to `GP29` and `LED` for the on-board LED.
pub fn gpio_number(pin: &PinId) -> Option<u8> {
    let name = pin.as_str();
    if name == ONBOARD_LED_NAME {
        return Some(ONBOARD_LED_GPIO);
    }
    let digits = name.strip_prefix(GPIO_PREFIX)?;
    // no leading zeros or signs: "GP05" is not a pin
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u8 = digits.parse().ok()?;
    (usize::from(number) < GPIO_COUNT).then_some(number)
}
