//! Macro playback

use embedded_hal::delay::DelayNs;

use crate::hid::{HidError, HidKeyboard};
use crate::types::MacroStep;

/// Run `steps` in order against the keyboard.
///
/// Delays block the caller. The first HID failure aborts the sequence and is
/// returned as is; keys pressed before it stay pressed.
pub fn play<K, D>(steps: &[MacroStep], keyboard: &mut K, delay: &mut D) -> Result<(), HidError>
where
    K: HidKeyboard,
    D: DelayNs,
{
    for step in steps {
        match *step {
            MacroStep::Press(keycode) => keyboard.press(keycode)?,
            MacroStep::Release(keycode) => keyboard.release(keycode)?,
            MacroStep::Delay(duration) => wait(delay, duration.as_micros()),
        }
    }
    Ok(())
}

/// Block for `micros`, in chunks `delay_us` can take.
fn wait<D: DelayNs>(delay: &mut D, mut micros: u64) {
    while micros > 0 {
        let chunk = u32::try_from(micros).unwrap_or(u32::MAX);
        delay.delay_us(chunk);
        micros -= u64::from(chunk);
    }
}
