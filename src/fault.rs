//! Fatal failure indication
//!
//! Once the engine has claimed USB, a fatal error must stay visible: the
//! on-board LED blinks slowly forever. The reprogram precheck runs before that
//! point and simply halts.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::constants::FAULT_BLINK_HALF_PERIOD_MS;

/// One on/off period of the fault pattern.
pub fn blink_cycle<O: OutputPin, D: DelayNs>(led: &mut O, delay: &mut D) {
    // nothing left to report a failing LED to
    let _ = led.set_high();
    delay.delay_ms(FAULT_BLINK_HALF_PERIOD_MS);
    let _ = led.set_low();
    delay.delay_ms(FAULT_BLINK_HALF_PERIOD_MS);
}

/// Blink `led` until power is removed.
pub fn blink_forever<O: OutputPin, D: DelayNs>(mut led: O, mut delay: D) -> ! {
    loop {
        blink_cycle(&mut led, &mut delay);
    }
}

/// Stop doing anything.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
