//! Inter-task communication channels
//!
//! The engine runs in thread mode and blocks in macro delays, while the USB
//! stack runs on an interrupt executor. Keyboard reports cross between the two
//! through this channel.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use usbd_hid::descriptor::KeyboardReport;

use crate::constants::REPORT_QUEUE_DEPTH;

/// Keyboard reports from the engine to the USB task
pub static KEYBOARD_REPORT_CHANNEL: Channel<CriticalSectionRawMutex, KeyboardReport, REPORT_QUEUE_DEPTH> =
    Channel::new();
