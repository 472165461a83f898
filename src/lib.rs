//! Macropad - configuration-driven GPIO macro keypad for RP2040
//!
//! Buttons wired to GPIO lines play keystroke macros over USB HID. What each
//! button does is read once at boot from `config.json`:
//!
//! - **keys** play a press/release/delay sequence on the press edge, and
//!   optionally keep re-playing it while held
//! - **controls** toggle the indicator LEDs or reset the board into
//!   reprogramming mode
//! - **leds** are outputs switched on at startup
//!
//! ## Architecture
//! - **Capabilities**: pins, keyboard, storage, clock, delay and reset are
//!   traits; the engine is plain blocking code and runs on the host in tests
//! - **Single scan loop**: keys then controls in declaration order, macro
//!   delays stall the whole loop
//! - **Firmware** (`rp2040` feature): embassy-rp drivers, embassy-usb HID on an
//!   interrupt executor, reports handed over through a channel

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod boot;
pub mod buttons;
pub mod clock;
pub mod config;
pub mod constants;
pub mod controls;
pub mod engine;
pub mod error;
pub mod fault;
pub mod hid;
pub mod keycode;
pub mod pins;
pub mod sequence;
pub mod storage;
pub mod types;

#[cfg(feature = "rp2040")]
pub mod channels;
#[cfg(feature = "rp2040")]
pub mod hardware;
#[cfg(feature = "rp2040")]
pub mod usb;

pub use config::{ConfigError, Configuration};
pub use engine::{EngineState, MainLoop};
pub use error::EngineError;
