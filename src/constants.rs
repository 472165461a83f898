//! Compile-time configuration for the macropad
//! RP2040 (Raspberry Pi Pico) GPIO macro keypad

use embassy_time::Duration;

// ===================================================================
// Key Timing
// ===================================================================

/// A held repeating key re-fires once it has been held longer than this.
pub const REPEAT_THRESHOLD: Duration = Duration::from_millis(300);

/// Blocking pause after every repeat fire. Stalls the whole scan.
pub const REPEAT_THROTTLE: Duration = Duration::from_millis(75);

// ===================================================================
// Fault Indication
// ===================================================================

/// On and off time of the fatal-error blink on the on-board LED.
pub const FAULT_BLINK_HALF_PERIOD_MS: u32 = 2000;

// ===================================================================
// Storage Layout
// ===================================================================

pub const CONFIG_FILE: &str = "config.json";
/// Presence of this file arms the reprogram precheck; it holds the pin name of
/// the button that keeps the drive exposed to the host.
pub const MOUNT_MARKER_FILE: &str = "disable_mount.txt";
/// Scratch file written and removed to probe writability.
pub const PROBE_FILE: &str = "tmp";

/// Largest configuration document accepted.
pub const CONFIG_MAX_SIZE: usize = 8 * 1024;
/// Largest mount marker accepted.
pub const MARKER_MAX_SIZE: usize = 32;

// Flash partitions (offsets relative to the start of flash)
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const FLASH_CONFIG_SIZE: usize = 2 * FLASH_SECTOR_SIZE;
pub const FLASH_CONFIG_OFFSET: u32 = 0x1E_0000; // 2 sectors for config.json
pub const FLASH_MARKER_OFFSET: u32 = 0x1E_2000; // 1 sector for disable_mount.txt
pub const FLASH_PROBE_OFFSET: u32 = 0x1E_3000; // 1 sector for the writability probe

// ===================================================================
// GPIO
// ===================================================================

/// Number of user GPIOs on the RP2040.
pub const GPIO_COUNT: usize = 30;
/// Pin name prefix for GPIO lines ("GP0" .. "GP29").
pub const GPIO_PREFIX: &str = "GP";
/// Alias for the on-board LED.
pub const ONBOARD_LED_NAME: &str = "LED";
pub const ONBOARD_LED_GPIO: u8 = 25;

// ===================================================================
// USB Configuration
// ===================================================================

pub const USB_VID: u16 = 0x1209; // pid.codes test VID
pub const USB_PID: u16 = 0x0001;
pub const USB_MANUFACTURER: &str = "Macropad";
pub const USB_PRODUCT: &str = "GPIO Macro Keypad";
pub const USB_SERIAL: &str = "MACROPAD0001";
pub const USB_POLL_RATE_MS: u8 = 1;
pub const HID_REPORT_SIZE: usize = 8;

/// Keyboard reports buffered between the engine and the USB task.
pub const REPORT_QUEUE_DEPTH: usize = 16;

/// Heap for the configuration document and the engine state.
pub const HEAP_SIZE: usize = 32 * 1024;
