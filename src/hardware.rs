//! RP2040 implementations of the engine capabilities
//!
//! - [`RpPins`]: GPIO lines handed out by configuration name
//! - [`FlashStorage`]: the configuration volume, kept in the last flash sectors
//! - [`ScbReset`]: system reset through the Cortex-M SCB

use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};

use crate::constants::*;
use crate::controls::Reset;
use crate::pins::{gpio_number, PinError, PinProvider};
use crate::storage::{Storage, StorageError};
use crate::types::PinId;

// ===================================================================
// GPIO
// ===================================================================

/// Settling time between enabling a pull-down and sampling it
const PULL_SETTLE: Duration = Duration::from_micros(10);

/// Bank of unclaimed GPIO pins, indexed by GPIO number
pub struct RpPins {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl RpPins {
    pub fn new(pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT]) -> Self {
        Self { pins }
    }

    fn slot(&mut self, pin: &PinId) -> Result<&mut Option<Peri<'static, AnyPin>>, PinError> {
        let number = gpio_number(pin).ok_or_else(|| PinError::Invalid(pin.clone()))?;
        Ok(&mut self.pins[usize::from(number)])
    }

    fn take(&mut self, pin: &PinId) -> Result<Peri<'static, AnyPin>, PinError> {
        self.slot(pin)?
            .take()
            .ok_or_else(|| PinError::InUse(pin.clone()))
    }
}

impl PinProvider for RpPins {
    type Input = Input<'static>;
    type Output = Output<'static>;

    fn input(&mut self, pin: &PinId) -> Result<Self::Input, PinError> {
        let line = Input::new(self.take(pin)?, Pull::Down);
        // let the pull-down settle before the first sample
        block_for(PULL_SETTLE);
        Ok(line)
    }

    fn output(&mut self, pin: &PinId, initial: bool) -> Result<Self::Output, PinError> {
        Ok(Output::new(self.take(pin)?, Level::from(initial)))
    }

    fn sample(&mut self, pin: &PinId) -> Result<bool, PinError> {
        let peri = self
            .slot(pin)?
            .as_mut()
            .ok_or_else(|| PinError::InUse(pin.clone()))?;
        let line = Input::new(peri.reborrow(), Pull::Down);
        block_for(PULL_SETTLE);
        Ok(line.is_high())
    }
}

// ===================================================================
// Flash Storage
// ===================================================================
//
// Each file owns a fixed, sector-aligned region:
//   [0..4]  length, u32 little endian (0xFFFF_FFFF when erased = no file)
//   [4..]   contents

const HEADER_SIZE: usize = 4;
const ERASED: u32 = u32::MAX;

type RpFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;

/// Flash-backed configuration volume
pub struct FlashStorage {
    flash: RpFlash,
    readonly: bool,
    usb_drive: bool,
}

impl FlashStorage {
    pub fn new(flash: Peri<'static, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
            readonly: true,
            usb_drive: true,
        }
    }

    /// Offset and size of the region holding `name`.
    fn region(name: &str) -> Result<(u32, usize), StorageError> {
        match name {
            CONFIG_FILE => Ok((FLASH_CONFIG_OFFSET, FLASH_CONFIG_SIZE)),
            MOUNT_MARKER_FILE => Ok((FLASH_MARKER_OFFSET, FLASH_SECTOR_SIZE)),
            PROBE_FILE => Ok((FLASH_PROBE_OFFSET, FLASH_SECTOR_SIZE)),
            _ => Err(StorageError::NotFound(name.to_string())),
        }
    }

    fn stored_len(&mut self, offset: u32) -> Result<Option<usize>, StorageError> {
        let mut header = [0u8; HEADER_SIZE];
        self.flash
            .blocking_read(offset, &mut header)
            .map_err(|e| device_error(&e))?;
        Ok(match u32::from_le_bytes(header) {
            ERASED => None,
            len => Some(len as usize),
        })
    }

    fn erase(&mut self, offset: u32, size: usize) -> Result<(), StorageError> {
        self.flash
            .blocking_erase(offset, offset + size as u32)
            .map_err(|e| device_error(&e))
    }
}

fn device_error(e: &embassy_rp::flash::Error) -> StorageError {
    StorageError::Device(alloc::format!("{:?}", e))
}

impl Storage for FlashStorage {
    fn exists(&mut self, name: &str) -> bool {
        match Self::region(name) {
            Ok((offset, _)) => matches!(self.stored_len(offset), Ok(Some(_))),
            Err(_) => false,
        }
    }

    fn read(&mut self, name: &str, limit: usize) -> Result<Vec<u8>, StorageError> {
        let (offset, size) = Self::region(name)?;
        let len = self
            .stored_len(offset)?
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        if len > limit {
            return Err(StorageError::TooLarge {
                name: name.to_string(),
                limit,
            });
        }
        if len > size - HEADER_SIZE {
            return Err(StorageError::Device(alloc::format!("{} header is corrupt", name)));
        }
        let mut data = vec![0u8; len];
        self.flash
            .blocking_read(offset + HEADER_SIZE as u32, &mut data)
            .map_err(|e| device_error(&e))?;
        Ok(data)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let (offset, size) = Self::region(name)?;
        if data.len() > size - HEADER_SIZE {
            return Err(StorageError::TooLarge {
                name: name.to_string(),
                limit: size - HEADER_SIZE,
            });
        }
        let mut image = Vec::with_capacity(HEADER_SIZE + data.len());
        image.extend_from_slice(&(data.len() as u32).to_le_bytes());
        image.extend_from_slice(data);

        self.erase(offset, size)?;
        self.flash
            .blocking_write(offset, &image)
            .map_err(|e| device_error(&e))?;
        debug!("Wrote {} ({} bytes)", name, data.len());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let (offset, size) = Self::region(name)?;
        if self.stored_len(offset)?.is_none() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.erase(offset, size)
    }

    fn disable_usb_drive(&mut self) {
        self.usb_drive = false;
    }

    fn remount(&mut self, readonly: bool) -> Result<(), StorageError> {
        if !readonly && self.usb_drive {
            warn!("Remounting writable while the USB drive is enabled");
        }
        self.readonly = readonly;
        Ok(())
    }
}

// ===================================================================
// Reset
// ===================================================================

/// Full system reset
pub struct ScbReset;

impl Reset for ScbReset {
    fn reset(&mut self) {
        cortex_m::peripheral::SCB::sys_reset();
    }
}
