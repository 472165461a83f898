//! Reprogram-mode precheck
//!
//! Runs once before the engine. The storage volume normally belongs to the
//! host as a USB drive. When `disable_mount.txt` names a button, the device
//! takes the volume over instead (so the `program` control can write to it)
//! unless that button is held during boot.

use alloc::string::{String, ToString};

use crate::constants::{GPIO_PREFIX, MARKER_MAX_SIZE, MOUNT_MARKER_FILE};
use crate::pins::{PinError, PinProvider};
use crate::storage::{Storage, StorageError};
use crate::types::PinId;

/// What the precheck did with the volume
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountDecision {
    /// No marker file; the host keeps the drive
    Unchanged,
    /// Marker present but its button was held
    KeptForHost,
    /// USB drive disabled and volume remounted writable
    TakenByDevice,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrecheckError {
    #[error("Invalid GPIO {0} in disable_mount.txt")]
    InvalidGpio(String),
    #[error("{0}")]
    Pin(#[from] PinError),
    #[error("Error handling disable_mount.txt: {0}")]
    Storage(#[from] StorageError),
}

/// Decide who owns the storage volume for this boot.
pub fn precheck<P, S>(pins: &mut P, storage: &mut S) -> Result<MountDecision, PrecheckError>
where
    P: PinProvider,
    S: Storage,
{
    if !storage.exists(MOUNT_MARKER_FILE) {
        return Ok(MountDecision::Unchanged);
    }

    let contents = storage.read(MOUNT_MARKER_FILE, MARKER_MAX_SIZE)?;
    let name = core::str::from_utf8(&contents)
        .map_err(|_| PrecheckError::InvalidGpio(String::from_utf8_lossy(&contents).to_string()))?
        .trim()
        .to_uppercase();
    if !name.starts_with(GPIO_PREFIX) {
        return Err(PrecheckError::InvalidGpio(name));
    }

    let button = PinId::new(name);
    if pins.sample(&button)? {
        info!("{} held, leaving storage to the host", button);
        return Ok(MountDecision::KeptForHost);
    }

    storage.disable_usb_drive();
    storage.remount(false)?;
    info!("USB drive disabled, storage writable by the device");
    Ok(MountDecision::TakenByDevice)
}
