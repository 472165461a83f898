//! Configuration storage capability
//!
//! Files live on a volume that is either exposed to the host as a USB drive
//! (and then read-only for the device) or taken over by the device and
//! writable. The engine reads `config.json` from it once, and the `program`
//! control probes whether it can write before resetting.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Storage failure
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    #[error("file {0} not found")]
    NotFound(String),
    #[error("file system is read-only")]
    ReadOnly,
    #[error("file {name} exceeds {limit} bytes")]
    TooLarge { name: String, limit: usize },
    #[error("storage device error: {0}")]
    Device(String),
}

/// Named-file access plus the mount controls used by the reprogram precheck
pub trait Storage {
    fn exists(&mut self, name: &str) -> bool;

    /// Read a whole file, refusing files larger than `limit` bytes.
    fn read(&mut self, name: &str, limit: usize) -> Result<Vec<u8>, StorageError>;

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    fn remove(&mut self, name: &str) -> Result<(), StorageError>;

    /// Stop exposing the volume to the host.
    fn disable_usb_drive(&mut self);

    /// Change whether the device itself may write.
    fn remount(&mut self, readonly: bool) -> Result<(), StorageError>;
}

/// RAM-backed volume
///
/// Starts the way a freshly booted device sees its drive: exposed to the host
/// and read-only for the device.
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
    readonly: bool,
    usb_drive: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            readonly: true,
            usb_drive: true,
        }
    }

    /// Add a file regardless of the mount state, as the host would.
    pub fn with_file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.files.insert(name.to_string(), data.as_ref().to_vec());
        self
    }

    pub fn writable(mut self) -> Self {
        self.readonly = false;
        self
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn usb_drive_enabled(&self) -> bool {
        self.usb_drive
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn exists(&mut self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn read(&mut self, name: &str, limit: usize) -> Result<Vec<u8>, StorageError> {
        let data = self
            .files
            .get(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        if data.len() > limit {
            return Err(StorageError::TooLarge {
                name: name.to_string(),
                limit,
            });
        }
        Ok(data.clone())
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn disable_usb_drive(&mut self) {
        self.usb_drive = false;
    }

    fn remount(&mut self, readonly: bool) -> Result<(), StorageError> {
        self.readonly = readonly;
        Ok(())
    }
}
