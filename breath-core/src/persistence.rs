//! Settings storage trait and error types.

use alloc::vec::Vec;
use core::fmt;

/// Error type for settings storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Flash/filesystem I/O error.
    Io,
    /// Storage is mounted read-only.
    ReadOnly,
    /// Record does not fit the storage region.
    TooLarge,
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "storage I/O error"),
            Self::ReadOnly => write!(f, "storage is read-only"),
            Self::TooLarge => write!(f, "record does not fit storage"),
        }
    }
}

/// Byte-level storage for the persisted settings record.
///
/// Implementations only move bytes; record framing and JSON live in
/// [`SettingsStore`](crate::SettingsStore).
pub trait SettingsPersistence {
    /// Read the stored record, `None` if nothing was ever stored.
    fn load(&mut self) -> Result<Option<Vec<u8>>, PersistError>;

    /// Replace the stored record.
    fn save(&mut self, record: &[u8]) -> Result<(), PersistError>;
}

/// RAM-backed storage, for host builds and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    record: Option<Vec<u8>>,
    read_only: bool,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects every write.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            record: None,
            read_only: true,
        }
    }

    /// Overwrite the stored bytes directly.
    pub fn store(&mut self, record: Vec<u8>) {
        self.record = Some(record);
    }

    /// Currently stored bytes.
    #[must_use]
    pub fn record(&self) -> Option<&[u8]> {
        self.record.as_deref()
    }
}

impl SettingsPersistence for MemoryPersistence {
    fn load(&mut self) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &[u8]) -> Result<(), PersistError> {
        if self.read_only {
            return Err(PersistError::ReadOnly);
        }
        self.record = Some(record.to_vec());
        Ok(())
    }
}
