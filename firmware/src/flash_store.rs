//! Settings record in the last sector of on-board flash.

use alloc::vec;
use alloc::vec::Vec;

use breath_core::{PersistError, SettingsPersistence};
use embassy_rp::flash::{Blocking, Error as FlashError, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;

use crate::config::{FLASH_SIZE, SETTINGS_OFFSET};

#[inline]
fn flash_error_to_persist_error(e: FlashError) -> PersistError {
    match e {
        FlashError::OutOfBounds | FlashError::Unaligned => PersistError::TooLarge,
        _ => PersistError::Io,
    }
}

/// One erase sector of flash holding the framed settings JSON.
///
/// Blocking flash access stalls both cores for the duration of an erase,
/// which only happens on an explicit `SAVE`.
pub struct FlashSettingsStore<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> FlashSettingsStore<'d> {
    #[must_use]
    pub fn new(flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self { flash }
    }
}

impl SettingsPersistence for FlashSettingsStore<'_> {
    fn load(&mut self) -> Result<Option<Vec<u8>>, PersistError> {
        let mut sector = vec![0u8; ERASE_SIZE];
        self.flash
            .blocking_read(SETTINGS_OFFSET, &mut sector)
            .map_err(flash_error_to_persist_error)?;

        // Erased flash reads as 0xFF; the record decoder reports it as blank
        Ok(Some(sector))
    }

    fn save(&mut self, record: &[u8]) -> Result<(), PersistError> {
        if record.len() > ERASE_SIZE {
            return Err(PersistError::TooLarge);
        }

        let mut sector = vec![0xFFu8; ERASE_SIZE];
        sector[..record.len()].copy_from_slice(record);

        self.flash
            .blocking_erase(SETTINGS_OFFSET, SETTINGS_OFFSET + ERASE_SIZE as u32)
            .map_err(flash_error_to_persist_error)?;
        self.flash
            .blocking_write(SETTINGS_OFFSET, &sector)
            .map_err(flash_error_to_persist_error)?;

        defmt::info!("Settings written to flash at {:#x}", SETTINGS_OFFSET);
        Ok(())
    }
}
