//! Flash record wrapping the persisted settings document.
//!
//! # Layout
//!
//! ```text
//! +-------+-----------+-----------+----------------+
//! | magic | length    | crc32     | payload        |
//! | BRTH  | u32 LE    | u32 LE    | length bytes   |
//! +-------+-----------+-----------+----------------+
//! ```
//!
//! The checksum is CRC-32/ISO-HDLC over the payload bytes. Erased flash
//! (all `0xFF`) decodes as [`RecordError::Blank`].

use alloc::vec::Vec;
use core::fmt;
use crc::{Crc, CRC_32_ISO_HDLC};

/// Record magic bytes.
pub const RECORD_MAGIC: [u8; 4] = *b"BRTH";

/// Size of the record header (magic + length + checksum).
pub const RECORD_HEADER_LEN: usize = 12;

/// CRC-32 calculator with 256-entry lookup table.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Error type for record encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Storage is erased, nothing was ever written.
    Blank,
    /// Magic bytes do not match.
    BadMagic,
    /// Header announces more bytes than are available.
    Truncated,
    /// Payload checksum mismatch.
    Checksum,
    /// Payload does not fit in a record.
    TooLarge,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "no stored record"),
            Self::BadMagic => write!(f, "bad record magic"),
            Self::Truncated => write!(f, "truncated record"),
            Self::Checksum => write!(f, "record checksum mismatch"),
            Self::TooLarge => write!(f, "record too large"),
        }
    }
}

/// Wrap `payload` in a record.
///
/// # Errors
///
/// Returns [`RecordError::TooLarge`] if the payload length does not fit in `u32`.
pub fn encode_record(payload: &[u8]) -> Result<Vec<u8>, RecordError> {
    let len = u32::try_from(payload.len()).map_err(|_| RecordError::TooLarge)?;

    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    record.extend_from_slice(&RECORD_MAGIC);
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(&CRC32.checksum(payload).to_le_bytes());
    record.extend_from_slice(payload);
    Ok(record)
}

/// Validate a record and return its payload.
///
/// Trailing bytes after the payload (rest of a flash sector) are ignored.
pub fn decode_record(bytes: &[u8]) -> Result<&[u8], RecordError> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(RecordError::Truncated);
    }

    let magic = &bytes[..4];
    if magic.iter().all(|&b| b == 0xFF) {
        return Err(RecordError::Blank);
    }
    if magic != RECORD_MAGIC {
        return Err(RecordError::BadMagic);
    }

    let len = read_u32_le(&bytes[4..8]) as usize;
    let expected_crc = read_u32_le(&bytes[8..12]);

    let payload = bytes
        .get(RECORD_HEADER_LEN..RECORD_HEADER_LEN.saturating_add(len))
        .ok_or(RecordError::Truncated)?;

    if CRC32.checksum(payload) != expected_crc {
        return Err(RecordError::Checksum);
    }

    Ok(payload)
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}
