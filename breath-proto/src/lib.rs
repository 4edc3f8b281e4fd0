//! Wire formats for the breath gamepad.
//!
//! This crate holds everything that crosses a byte boundary:
//!
//! - **Commands**: the serial configuration channel
//!   - [`parse_command()`] - Parse one complete command line
//!   - [`Reassembler`] - Join `SET:settings::`/`IMPORT::` payloads split over chunks
//!   - [`Response`] - Tagged, newline-terminated replies
//!
//! - **Storage**: [`encode_record()`]/[`decode_record()`] wrap the settings JSON
//!   in a CRC-32 checked flash record.
//!
//! - **Audio**: [`AudioCommand`] encodes DFPlayer Mini serial frames.
//!
//! # Command Format
//!
//! ```text
//! TYPE:PARAM[:EXTRA]::PAYLOAD
//! SAVE
//! EXPORT
//! ```
//!
//! # Example
//!
//! ```
//! use breath_proto::{parse_command, Command, Feed, Reassembler};
//!
//! let mut reassembler = Reassembler::new();
//! assert_eq!(reassembler.push("SET:settings::{\"deadzone\":", 0), Ok(Feed::Pending));
//!
//! let Ok(Feed::Complete(line)) = reassembler.push("0.1}", 10) else {
//!     panic!("payload should be complete");
//! };
//! assert_eq!(
//!     parse_command(&line),
//!     Ok(Command::SetSettings("{\"deadzone\":0.1}"))
//! );
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` and needs only `alloc`: reassembled payloads and
//! responses carry JSON of unbounded length.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod dfplayer;
pub mod reassembler;
pub mod record;
pub mod response;

pub use command::{parse_command, starts_reassembly, Command, ParseError, PAYLOAD_SEPARATOR};
pub use dfplayer::{AudioCommand, DFPLAYER_BAUDRATE, DFPLAYER_MAX_VOLUME, FRAME_LEN};
pub use reassembler::{Feed, Reassembler, ReassemblerConfig, ReassemblyError};
pub use record::{decode_record, encode_record, RecordError, RECORD_HEADER_LEN, RECORD_MAGIC};
pub use response::Response;
