//! DFPlayer Mini serial frame encoding.
//!
//! Every command is a fixed 10-byte frame:
//!
//! ```text
//! 7E FF 06 <cmd> 00 <p1> <p2> <ck_hi> <ck_lo> EF
//! ```
//!
//! The checksum is the two's complement of the sum of the bytes from the
//! version byte (`FF`) through `p2`.

/// DFPlayer UART baud rate.
pub const DFPLAYER_BAUDRATE: u32 = 9_600;

/// Highest volume step the module accepts.
pub const DFPLAYER_MAX_VOLUME: u8 = 30;

/// Size of one encoded frame.
pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const NO_FEEDBACK: u8 = 0x00;
const END: u8 = 0xEF;

const CMD_SET_VOLUME: u8 = 0x06;
const CMD_PLAY_FOLDER_TRACK: u8 = 0x0F;

/// Audio cue sent to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioCommand {
    /// Set the output volume (0-30, clamped).
    SetVolume(u8),
    /// Play `track` from numbered `folder` (`/01/001.mp3`).
    Play {
        /// Folder number (1-99).
        folder: u8,
        /// Track number within the folder (1-255).
        track: u8,
    },
}

impl AudioCommand {
    /// Encode as a DFPlayer serial frame.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let (cmd, p1, p2) = match *self {
            Self::SetVolume(volume) => (CMD_SET_VOLUME, 0, volume.min(DFPLAYER_MAX_VOLUME)),
            Self::Play { folder, track } => (CMD_PLAY_FOLDER_TRACK, folder, track),
        };

        let sum = [VERSION, LENGTH, cmd, NO_FEEDBACK, p1, p2]
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
        let [ck_hi, ck_lo] = 0u16.wrapping_sub(sum).to_be_bytes();

        [START, VERSION, LENGTH, cmd, NO_FEEDBACK, p1, p2, ck_hi, ck_lo, END]
    }
}
