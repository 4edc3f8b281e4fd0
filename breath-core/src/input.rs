//! Breath sensor input: line parsing, source trait and error types.
//!
//! The sensor sends one ASCII floating-point value per line, exhale
//! positive and inhale negative:
//!
//! ```text
//! 0.4213\n
//! -0.0871\n
//! ```

use core::fmt;
use core::future::Future;

/// Longest sensor line accepted, excluding the terminator.
pub const MAX_LINE_LENGTH: usize = 32;

/// Error type for input operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// UART/communication I/O error.
    Io,
    /// Line is not a number.
    Parse,
    /// Value is NaN or infinite.
    NotFinite,
    /// Buffer overflow (line too long).
    BufferOverflow,
    /// UART framing error.
    Framing,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Parse => write!(f, "not a number"),
            Self::NotFinite => write!(f, "value not finite"),
            Self::BufferOverflow => write!(f, "line too long"),
            Self::Framing => write!(f, "framing error"),
        }
    }
}

impl From<core::num::ParseFloatError> for InputError {
    fn from(_: core::num::ParseFloatError) -> Self {
        InputError::Parse
    }
}

impl From<core::str::Utf8Error> for InputError {
    fn from(_: core::str::Utf8Error) -> Self {
        InputError::Parse
    }
}

/// Parse one sensor line into a reading in [-1, 1].
///
/// # Example
///
/// ```
/// use breath_core::{parse_breath_line, InputError};
///
/// assert_eq!(parse_breath_line(b" 0.25\r\n"), Ok(0.25));
/// assert_eq!(parse_breath_line(b"-3"), Ok(-1.0));
/// assert_eq!(parse_breath_line(b"abc"), Err(InputError::Parse));
/// ```
pub fn parse_breath_line(line: &[u8]) -> Result<f32, InputError> {
    let text = core::str::from_utf8(line)?.trim();
    if text.len() > MAX_LINE_LENGTH {
        return Err(InputError::BufferOverflow);
    }

    let value: f32 = text.parse()?;
    if !value.is_finite() {
        return Err(InputError::NotFinite);
    }

    Ok(value.clamp(-1.0, 1.0))
}

/// Async trait for breath sensor sources.
///
/// This trait abstracts where readings come from, so the firmware can read
/// a UART while tests feed canned values.
pub trait BreathSource {
    /// Wait for and receive the next reading.
    fn receive(&mut self) -> impl Future<Output = Result<f32, InputError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(parse_breath_line(b"0.5\n"), Ok(0.5));
        assert_eq!(parse_breath_line(b"  -0.125 \r\n"), Ok(-0.125));
        assert_eq!(parse_breath_line(b"0"), Ok(0.0));
    }

    #[test]
    fn test_parse_clamps() {
        assert_eq!(parse_breath_line(b"1.5"), Ok(1.0));
        assert_eq!(parse_breath_line(b"-7"), Ok(-1.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_breath_line(b""), Err(InputError::Parse));
        assert_eq!(parse_breath_line(b"0.5.5"), Err(InputError::Parse));
        assert_eq!(parse_breath_line(&[0xFF, 0x30]), Err(InputError::Parse));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert_eq!(parse_breath_line(b"NaN"), Err(InputError::NotFinite));
        assert_eq!(parse_breath_line(b"inf"), Err(InputError::NotFinite));
    }

    #[test]
    fn test_parse_rejects_long_line() {
        let long = [b'1'; MAX_LINE_LENGTH + 1];
        assert_eq!(parse_breath_line(&long), Err(InputError::BufferOverflow));
    }
}
