//! Tagged replies on the serial configuration channel.
//!
//! Every reply is written as one line terminated by `\n`:
//!
//! ```text
//! SETTINGS::<json>
//! MEASUREMENTS::<json>
//! OK
//! ERROR:<message>
//! EXPORT::<pretty json>
//! BREATH_DATA:<value>
//! ```

use alloc::string::String;
use core::fmt::{self, Write};

/// A reply sent back over the command channel.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Response {
    /// Full settings document.
    Settings(String),
    /// Measurement session document.
    Measurements(String),
    /// Command succeeded.
    Ok,
    /// Command failed with a message.
    Error(String),
    /// Pretty-printed settings document.
    Export(String),
    /// Live sensor reading echo.
    BreathData(f32),
}

impl Response {
    /// Build an error reply from any displayable message.
    ///
    /// Line breaks in the message are replaced so the reply stays on one line.
    pub fn error(message: impl fmt::Display) -> Self {
        let mut text = String::new();
        let _ = write!(text, "{}", message);
        if text.contains(['\r', '\n']) {
            text = text.replace(['\r', '\n'], " ");
        }
        Self::Error(text)
    }

    /// Protocol tag that starts the line.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Settings(_) => "SETTINGS::",
            Self::Measurements(_) => "MEASUREMENTS::",
            Self::Ok => "OK",
            Self::Error(_) => "ERROR:",
            Self::Export(_) => "EXPORT::",
            Self::BreathData(_) => "BREATH_DATA:",
        }
    }

    /// Write the full line, including the terminating newline.
    ///
    /// # Errors
    ///
    /// Propagates errors from the writer.
    pub fn write_line<W: Write>(&self, writer: &mut W) -> fmt::Result {
        writeln!(writer, "{}", self)
    }

    /// Render the full line, including the terminating newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = String::new();
        let _ = self.write_line(&mut line);
        line
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())?;
        match self {
            Self::Settings(body)
            | Self::Measurements(body)
            | Self::Error(body)
            | Self::Export(body) => f.write_str(body),
            Self::Ok => Ok(()),
            Self::BreathData(value) => write!(f, "{}", value),
        }
    }
}
