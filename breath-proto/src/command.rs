//! Command line parsing for the serial configuration channel.
//!
//! A command is a single line of the form:
//!
//! ```text
//! TYPE:PARAM[:EXTRA]::PAYLOAD
//! ```
//!
//! - `TYPE` - `GET`, `SET`, `SAVE`, `EXPORT` or `IMPORT`
//! - `PARAM` - Target of the command (`settings`, `measurements`, `measure`)
//! - `EXTRA` - Inline argument (`SET:measure:true`)
//! - `PAYLOAD` - Everything after the first `::`, usually a JSON object
//!
//! `SAVE` and `EXPORT` are sent bare, `IMPORT` carries only a payload.

use core::fmt;

/// Separator between the command header and its payload.
pub const PAYLOAD_SEPARATOR: &str = "::";

/// Header prefixes whose JSON payload may arrive split over several chunks.
const REASSEMBLED_PREFIXES: [&str; 2] = ["SET:settings::", "IMPORT::"];

/// A parsed command, borrowing its payload from the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Command<'a> {
    /// `GET:settings` - Report the full settings document.
    GetSettings,
    /// `GET:measurements` - Report the current measurement session.
    GetMeasurements,
    /// `SET:settings::<json>` - Merge a partial settings object.
    SetSettings(&'a str),
    /// `SET:measure:<bool>` - Turn measurement mode on or off.
    SetMeasure(bool),
    /// `SAVE` - Persist the current settings.
    Save,
    /// `EXPORT` - Dump the settings as pretty JSON.
    Export,
    /// `IMPORT::<json>` - Merge a settings object, same as `SetSettings`.
    Import(&'a str),
}

/// Error type for command parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line was empty after trimming.
    Empty,
    /// `TYPE`/`PARAM` combination is not recognized.
    UnknownCommand,
    /// Command requires a `::` payload but none was given.
    MissingPayload,
    /// Command requires an inline `:EXTRA` argument but none was given.
    MissingArgument,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingPayload => write!(f, "missing payload"),
            Self::MissingArgument => write!(f, "missing argument"),
        }
    }
}

/// Check whether a line opens a command whose payload may span chunks.
#[inline]
#[must_use]
pub fn starts_reassembly(line: &str) -> bool {
    REASSEMBLED_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Parse one complete command line.
///
/// Surrounding whitespace (including the line terminator) is ignored.
///
/// # Example
///
/// ```
/// use breath_proto::{parse_command, Command};
///
/// assert_eq!(parse_command("GET:settings\n"), Ok(Command::GetSettings));
/// assert_eq!(parse_command("SET:measure:true"), Ok(Command::SetMeasure(true)));
/// assert_eq!(parse_command("IMPORT::{}"), Ok(Command::Import("{}")));
/// ```
pub fn parse_command(line: &str) -> Result<Command<'_>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (header, payload) = match line.split_once(PAYLOAD_SEPARATOR) {
        Some((header, payload)) => (header, Some(payload)),
        None => (line, None),
    };

    let mut parts = header.split(':');
    let kind = parts.next().unwrap_or_default();
    let param = parts.next();
    let extra = parts.next();

    match (kind, param) {
        ("GET", Some("settings")) => Ok(Command::GetSettings),
        ("GET", Some("measurements")) => Ok(Command::GetMeasurements),
        ("SET", Some("settings")) => payload
            .map(Command::SetSettings)
            .ok_or(ParseError::MissingPayload),
        ("SET", Some("measure")) => extra
            .map(|value| Command::SetMeasure(value.trim().eq_ignore_ascii_case("true")))
            .ok_or(ParseError::MissingArgument),
        ("SAVE", _) => Ok(Command::Save),
        ("EXPORT", _) => Ok(Command::Export),
        ("IMPORT", None) => payload
            .map(Command::Import)
            .ok_or(ParseError::MissingPayload),
        _ => Err(ParseError::UnknownCommand),
    }
}
