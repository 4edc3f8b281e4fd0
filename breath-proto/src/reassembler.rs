//! Reassembly of command payloads that arrive split over several chunks.
//!
//! The serial port hands over whatever bytes are available, so a long
//! `SET:settings::{...}` line is usually delivered in pieces. A chunk that
//! opens such a command without closing its JSON object starts a buffer;
//! every following chunk is appended verbatim (never parsed as a command of
//! its own) until the buffer ends in `}`. The whole buffer is then released
//! as one complete line.
//!
//! The buffer is bounded by [`ReassemblerConfig`]: a maximum length and an
//! idle timeout between chunks.

use alloc::string::{String, ToString};
use core::fmt;

use crate::command::starts_reassembly;

/// Default upper bound for a buffered command, in bytes.
pub const DEFAULT_MAX_LEN: usize = 4096;

/// Default idle time after which a partial command is dropped, in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 2_000;

/// Limits applied to a buffered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReassemblerConfig {
    /// Maximum buffered length in bytes, `None` for unbounded.
    pub max_len: Option<usize>,
    /// Maximum gap between two chunks in milliseconds, `None` for no timeout.
    pub idle_timeout_ms: Option<u64>,
}

impl ReassemblerConfig {
    /// No size limit and no timeout.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_len: None,
            idle_timeout_ms: None,
        }
    }
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            max_len: Some(DEFAULT_MAX_LEN),
            idle_timeout_ms: Some(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Feed {
    /// A complete command line is ready for dispatch.
    Complete(String),
    /// The chunk was buffered; more input is needed.
    Pending,
    /// The chunk was blank and no command is in flight.
    Idle,
}

/// Error type for reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReassemblyError {
    /// The buffered command exceeded the configured maximum length.
    /// The buffer has been discarded.
    Overflow,
}

impl fmt::Display for ReassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "Command too long"),
        }
    }
}

/// Accumulator for one in-flight multi-chunk command.
#[derive(Debug, Default)]
pub struct Reassembler {
    config: ReassemblerConfig,
    buffer: String,
    last_chunk_ms: u64,
}

impl Reassembler {
    /// Create a reassembler with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ReassemblerConfig::default())
    }

    /// Create a reassembler with explicit limits.
    #[must_use]
    pub fn with_config(config: ReassemblerConfig) -> Self {
        Self {
            config,
            buffer: String::new(),
            last_chunk_ms: 0,
        }
    }

    /// The limits in use.
    #[inline]
    #[must_use]
    pub fn config(&self) -> ReassemblerConfig {
        self.config
    }

    /// Whether a partial command is buffered.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Number of buffered bytes.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial command.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feed one raw input chunk received at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Overflow`] if the buffered command would
    /// exceed the configured maximum length. The partial command is dropped.
    pub fn push(&mut self, chunk: &str, now_ms: u64) -> Result<Feed, ReassemblyError> {
        if self.is_pending() && self.is_stale(now_ms) {
            log::warn!(
                "Dropping stale partial command ({} bytes)",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        if self.is_pending() {
            return self.append(chunk, now_ms);
        }

        let line = chunk.trim();
        if line.is_empty() {
            return Ok(Feed::Idle);
        }

        if starts_reassembly(line) && !line.ends_with('}') {
            self.check_len(line.len())?;
            log::debug!("Started command buffer ({} bytes)", line.len());
            self.buffer.push_str(line);
            self.last_chunk_ms = now_ms;
            return Ok(Feed::Pending);
        }

        Ok(Feed::Complete(line.to_string()))
    }

    fn append(&mut self, chunk: &str, now_ms: u64) -> Result<Feed, ReassemblyError> {
        if let Err(e) = self.check_len(self.buffer.len() + chunk.len()) {
            log::warn!("Command buffer overflow, discarding {} bytes", self.buffer.len());
            self.buffer.clear();
            return Err(e);
        }

        self.buffer.push_str(chunk);
        self.last_chunk_ms = now_ms;

        if self.buffer.trim_end().ends_with('}') {
            let line = core::mem::take(&mut self.buffer);
            log::debug!("Command buffer complete ({} bytes)", line.len());
            Ok(Feed::Complete(line))
        } else {
            Ok(Feed::Pending)
        }
    }

    #[inline]
    fn check_len(&self, len: usize) -> Result<(), ReassemblyError> {
        match self.config.max_len {
            Some(max) if len > max => Err(ReassemblyError::Overflow),
            _ => Ok(()),
        }
    }

    #[inline]
    fn is_stale(&self, now_ms: u64) -> bool {
        match self.config.idle_timeout_ms {
            Some(timeout) => now_ms.saturating_sub(self.last_chunk_ms) > timeout,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_single_chunk_passes_through_trimmed() {
        let mut r = Reassembler::new();
        assert_eq!(
            r.push("GET:settings\r\n", 0),
            Ok(Feed::Complete("GET:settings".to_string()))
        );
        assert!(!r.is_pending());
    }

    #[test]
    fn test_complete_settings_in_one_chunk() {
        let mut r = Reassembler::new();
        assert_eq!(
            r.push("SET:settings::{\"a\":1}\n", 0),
            Ok(Feed::Complete("SET:settings::{\"a\":1}".to_string()))
        );
    }

    #[test]
    fn test_two_chunks_join_into_one_command() {
        let mut r = Reassembler::new();
        assert_eq!(r.push("SET:settings::{\"a\":1", 0), Ok(Feed::Pending));
        assert!(r.is_pending());
        assert_eq!(
            r.push("}", 5),
            Ok(Feed::Complete("SET:settings::{\"a\":1}".to_string()))
        );
        assert!(!r.is_pending());
    }

    #[test]
    fn test_continuation_is_not_parsed_as_command() {
        let mut r = Reassembler::new();
        assert_eq!(r.push("SET:settings::{\"a\":", 0), Ok(Feed::Pending));
        // Looks like a command, but belongs to the open buffer
        assert_eq!(r.push("GET:settings", 1), Ok(Feed::Pending));
        assert_eq!(r.pending_len(), "SET:settings::{\"a\":GET:settings".len());
    }

    #[test]
    fn test_continuation_appended_verbatim() {
        let mut r = Reassembler::new();
        assert_eq!(r.push("IMPORT::{\n", 0), Ok(Feed::Pending));
        assert_eq!(r.push("  \"a\": 1\n", 1), Ok(Feed::Pending));
        assert_eq!(
            r.push("}\n", 2),
            Ok(Feed::Complete("IMPORT::{  \"a\": 1\n}\n".to_string()))
        );
    }

    #[test]
    fn test_blank_chunk_is_idle() {
        let mut r = Reassembler::new();
        assert_eq!(r.push("\r\n", 0), Ok(Feed::Idle));
    }

    #[test]
    fn test_overflow_discards_buffer() {
        let mut r = Reassembler::with_config(ReassemblerConfig {
            max_len: Some(24),
            idle_timeout_ms: None,
        });
        assert_eq!(r.push("SET:settings::{\"a\":", 0), Ok(Feed::Pending));
        assert_eq!(r.push("1234567890", 1), Err(ReassemblyError::Overflow));
        assert!(!r.is_pending());
        // Next chunk starts fresh
        assert_eq!(
            r.push("GET:settings", 2),
            Ok(Feed::Complete("GET:settings".to_string()))
        );
    }

    #[test]
    fn test_stale_buffer_is_dropped() {
        let mut r = Reassembler::with_config(ReassemblerConfig {
            max_len: None,
            idle_timeout_ms: Some(100),
        });
        assert_eq!(r.push("SET:settings::{\"a\":", 0), Ok(Feed::Pending));
        assert_eq!(
            r.push("GET:settings", 500),
            Ok(Feed::Complete("GET:settings".to_string()))
        );
    }

    #[test]
    fn test_unbounded_keeps_waiting() {
        let mut r = Reassembler::with_config(ReassemblerConfig::unbounded());
        assert_eq!(r.push("SET:settings::{\"a\":", 0), Ok(Feed::Pending));
        assert_eq!(r.push("1", 1_000_000), Ok(Feed::Pending));
        assert!(r.is_pending());
    }
}
