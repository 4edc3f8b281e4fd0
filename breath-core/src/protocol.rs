//! Serial configuration channel: chunk reassembly and command dispatch.
//!
//! Every failure is turned into an `ERROR:` reply here; nothing past this
//! point sees a protocol error.

use breath_proto::{parse_command, Command, Feed, Reassembler, ReassemblerConfig, Response};

use crate::measurement::MeasurementTracker;
use crate::persistence::SettingsPersistence;
use crate::settings::SettingsStore;
use crate::types::Timestamp;

/// Characters of an unrecognized line echoed back in the error.
const UNKNOWN_ECHO_CHARS: usize = 32;

/// State the command handlers act on.
pub struct ProtocolContext<'a, P> {
    pub settings: &'a mut SettingsStore,
    pub measurement: &'a mut MeasurementTracker,
    pub storage: &'a mut P,
}

/// Parses and dispatches inbound command chunks.
#[derive(Debug, Default)]
pub struct CommandProtocol {
    reassembler: Reassembler,
}

impl CommandProtocol {
    /// Protocol with the default reassembly limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protocol with explicit reassembly limits.
    #[must_use]
    pub fn with_config(config: ReassemblerConfig) -> Self {
        Self {
            reassembler: Reassembler::with_config(config),
        }
    }

    /// Whether a partial command is buffered.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.reassembler.is_pending()
    }

    /// Feed one raw chunk from the serial port.
    ///
    /// Returns the reply to send, or `None` while a command is still being
    /// reassembled or the chunk was blank.
    pub fn handle_chunk<P: SettingsPersistence>(
        &mut self,
        chunk: &str,
        now: Timestamp,
        ctx: ProtocolContext<'_, P>,
    ) -> Option<Response> {
        match self.reassembler.push(chunk, now.as_millis()) {
            Ok(Feed::Complete(line)) => Some(dispatch(&line, ctx)),
            Ok(Feed::Pending) => {
                log::debug!("Buffering command, {} bytes", self.reassembler.pending_len());
                None
            }
            Ok(Feed::Idle) => None,
            Err(e) => {
                log::warn!("Command buffer dropped: {}", e);
                Some(Response::error(e))
            }
        }
    }
}

/// Execute one complete command line.
pub fn dispatch<P: SettingsPersistence>(line: &str, ctx: ProtocolContext<'_, P>) -> Response {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            log::warn!("Rejected command ({})", e);
            return Response::error(format_args!("Unknown command: {}", echo(line)));
        }
    };

    match command {
        Command::GetSettings => match ctx.settings.to_json() {
            Ok(json) => Response::Settings(json),
            Err(e) => Response::error(e),
        },
        Command::GetMeasurements => match serde_json::to_string(&ctx.measurement.export()) {
            Ok(json) => Response::Measurements(json),
            Err(e) => Response::error(e),
        },
        Command::SetSettings(payload) => match ctx.settings.merge_json(payload) {
            Ok(_) => Response::Ok,
            Err(e) => {
                log::warn!("Settings rejected: {}", e);
                Response::error(format_args!("JSON error: {}", e))
            }
        },
        Command::SetMeasure(active) => {
            ctx.measurement.set_active(active);
            Response::Ok
        }
        Command::Save => match ctx.settings.save(ctx.storage) {
            Ok(()) => Response::Ok,
            Err(e) => {
                log::warn!("Saving settings failed: {}", e);
                Response::error("Failed to save settings")
            }
        },
        Command::Export => match ctx.settings.to_pretty_json() {
            Ok(json) => Response::Export(json),
            Err(e) => Response::error(format_args!("Export error: {}", e)),
        },
        Command::Import(payload) => match ctx.settings.merge_json(payload) {
            Ok(keys) => {
                log::info!("Imported {} settings", keys);
                Response::Ok
            }
            Err(e) => {
                log::warn!("Import rejected: {}", e);
                Response::error(format_args!("Import error: {}", e))
            }
        },
    }
}

/// First few characters of a line, for error replies.
fn echo(line: &str) -> &str {
    let line = line.trim();
    match line.char_indices().nth(UNKNOWN_ECHO_CHARS) {
        Some((end, _)) => &line[..end],
        None => line,
    }
}
