//! DFPlayer Mini audio module on UART1 TX (GPIO 4), 9600 baud.

use breath_core::{AudioCommand, AudioSink, OutputError};
use embassy_rp::uart::{Async, UartTx};

/// Sends encoded command frames to the player. Replies are not read.
pub struct DfPlayer<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> DfPlayer<'d> {
    #[must_use]
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl AudioSink for DfPlayer<'_> {
    async fn send(&mut self, command: AudioCommand) -> Result<(), OutputError> {
        defmt::debug!("DFPlayer {:?}", command);
        self.tx
            .write(&command.encode())
            .await
            .map_err(|_| OutputError::Io)
    }
}
