//! UART breath sensor source.
//!
//! The sensor board streams one reading per line on UART0 RX (GPIO 1),
//! 115200 baud, 8N1. See [`parse_breath_line`] for the accepted format.

use breath_core::{parse_breath_line, BreathSource, InputError, MAX_LINE_LENGTH};
use embassy_rp::uart::{Async, Error as UartError, UartRx};
use heapless::Vec;

/// Room for the longest accepted line plus a trailing `\r`.
const LINE_CAPACITY: usize = MAX_LINE_LENGTH + 1;

/// Convert UART errors to [`InputError`].
///
/// A helper instead of a `From` impl: both types are foreign to this crate.
#[inline]
fn uart_error_to_input_error(e: UartError) -> InputError {
    match e {
        UartError::Framing => InputError::Framing,
        UartError::Overrun => InputError::BufferOverflow,
        _ => InputError::Io,
    }
}

/// Breath readings from the sensor UART.
pub struct UartBreathSource<'d> {
    rx: UartRx<'d, Async>,
    line: Vec<u8, LINE_CAPACITY>,
}

impl<'d> UartBreathSource<'d> {
    #[must_use]
    pub fn new(rx: UartRx<'d, Async>) -> Self {
        Self { rx, line: Vec::new() }
    }

    /// Read bytes until a newline.
    ///
    /// If a line exceeds the buffer, the rest of it is discarded so the
    /// next read starts on a line boundary.
    async fn read_line(&mut self) -> Result<(), InputError> {
        self.line.clear();
        let mut byte = [0u8; 1];

        loop {
            self.rx
                .read(&mut byte)
                .await
                .map_err(uart_error_to_input_error)?;

            if byte[0] == b'\n' {
                return Ok(());
            }

            if self.line.push(byte[0]).is_err() {
                loop {
                    self.rx
                        .read(&mut byte)
                        .await
                        .map_err(uart_error_to_input_error)?;
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                return Err(InputError::BufferOverflow);
            }
        }
    }
}

impl BreathSource for UartBreathSource<'_> {
    async fn receive(&mut self) -> Result<f32, InputError> {
        self.read_line().await?;
        parse_breath_line(&self.line)
    }
}
