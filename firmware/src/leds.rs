//! WS2812 LED ring and status pixel on PIO0.

use breath_core::{OutputError, Rgb, RingFrame, RingSink, StatusSink};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio_programs::ws2812::PioWs2812;
use smart_leds::RGB8;

use crate::config::LED_COUNT;

#[inline]
fn to_rgb8(color: Rgb) -> RGB8 {
    RGB8::new(color.r, color.g, color.b)
}

/// Feedback ring on PIO0 SM0.
///
/// WS2812s have no brightness register, so each frame is scaled before
/// it is written.
pub struct LedRing {
    driver: PioWs2812<'static, PIO0, 0, LED_COUNT>,
}

impl LedRing {
    #[must_use]
    pub fn new(driver: PioWs2812<'static, PIO0, 0, LED_COUNT>) -> Self {
        Self { driver }
    }
}

impl RingSink for LedRing {
    async fn show(&mut self, frame: &RingFrame) -> Result<(), OutputError> {
        let pixels = [to_rgb8(frame.scaled()); LED_COUNT];
        self.driver.write(&pixels).await;
        Ok(())
    }
}

/// Single status pixel on PIO0 SM1.
pub struct StatusPixel {
    driver: PioWs2812<'static, PIO0, 1, 1>,
}

impl StatusPixel {
    #[must_use]
    pub fn new(driver: PioWs2812<'static, PIO0, 1, 1>) -> Self {
        Self { driver }
    }
}

impl StatusSink for StatusPixel {
    async fn set(&mut self, color: Rgb) -> Result<(), OutputError> {
        self.driver.write(&[to_rgb8(color)]).await;
        Ok(())
    }
}
