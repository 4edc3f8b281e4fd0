//! Breath reading to 8-bit axis value.
//!
//! The curve is `|v|^(1/sensitivity)`, so sensitivity above 1 makes small
//! breaths count for more. The result is placed above or below the 128
//! center depending on the direction configured for the breath's sign.

use crate::settings::Settings;
use crate::types::AXIS_CENTER;

/// Largest offset from center in either direction.
const AXIS_SPAN: f32 = 127.0;

/// Map a breath reading to an axis value in `0..=255`.
///
/// Readings inside the deadzone map to center. Never fails: a zero
/// sensitivity or a non-finite curve result falls back to the linear
/// magnitude.
#[must_use]
pub fn map(value: f32, settings: &Settings) -> u8 {
    let magnitude = libm::fabsf(value);
    if magnitude < settings.deadzone || value == 0.0 || value.is_nan() {
        return AXIS_CENTER;
    }

    let scaled = if settings.sensitivity == 0.0 {
        magnitude
    } else {
        let curved = libm::powf(magnitude, 1.0 / settings.sensitivity);
        if curved.is_finite() {
            curved
        } else {
            magnitude
        }
    };

    let offset = libm::roundf(scaled.clamp(0.0, 1.0) * AXIS_SPAN) as i16;

    let direction = if value > 0.0 {
        settings.blow_direction
    } else {
        settings.inhale_direction
    };

    let axis = if direction.is_positive() {
        i16::from(AXIS_CENTER) + offset
    } else {
        i16::from(AXIS_CENTER) - offset
    };

    axis.clamp(0, 255) as u8
}
