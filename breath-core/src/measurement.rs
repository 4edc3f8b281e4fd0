//! Measurement session statistics.

use serde::Serialize;

use crate::types::Timestamp;

/// Snapshot of a measurement session, as sent in `MEASUREMENTS::`.
///
/// Unset extrema and open runs serialize as `null`; durations in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MeasurementReport {
    pub max_exhale: Option<f32>,
    pub min_inhale: Option<f32>,
    pub current_exhale_start: Option<f64>,
    pub current_inhale_start: Option<f64>,
    pub longest_exhale: f32,
    pub longest_inhale: f32,
}

/// Accumulates breath statistics while measurement mode is on.
#[derive(Clone, Debug, Default)]
pub struct MeasurementTracker {
    active: bool,
    max_exhale: Option<f32>,
    min_inhale: Option<f32>,
    exhale_start: Option<Timestamp>,
    inhale_start: Option<Timestamp>,
    longest_exhale: f32,
    longest_inhale: f32,
}

impl MeasurementTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turn measurement mode on or off, returning the previous flag.
    ///
    /// Switching on from off starts a fresh session.
    pub fn set_active(&mut self, active: bool) -> bool {
        let was_active = self.active;
        if active && !was_active {
            self.reset();
        }
        self.active = active;
        log::info!("Measurement mode {}", if active { "on" } else { "off" });
        was_active
    }

    /// Feed a reading, ignored while measurement mode is off.
    pub fn record(&mut self, value: f32, now: Timestamp) {
        if self.active {
            self.update(value, now);
        }
    }

    /// Feed a reading unconditionally.
    pub fn update(&mut self, value: f32, now: Timestamp) {
        if value > 0.0 {
            self.max_exhale = Some(self.max_exhale.map_or(value, |max| max.max(value)));
            self.exhale_start.get_or_insert(now);

            if let Some(start) = self.inhale_start.take() {
                self.longest_inhale = self.longest_inhale.max(now.secs_since(start));
            }
        } else if value < 0.0 {
            self.min_inhale = Some(self.min_inhale.map_or(value, |min| min.min(value)));
            self.inhale_start.get_or_insert(now);

            if let Some(start) = self.exhale_start.take() {
                self.longest_exhale = self.longest_exhale.max(now.secs_since(start));
            }
        }
    }

    /// Clear all statistics. The active flag is left alone.
    pub fn reset(&mut self) {
        *self = Self {
            active: self.active,
            ..Self::default()
        };
        log::debug!("Measurement session reset");
    }

    #[must_use]
    pub fn export(&self) -> MeasurementReport {
        MeasurementReport {
            max_exhale: self.max_exhale,
            min_inhale: self.min_inhale,
            current_exhale_start: self.exhale_start.map(Timestamp::as_secs_f64),
            current_inhale_start: self.inhale_start.map(Timestamp::as_secs_f64),
            longest_exhale: self.longest_exhale,
            longest_inhale: self.longest_inhale,
        }
    }
}
