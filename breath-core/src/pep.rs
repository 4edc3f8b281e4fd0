//! PEP (Positive Expiratory Pressure) training mode.
//!
//! The user must exhale at or above a target pressure for a hold time. The
//! ring shows progress towards the target in the start color, switches to
//! the success color while the target is held, and blinks the success color
//! once the hold completes.
//!
//! ```text
//!            v >= target               held >= hold_time
//! WAITING ----------------> HOLDING ---------------------> BLINKING
//!    ^                         |                              |
//!    +------- v < target ------+                              |
//!    +------------------ 2 x blink_times steps ---------------+
//! ```
//!
//! Blinking is a timed sub-state driven by [`PepModeEngine::poll`], so the
//! control loop never sleeps.

use crate::settings::Settings;
use crate::types::{RingFrame, Timestamp};

/// Current phase of the PEP cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PepPhase {
    /// Below target.
    #[default]
    Waiting,
    /// At or above target since `since`.
    Holding { since: Timestamp },
    /// Success blink started at `started`.
    Blinking { started: Timestamp },
}

/// Result of feeding a reading to the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PepOutcome {
    /// PEP mode is off, the ring belongs to regular feedback.
    NotHandled,
    /// PEP mode owns the ring; carries the frame to show, if any.
    Handled(Option<RingFrame>),
}

impl PepOutcome {
    #[inline]
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

/// PEP hold-and-release state machine.
#[derive(Clone, Debug, Default)]
pub struct PepModeEngine {
    phase: PepPhase,
    /// Blink step last emitted.
    shown_step: Option<u64>,
}

impl PepModeEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> PepPhase {
        self.phase
    }

    /// Feed a breath reading.
    pub fn update(&mut self, value: f32, now: Timestamp, settings: &Settings) -> PepOutcome {
        if !settings.pep_mode_enabled {
            self.cancel();
            return PepOutcome::NotHandled;
        }

        if let PepPhase::Blinking { started } = self.phase {
            match blink_step(started, now, settings) {
                Some(step) => {
                    self.shown_step = Some(step);
                    return PepOutcome::Handled(Some(blink_frame(step, settings)));
                }
                None => self.finish_blink(),
            }
        }

        let target = settings.pep_target_value;

        if value >= target {
            let since = match self.phase {
                PepPhase::Holding { since } => since,
                _ => {
                    log::info!("PEP target reached: {} >= {}", value, target);
                    self.phase = PepPhase::Holding { since: now };
                    now
                }
            };

            let frame = holding_frame(value, settings);

            if now.secs_since(since) >= settings.pep_hold_time {
                log::info!("PEP hold time completed");
                self.start_blink(now, settings);
            }

            PepOutcome::Handled(Some(frame))
        } else {
            if matches!(self.phase, PepPhase::Holding { .. }) {
                log::debug!("PEP target lost");
            }
            self.phase = PepPhase::Waiting;
            PepOutcome::Handled(Some(waiting_frame(value, settings)))
        }
    }

    /// Advance the blink animation without a reading.
    ///
    /// Returns a frame only when the blink step changes.
    pub fn poll(&mut self, now: Timestamp, settings: &Settings) -> Option<RingFrame> {
        if !settings.pep_mode_enabled {
            self.cancel();
            return None;
        }

        let PepPhase::Blinking { started } = self.phase else {
            return None;
        };

        match blink_step(started, now, settings) {
            Some(step) if self.shown_step != Some(step) => {
                self.shown_step = Some(step);
                Some(blink_frame(step, settings))
            }
            Some(_) => None,
            None => {
                self.finish_blink();
                None
            }
        }
    }

    /// Drop any progress and return to waiting.
    pub fn cancel(&mut self) {
        self.phase = PepPhase::Waiting;
        self.shown_step = None;
    }

    fn start_blink(&mut self, now: Timestamp, settings: &Settings) {
        self.shown_step = None;
        if settings.pep_blink_times == 0 || blink_period_ms(settings).is_none() {
            self.phase = PepPhase::Waiting;
        } else {
            self.phase = PepPhase::Blinking { started: now };
        }
    }

    fn finish_blink(&mut self) {
        log::debug!("PEP success blink completed");
        self.cancel();
    }
}

/// Blink step length in whole milliseconds, `None` if too short to show.
fn blink_period_ms(settings: &Settings) -> Option<u64> {
    let period = libm::roundf(settings.pep_blink_speed * 1000.0);
    if period >= 1.0 {
        Some(period as u64)
    } else {
        None
    }
}

/// Step index at `now`, `None` once the sequence is over.
fn blink_step(started: Timestamp, now: Timestamp, settings: &Settings) -> Option<u64> {
    let period = blink_period_ms(settings)?;
    let step = now.millis_since(started) / period;
    let total = u64::from(settings.pep_blink_times) * 2;
    if step < total {
        Some(step)
    } else {
        None
    }
}

/// Even steps are dark, odd steps show the success color at full brightness.
fn blink_frame(step: u64, settings: &Settings) -> RingFrame {
    if step % 2 == 0 {
        RingFrame::off()
    } else {
        RingFrame::new(
            settings.pep_success_color,
            settings.pep_max_brightness.clamp(0.0, 1.0),
        )
    }
}

fn holding_frame(value: f32, settings: &Settings) -> RingFrame {
    let target = settings.pep_target_value;
    let headroom = 1.0 - target;
    let factor = if headroom > 0.0 {
        ((value - target) / headroom).clamp(0.0, 1.0)
    } else {
        1.0
    };
    RingFrame::new(
        settings.pep_success_color,
        interpolate(settings.pep_start_brightness, settings.pep_max_brightness, factor),
    )
}

fn waiting_frame(value: f32, settings: &Settings) -> RingFrame {
    let target = settings.pep_target_value;
    let progress = if target > 0.0 && value > 0.0 {
        (value / target).min(1.0)
    } else {
        0.0
    };
    RingFrame::new(
        settings.pep_start_color,
        interpolate(settings.pep_start_brightness, settings.pep_max_brightness, progress),
    )
}

#[inline]
fn interpolate(start: f32, end: f32, factor: f32) -> f32 {
    (start + factor * (end - start)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::types::Rgb;
    use std::vec::Vec;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn settings() -> Settings {
        Settings {
            pep_mode_enabled: true,
            pep_target_value: 0.8,
            pep_hold_time: 1.0,
            pep_start_brightness: 0.2,
            pep_max_brightness: 1.0,
            pep_blink_times: 3,
            pep_blink_speed: 0.2,
            ..Settings::default()
        }
    }

    #[test]
    fn test_disabled_is_not_handled() {
        let mut engine = PepModeEngine::new();
        let s = Settings::default();
        assert_eq!(engine.update(0.9, ms(0), &s), PepOutcome::NotHandled);
        assert_eq!(engine.poll(ms(10), &s), None);
    }

    #[test]
    fn test_hold_window_resets_on_drop() {
        let s = settings();
        let mut engine = PepModeEngine::new();

        engine.update(0.9, ms(0), &s);
        assert_eq!(engine.phase(), PepPhase::Holding { since: ms(0) });
        engine.update(0.9, ms(500), &s);
        assert_eq!(engine.phase(), PepPhase::Holding { since: ms(0) });

        engine.update(0.5, ms(600), &s);
        assert_eq!(engine.phase(), PepPhase::Waiting);

        engine.update(0.9, ms(600), &s);
        assert_eq!(engine.phase(), PepPhase::Holding { since: ms(600) });

        // A fresh window: 1.0 s after the first entry is not enough
        engine.update(0.9, ms(1_000), &s);
        assert_eq!(engine.phase(), PepPhase::Holding { since: ms(600) });
    }

    #[test]
    fn test_target_reached_exactly_enters_holding() {
        let s = settings();
        let mut engine = PepModeEngine::new();
        engine.update(0.8, ms(0), &s);
        assert_eq!(engine.phase(), PepPhase::Holding { since: ms(0) });
    }

    #[test]
    fn test_waiting_frame_tracks_progress() {
        let s = settings();
        let mut engine = PepModeEngine::new();

        let PepOutcome::Handled(Some(frame)) = engine.update(0.4, ms(0), &s) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.color, Rgb::RED);
        assert!((frame.brightness - 0.6).abs() < 1e-6);

        let PepOutcome::Handled(Some(frame)) = engine.update(-0.4, ms(10), &s) else {
            panic!("expected a frame");
        };
        assert!((frame.brightness - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_holding_frame_uses_headroom() {
        let s = settings();
        let mut engine = PepModeEngine::new();

        let PepOutcome::Handled(Some(frame)) = engine.update(0.9, ms(0), &s) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.color, Rgb::GREEN);
        assert!((frame.brightness - 0.6).abs() < 1e-5);

        // Target at full scale: no headroom, full brightness
        let s = Settings {
            pep_target_value: 1.0,
            ..settings()
        };
        let mut engine = PepModeEngine::new();
        let PepOutcome::Handled(Some(frame)) = engine.update(1.0, ms(0), &s) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.brightness, 1.0);
    }

    #[test]
    fn test_blink_emits_two_frames_per_blink() {
        let s = settings();
        let mut engine = PepModeEngine::new();

        engine.update(0.9, ms(0), &s);
        engine.update(0.9, ms(1_000), &s);
        assert_eq!(engine.phase(), PepPhase::Blinking { started: ms(1_000) });

        let frames: Vec<RingFrame> = (1_000..2_400)
            .step_by(20)
            .filter_map(|t| engine.poll(ms(t), &s))
            .collect();

        assert_eq!(frames.len(), 6);
        for (i, frame) in frames.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(*frame, RingFrame::off());
            } else {
                assert_eq!(*frame, RingFrame::new(Rgb::GREEN, 1.0));
            }
        }
        assert_eq!(engine.phase(), PepPhase::Waiting);
    }

    #[test]
    fn test_blink_ignores_breath_value() {
        let s = settings();
        let mut engine = PepModeEngine::new();
        engine.update(0.9, ms(0), &s);
        engine.update(0.9, ms(1_000), &s);

        // Step 1 (on) regardless of the low reading
        let outcome = engine.update(-0.9, ms(1_250), &s);
        assert_eq!(
            outcome,
            PepOutcome::Handled(Some(RingFrame::new(Rgb::GREEN, 1.0)))
        );
        assert!(matches!(engine.phase(), PepPhase::Blinking { .. }));

        // Sequence over: back to regular waiting rendering
        engine.update(0.1, ms(2_200), &s);
        assert_eq!(engine.phase(), PepPhase::Waiting);
    }

    #[test]
    fn test_long_blink_sequence_keeps_counting_steps() {
        let s = Settings {
            pep_blink_times: u32::MAX,
            pep_blink_speed: 0.001,
            ..settings()
        };
        let mut engine = PepModeEngine::new();
        engine.update(0.9, ms(0), &s);
        engine.update(0.9, ms(1_000), &s);

        let on = RingFrame::new(Rgb::GREEN, 1.0);
        assert_eq!(engine.poll(ms(1_001), &s), Some(on));
        // Step 2^32 + 1 is a different step from step 1
        assert_eq!(engine.poll(ms(1_001 + (1 << 32)), &s), Some(on));
        assert!(matches!(engine.phase(), PepPhase::Blinking { .. }));
    }

    #[test]
    fn test_zero_blinks_complete_immediately() {
        let s = Settings {
            pep_blink_times: 0,
            ..settings()
        };
        let mut engine = PepModeEngine::new();
        engine.update(0.9, ms(0), &s);
        engine.update(0.9, ms(1_000), &s);
        assert_eq!(engine.phase(), PepPhase::Waiting);
    }

    #[test]
    fn test_disable_mid_cycle_resets() {
        let s = settings();
        let mut engine = PepModeEngine::new();
        engine.update(0.9, ms(0), &s);

        let off = Settings {
            pep_mode_enabled: false,
            ..settings()
        };
        assert_eq!(engine.update(0.9, ms(100), &off), PepOutcome::NotHandled);
        assert_eq!(engine.phase(), PepPhase::Waiting);
    }
}
