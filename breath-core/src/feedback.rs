//! LED ring feedback for regular (non-PEP) operation.

use crate::settings::{LedColorMode, Settings};
use crate::types::{BreathState, Rgb, RingFrame};

/// Rainbow palette, advanced one entry per inhale.
pub const RAINBOW_PALETTE: [Rgb; 7] = [
    Rgb::new(255, 0, 0),
    Rgb::new(255, 127, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(75, 0, 130),
    Rgb::new(148, 0, 211),
];

/// Position in [`RAINBOW_PALETTE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RainbowState {
    index: usize,
}

impl RainbowState {
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn color(&self) -> Rgb {
        RAINBOW_PALETTE[self.index]
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % RAINBOW_PALETTE.len();
    }
}

/// Chooses ring color and brightness from the breath state.
#[derive(Clone, Debug)]
pub struct BreathFeedbackController {
    rainbow: RainbowState,
    /// State seen by the last update, for inhale-edge detection.
    last_state: Option<BreathState>,
    /// Render on the next update even if the state is unchanged.
    force_render: bool,
    led_enabled: bool,
}

impl Default for BreathFeedbackController {
    fn default() -> Self {
        Self {
            rainbow: RainbowState::default(),
            last_state: None,
            force_render: true,
            led_enabled: true,
        }
    }
}

impl BreathFeedbackController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn rainbow(&self) -> RainbowState {
        self.rainbow
    }

    /// Render on the next update, e.g. after PEP mode drew on the ring.
    ///
    /// Inhale-edge tracking is kept, so this never advances the rainbow.
    pub fn invalidate(&mut self) {
        self.force_render = true;
    }

    /// Feed a reading; returns the frame to flush, if any.
    ///
    /// Frames are produced when the breath state changes and on every
    /// reading outside the deadzone. Disabling LED feedback blanks the
    /// ring once.
    pub fn update(&mut self, value: f32, settings: &Settings) -> Option<RingFrame> {
        if !settings.led_enabled {
            if self.led_enabled {
                self.led_enabled = false;
                self.force_render = true;
                log::debug!("LED feedback disabled");
                return Some(RingFrame::off());
            }
            return None;
        }
        self.led_enabled = true;

        let deadzone = settings.deadzone;
        let state = BreathState::classify(value, deadzone);

        let frame = match state {
            BreathState::Exhaling => {
                let norm = normalized_exhale(value, deadzone);
                let brightness = settings.led_start_brightness
                    + norm * (settings.led_max_brightness - settings.led_start_brightness);
                let color = match settings.led_color_mode {
                    LedColorMode::Rainbow => self.rainbow.color(),
                    LedColorMode::Single => settings.led_single_color,
                    LedColorMode::Breathing => settings.led_single_color.scale(norm),
                };
                RingFrame::new(color, brightness.clamp(0.0, 1.0))
            }
            BreathState::Inhaling | BreathState::Neutral => {
                if state == BreathState::Inhaling
                    && self.last_state != Some(BreathState::Inhaling)
                    && settings.led_color_mode == LedColorMode::Rainbow
                {
                    self.rainbow.advance();
                    log::debug!("New inhale, ring color index {}", self.rainbow.index());
                }
                let color = match settings.led_color_mode {
                    LedColorMode::Rainbow => self.rainbow.color(),
                    LedColorMode::Single | LedColorMode::Breathing => settings.led_single_color,
                };
                RingFrame::new(color, settings.led_start_brightness.clamp(0.0, 1.0))
            }
        };

        let changed = self.force_render || self.last_state != Some(state);
        self.last_state = Some(state);
        self.force_render = false;

        if changed || state != BreathState::Neutral {
            Some(frame)
        } else {
            None
        }
    }
}

/// Exhale magnitude past the deadzone, scaled to [0, 1].
fn normalized_exhale(value: f32, deadzone: f32) -> f32 {
    let span = 1.0 - deadzone;
    if span <= 0.0 {
        return 1.0;
    }
    ((libm::fabsf(value) - deadzone) / span).clamp(0.0, 1.0)
}
