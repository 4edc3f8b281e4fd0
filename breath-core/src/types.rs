//! Core value types: Timestamp, Rgb, BreathState, RingFrame, XacButtons, XacReport.

use core::ops::{BitOr, BitOrAssign};
use serde::{Deserialize, Serialize};

/// Monotonic time in milliseconds since boot.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(u64);

impl Timestamp {
    /// Boot time.
    pub const ZERO: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time in seconds, as reported over the command channel.
    #[inline]
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    #[inline]
    #[must_use]
    pub const fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Seconds elapsed since `earlier`, saturating at zero.
    #[inline]
    #[must_use]
    pub fn secs_since(self, earlier: Timestamp) -> f32 {
        self.millis_since(earlier) as f32 / 1000.0
    }
}

/// 8-bit RGB color, serialized as `[r, g, b]`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const YELLOW: Self = Self::new(255, 255, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `factor` (clamped to [0, 1]), truncating.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        let channel = |c: u8| (f32::from(c) * factor) as u8;
        Self::new(channel(self.r), channel(self.g), channel(self.b))
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        [color.r, color.g, color.b]
    }
}

/// Breath direction classified against the deadzone.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BreathState {
    /// Reading above `+deadzone`.
    Exhaling,
    /// Reading below `-deadzone`.
    Inhaling,
    /// Reading within the deadzone.
    #[default]
    Neutral,
}

impl BreathState {
    #[must_use]
    pub fn classify(value: f32, deadzone: f32) -> Self {
        if value > deadzone {
            Self::Exhaling
        } else if value < -deadzone {
            Self::Inhaling
        } else {
            Self::Neutral
        }
    }
}

/// One LED ring update: fill every pixel with `color` at `brightness`, then flush.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingFrame {
    pub color: Rgb,
    /// Global brightness in [0, 1].
    pub brightness: f32,
}

impl RingFrame {
    #[must_use]
    pub const fn new(color: Rgb, brightness: f32) -> Self {
        Self { color, brightness }
    }

    /// All pixels dark.
    #[must_use]
    pub const fn off() -> Self {
        Self::new(Rgb::BLACK, 0.0)
    }

    /// Pixel color with the brightness applied, for drivers without a global
    /// brightness register.
    #[must_use]
    pub fn scaled(&self) -> Rgb {
        self.color.scale(self.brightness)
    }
}

/// XAC gamepad buttons 1-8 as a bitfield.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XacButtons(pub u8);

impl XacButtons {
    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Bit for button `number` (1-8).
    #[must_use]
    pub const fn button(number: u8) -> Option<Self> {
        match number {
            1..=8 => Some(Self(1 << (number - 1))),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, buttons: XacButtons) -> bool {
        (self.0 & buttons.0) == buttons.0
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for XacButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for XacButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// HID report id used by the XAC gamepad descriptor.
pub const XAC_REPORT_ID: u8 = 5;

/// Axis value for a centered stick.
pub const AXIS_CENTER: u8 = 128;

/// XAC-compatible gamepad report: two 8-bit axes and 8 buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XacReport {
    pub x: u8,
    pub y: u8,
    pub buttons: XacButtons,
}

impl XacReport {
    /// Size of the report on the wire, including the report id.
    pub const SIZE: usize = 4;

    /// Sticks centered, nothing pressed.
    pub const NEUTRAL: Self = Self {
        x: AXIS_CENTER,
        y: AXIS_CENTER,
        buttons: XacButtons::NONE,
    };

    /// Report bytes as written to the HID endpoint.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        [XAC_REPORT_ID, self.x, self.y, self.buttons.0]
    }
}

impl Default for XacReport {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Levels of the two trigger GPIO outputs.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerLevels {
    pub blow: bool,
    pub inhale: bool,
}
