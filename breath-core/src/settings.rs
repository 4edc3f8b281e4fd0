//! Typed device settings and the store that owns them.
//!
//! The settings document is a flat JSON object. Every known key is always
//! present (missing keys take their defaults), unknown keys are carried along
//! untouched so a configuration tool can round-trip its own extras.
//!
//! All mutation goes through [`SettingsStore::merge_json`] /
//! [`SettingsStore::merge_map`]: the patch is overlaid on the current document
//! and the result is re-validated as a whole before it replaces the current
//! settings. A rejected patch leaves the settings unchanged.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use breath_proto::{decode_record, encode_record, RecordError};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::persistence::{PersistError, SettingsPersistence};
use crate::types::Rgb;

/// Output style for breath input.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Continuous joystick axes.
    #[default]
    Joystick,
    /// Discrete button presses past a threshold.
    Buttons,
}

/// Joystick direction a breath direction is mapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Up and left move the axis above center.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Up | Self::Left)
    }

    /// Up and down drive the Y axis, left and right the X axis.
    #[inline]
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// LED ring color behavior.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedColorMode {
    /// Palette color that advances on every new inhale.
    #[default]
    Rainbow,
    /// Fixed color, brightness follows the exhale.
    Single,
    /// Fixed color whose channels fade with the exhale.
    Breathing,
}

/// Gamepad button bound to a breath direction.
///
/// Serialized as `"none"` or the button number; accepts the number as a
/// JSON string or integer.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonBinding {
    #[default]
    None,
    /// Button 1-8.
    Button(u8),
}

impl ButtonBinding {
    #[inline]
    #[must_use]
    pub const fn number(self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Button(n) => Some(n),
        }
    }
}

impl Serialize for ButtonBinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_str("none"),
            Self::Button(n) => serializer.serialize_u8(*n),
        }
    }
}

impl<'de> Deserialize<'de> for ButtonBinding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BindingVisitor;

        impl BindingVisitor {
            fn button<E: de::Error>(number: u64) -> Result<ButtonBinding, E> {
                match number {
                    1..=8 => Ok(ButtonBinding::Button(number as u8)),
                    _ => Err(E::custom("button must be in range 1 to 8")),
                }
            }
        }

        impl Visitor<'_> for BindingVisitor {
            type Value = ButtonBinding;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"none\" or a button number 1-8")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ButtonBinding, E> {
                if v.eq_ignore_ascii_case("none") {
                    return Ok(ButtonBinding::None);
                }
                let number = v
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
                Self::button(number)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ButtonBinding, E> {
                Self::button(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ButtonBinding, E> {
                u64::try_from(v)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
                    .and_then(Self::button)
            }
        }

        deserializer.deserialize_any(BindingVisitor)
    }
}

/// The complete settings document.
///
/// Field names are the JSON keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub control_mode: ControlMode,

    // Joystick
    pub deadzone: f32,
    pub sensitivity: f32,
    pub blow_direction: Direction,
    pub inhale_direction: Direction,

    // Gamepad buttons
    pub blow_button: ButtonBinding,
    pub inhale_button: ButtonBinding,
    pub blow_threshold: f32,
    pub inhale_threshold: f32,

    // GPIO triggers
    pub blow_gpio_threshold: f32,
    pub inhale_gpio_threshold: f32,
    pub blow_gpio_pin: u8,
    pub inhale_gpio_pin: u8,

    // LED ring
    pub led_enabled: bool,
    pub led_start_brightness: f32,
    pub led_max_brightness: f32,
    pub led_color_mode: LedColorMode,
    pub led_single_color: Rgb,

    // PEP mode
    pub pep_mode_enabled: bool,
    pub pep_target_value: f32,
    pub pep_hold_time: f32,
    pub pep_start_color: Rgb,
    pub pep_success_color: Rgb,
    pub pep_start_brightness: f32,
    pub pep_max_brightness: f32,
    pub pep_blink_times: u32,
    pub pep_blink_speed: f32,

    // DFPlayer
    pub dfplayer_enabled: bool,
    pub current_track: u8,
    pub min_volume: u8,
    pub max_volume: u8,
    pub current_volume: u8,
    pub track_change_threshold: f32,

    /// Keys this firmware does not interpret, kept for round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::Joystick,

            deadzone: 0.02,
            sensitivity: 2.0,
            blow_direction: Direction::Right,
            inhale_direction: Direction::Left,

            blow_button: ButtonBinding::None,
            inhale_button: ButtonBinding::None,
            blow_threshold: 0.5,
            inhale_threshold: 0.5,

            blow_gpio_threshold: 0.7,
            inhale_gpio_threshold: -0.7,
            blow_gpio_pin: 8,
            inhale_gpio_pin: 9,

            led_enabled: true,
            led_start_brightness: 0.05,
            led_max_brightness: 1.0,
            led_color_mode: LedColorMode::Rainbow,
            led_single_color: Rgb::RED,

            pep_mode_enabled: false,
            pep_target_value: 0.8,
            pep_hold_time: 2.0,
            pep_start_color: Rgb::RED,
            pep_success_color: Rgb::GREEN,
            pep_start_brightness: 0.3,
            pep_max_brightness: 1.0,
            pep_blink_times: 3,
            pep_blink_speed: 0.2,

            dfplayer_enabled: false,
            current_track: 1,
            min_volume: 5,
            max_volume: 30,
            current_volume: 10,
            track_change_threshold: -0.5,

            extra: Map::new(),
        }
    }
}

/// Error type for settings operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Input was not valid JSON, or a value did not fit its key.
    Json(String),
    /// Input was valid JSON but not an object.
    NotAnObject,
    /// Persistence collaborator failed.
    Persist(PersistError),
    /// Stored record is damaged.
    Record(RecordError),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => f.write_str(msg),
            Self::NotAnObject => f.write_str("expected a JSON object"),
            Self::Persist(e) => write!(f, "{}", e),
            Self::Record(e) => write!(f, "{}", e),
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Json(err.to_string())
    }
}

impl From<PersistError> for SettingsError {
    fn from(err: PersistError) -> Self {
        SettingsError::Persist(err)
    }
}

impl From<RecordError> for SettingsError {
    fn from(err: RecordError) -> Self {
        SettingsError::Record(err)
    }
}

/// Owner of the live [`Settings`]; the only place they change.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    settings: Settings,
}

impl SettingsStore {
    /// Create a store holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an existing document.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    /// Current settings.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Shallow-merge a JSON object into the settings.
    ///
    /// Returns the number of keys in the patch.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] on malformed JSON or a value of the
    /// wrong type, [`SettingsError::NotAnObject`] for a non-object. The
    /// settings are unchanged on error.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, SettingsError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(patch) => self.merge_map(patch),
            _ => Err(SettingsError::NotAnObject),
        }
    }

    /// Shallow-merge an already parsed object into the settings.
    ///
    /// # Errors
    ///
    /// See [`merge_json`](Self::merge_json).
    pub fn merge_map(&mut self, patch: Map<String, Value>) -> Result<usize, SettingsError> {
        let mut merged = match serde_json::to_value(&self.settings)? {
            Value::Object(map) => map,
            _ => return Err(SettingsError::NotAnObject),
        };

        let keys = patch.len();
        for (key, value) in patch {
            merged.insert(key, value);
        }

        self.settings = serde_json::from_value(Value::Object(merged))?;
        log::debug!("Merged {} settings keys", keys);
        Ok(keys)
    }

    /// Compact JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(&self.settings)?)
    }

    /// Indented JSON document, as produced by `EXPORT`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(&self.settings)?)
    }

    /// Load stored settings over the defaults.
    ///
    /// Returns `Ok(true)` if a stored document was applied, `Ok(false)` if
    /// storage was empty. Keys missing from the stored document keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if storage could not be read or the record is
    /// damaged; the current settings are kept in that case.
    pub fn load<P: SettingsPersistence>(&mut self, storage: &mut P) -> Result<bool, SettingsError> {
        let Some(bytes) = storage.load()? else {
            return Ok(false);
        };

        let payload = match decode_record(&bytes) {
            Ok(payload) => payload,
            Err(RecordError::Blank) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let json = core::str::from_utf8(payload)
            .map_err(|_| SettingsError::Json("stored settings are not UTF-8".to_string()))?;

        let mut loaded = Self::new();
        loaded.merge_json(json)?;
        self.settings = loaded.settings;
        log::info!("Loaded settings ({} bytes)", payload.len());
        Ok(true)
    }

    /// Write the current settings to storage.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write failed. In-memory settings
    /// are never affected.
    pub fn save<P: SettingsPersistence>(&self, storage: &mut P) -> Result<(), SettingsError> {
        let json = self.to_json()?;
        let record: Vec<u8> = encode_record(json.as_bytes())?;
        storage.save(&record)?;
        log::info!("Saved settings ({} bytes)", json.len());
        Ok(())
    }
}
