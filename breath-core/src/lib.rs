//! Platform-agnostic breath signal engines, settings and output dispatch.
//!
//! This crate turns breath sensor readings into gamepad, LED and audio
//! output without any platform-specific dependencies. It runs on the
//! device in `no_std` with `alloc`, and on the host for testing.
//!
//! # Overview
//!
//! - [`settings`]: Typed settings document ([`Settings`]) and its [`SettingsStore`]
//! - [`mapper`]: Reading to axis value curve ([`map`])
//! - [`measurement`]: Session statistics ([`MeasurementTracker`])
//! - [`pep`]: PEP training state machine ([`PepModeEngine`])
//! - [`feedback`]: LED ring feedback ([`BreathFeedbackController`])
//! - [`protocol`]: Serial configuration commands ([`CommandProtocol`])
//! - [`output`]: Output dispatch and actuator traits ([`OutputDispatcher`], [`Actuators`])
//! - [`input`]: Sensor line parsing and source trait ([`parse_breath_line`], [`BreathSource`])
//! - [`persistence`]: Settings storage trait ([`SettingsPersistence`])
//! - [`controller`]: One control-loop step over all of the above ([`BreathEngine`])
//!
//! # Example
//!
//! ```rust
//! use breath_core::{BreathEngine, MemoryPersistence, Response, Timestamp};
//!
//! let mut engine = BreathEngine::default();
//! let mut storage = MemoryPersistence::new();
//!
//! let out = engine.process_command("SET:settings::{\"deadzone\":0.1}\n", Timestamp::ZERO, &mut storage);
//! assert_eq!(out.reply, Some(Response::Ok));
//!
//! let out = engine.process_reading(0.05, Timestamp::from_millis(20));
//! assert_eq!(out.gamepad.map(|report| report.to_bytes()), Some([5, 128, 128, 0]));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod controller;
pub mod feedback;
pub mod input;
pub mod mapper;
pub mod measurement;
pub mod output;
pub mod pep;
pub mod persistence;
pub mod protocol;
pub mod settings;
pub mod types;

// Re-export main types at crate root
pub use breath_proto::{AudioCommand, Response};
pub use controller::BreathEngine;
pub use feedback::{BreathFeedbackController, RainbowState, RAINBOW_PALETTE};
pub use input::{parse_breath_line, BreathSource, InputError, MAX_LINE_LENGTH};
pub use mapper::map;
pub use measurement::{MeasurementReport, MeasurementTracker};
pub use output::{
    status_color, Actuators, AudioSink, GamepadSink, OutputDispatcher, OutputError, RingSink,
    StatusSink, TickOutputs, TriggerPins,
};
pub use pep::{PepModeEngine, PepOutcome, PepPhase};
pub use persistence::{MemoryPersistence, PersistError, SettingsPersistence};
pub use protocol::{CommandProtocol, ProtocolContext};
pub use settings::{
    ButtonBinding, ControlMode, Direction, LedColorMode, Settings, SettingsError, SettingsStore,
};
pub use types::{
    BreathState, Rgb, RingFrame, Timestamp, TriggerLevels, XacButtons, XacReport, AXIS_CENTER,
    XAC_REPORT_ID,
};
