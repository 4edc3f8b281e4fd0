//! BreathEngine: runs every engine for one control-loop step.

use breath_proto::{ReassemblerConfig, Response};

use crate::feedback::BreathFeedbackController;
use crate::measurement::MeasurementTracker;
use crate::output::{OutputDispatcher, TickOutputs};
use crate::pep::{PepModeEngine, PepOutcome};
use crate::persistence::SettingsPersistence;
use crate::protocol::{CommandProtocol, ProtocolContext};
use crate::settings::{Settings, SettingsStore};
use crate::types::Timestamp;

/// All breath-processing state of the device.
///
/// Each call handles one event to completion and returns the actuator
/// work as [`TickOutputs`]; the engine never touches hardware. Settings
/// changed by a command take effect on the next reading.
#[derive(Debug, Default)]
pub struct BreathEngine {
    settings: SettingsStore,
    measurement: MeasurementTracker,
    pep: PepModeEngine,
    feedback: BreathFeedbackController,
    protocol: CommandProtocol,
    outputs: OutputDispatcher,
}

impl BreathEngine {
    /// Create an engine around existing settings.
    #[must_use]
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Create an engine with explicit command reassembly limits.
    #[must_use]
    pub fn with_reassembler(settings: SettingsStore, config: ReassemblerConfig) -> Self {
        Self {
            settings,
            protocol: CommandProtocol::with_config(config),
            ..Self::default()
        }
    }

    /// Current settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    #[inline]
    #[must_use]
    pub fn measurement(&self) -> &MeasurementTracker {
        &self.measurement
    }

    #[inline]
    #[must_use]
    pub fn pep(&self) -> &PepModeEngine {
        &self.pep
    }

    #[inline]
    #[must_use]
    pub fn feedback(&self) -> &BreathFeedbackController {
        &self.feedback
    }

    /// Load stored settings, keeping the defaults if there are none or
    /// they cannot be read.
    ///
    /// Returns `true` if stored settings were applied.
    pub fn load_settings<P: SettingsPersistence>(&mut self, storage: &mut P) -> bool {
        match self.settings.load(storage) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("Stored settings ignored: {}", e);
                false
            }
        }
    }

    /// Handle one sensor reading.
    pub fn process_reading(&mut self, value: f32, now: Timestamp) -> TickOutputs {
        let settings = self.settings.get();
        let mut out = TickOutputs {
            reply: Some(Response::BreathData(value)),
            ..TickOutputs::default()
        };

        self.measurement.record(value, now);

        out.ring = match self.pep.update(value, now, settings) {
            PepOutcome::Handled(frame) => {
                self.feedback.invalidate();
                frame
            }
            PepOutcome::NotHandled => self.feedback.update(value, settings),
        };

        self.outputs.dispatch(value, now, settings, &mut out);
        out
    }

    /// Handle one chunk from the command channel.
    pub fn process_command<P: SettingsPersistence>(
        &mut self,
        chunk: &str,
        now: Timestamp,
        storage: &mut P,
    ) -> TickOutputs {
        let reply = self.protocol.handle_chunk(
            chunk,
            now,
            ProtocolContext {
                settings: &mut self.settings,
                measurement: &mut self.measurement,
                storage,
            },
        );
        TickOutputs {
            reply,
            ..TickOutputs::default()
        }
    }

    /// Time-driven work: PEP blink steps and the sensor timeout color.
    pub fn poll(&mut self, now: Timestamp) -> TickOutputs {
        TickOutputs {
            ring: self.pep.poll(now, self.settings.get()),
            status: self.outputs.poll(now),
            ..TickOutputs::default()
        }
    }

    /// Show the fault color after a loop-level failure.
    pub fn fault(&mut self) -> TickOutputs {
        TickOutputs {
            status: self.outputs.fault(),
            ..TickOutputs::default()
        }
    }

    /// Re-send every output on the next reading, e.g. after an actuator
    /// failure or a USB reconnect.
    pub fn resync(&mut self) {
        self.outputs.resync();
        self.feedback.invalidate();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::output::status_color;
    use crate::pep::PepPhase;
    use crate::persistence::MemoryPersistence;
    use crate::types::{RingFrame, Rgb, XacReport};
    use breath_proto::encode_record;
    use std::vec::Vec;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn test_reading_is_echoed() {
        let mut engine = BreathEngine::default();
        let out = engine.process_reading(0.25, ms(0));
        assert_eq!(out.reply, Some(Response::BreathData(0.25)));
        assert_eq!(
            out.reply.unwrap().to_line(),
            "BREATH_DATA:0.25\n"
        );
    }

    #[test]
    fn test_first_reading_drives_every_output() {
        let mut engine = BreathEngine::default();
        let out = engine.process_reading(0.0, ms(0));
        assert_eq!(out.gamepad, Some(XacReport::NEUTRAL));
        assert!(out.triggers.is_some());
        assert!(out.ring.is_some());
        assert_eq!(out.status, Some(status_color::NEUTRAL));
        assert!(out.audio.is_empty());
    }

    #[test]
    fn test_command_changes_next_reading() {
        let mut engine = BreathEngine::default();
        let mut storage = MemoryPersistence::new();

        let out = engine.process_command(
            "SET:settings::{\"blow_direction\":\"up\",\"sensitivity\":1.0}\n",
            ms(0),
            &mut storage,
        );
        assert_eq!(out.reply, Some(Response::Ok));

        let out = engine.process_reading(1.0, ms(10));
        assert_eq!(out.gamepad, Some(XacReport { y: 255, ..XacReport::NEUTRAL }));
    }

    #[test]
    fn test_measurement_through_commands() {
        let mut engine = BreathEngine::default();
        let mut storage = MemoryPersistence::new();

        engine.process_reading(0.9, ms(0));
        engine.process_command("SET:measure:true", ms(10), &mut storage);
        engine.process_reading(0.6, ms(20));
        engine.process_reading(-0.3, ms(1_020));

        let report = engine.measurement().export();
        assert_eq!(report.max_exhale, Some(0.6));
        assert_eq!(report.min_inhale, Some(-0.3));
        assert_eq!(report.longest_exhale, 1.0);
    }

    #[test]
    fn test_pep_takes_over_the_ring() {
        let mut settings = SettingsStore::new();
        settings
            .merge_json(r#"{"pep_mode_enabled":true,"pep_target_value":0.5,"pep_hold_time":0.5}"#)
            .unwrap();
        let mut engine = BreathEngine::new(settings);

        let out = engine.process_reading(0.6, ms(0));
        assert_eq!(out.ring.map(|f| f.color), Some(Rgb::GREEN));
        assert_eq!(engine.pep().phase(), PepPhase::Holding { since: ms(0) });

        // Sustained inhale must not advance the rainbow while PEP owns the ring
        engine.process_reading(-0.6, ms(100));
        assert_eq!(engine.feedback().rainbow().index(), 0);
    }

    #[test]
    fn test_pep_blink_through_poll() {
        let mut settings = SettingsStore::new();
        settings
            .merge_json(
                r#"{"pep_mode_enabled":true,"pep_target_value":0.5,"pep_hold_time":0.5,
                    "pep_blink_times":2,"pep_blink_speed":0.1}"#,
            )
            .unwrap();
        let mut engine = BreathEngine::new(settings);

        engine.process_reading(0.7, ms(0));
        engine.process_reading(0.7, ms(500));

        let frames: Vec<RingFrame> = (500..1_000)
            .step_by(20)
            .filter_map(|t| engine.poll(ms(t)).ring)
            .collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(engine.pep().phase(), PepPhase::Waiting);
    }

    #[test]
    fn test_sensor_timeout_and_fault() {
        let mut engine = BreathEngine::default();
        engine.process_reading(0.0, ms(0));

        assert_eq!(engine.poll(ms(1_000)).status, None);
        assert_eq!(engine.poll(ms(2_500)).status, Some(status_color::SENSOR_TIMEOUT));
        assert_eq!(engine.fault().status, Some(status_color::FAULT));
    }

    #[test]
    fn test_load_settings() {
        let mut storage = MemoryPersistence::new();
        storage.store(encode_record(br#"{"deadzone":0.3}"#).unwrap());

        let mut engine = BreathEngine::default();
        assert!(engine.load_settings(&mut storage));
        assert_eq!(engine.settings().deadzone, 0.3);

        // Damaged record: defaults kept
        let mut damaged = encode_record(br#"{"deadzone":0.3}"#).unwrap();
        damaged[14] ^= 0xFF;
        storage.store(damaged);
        let mut engine = BreathEngine::default();
        assert!(!engine.load_settings(&mut storage));
        assert_eq!(engine.settings(), &Settings::default());
    }

    #[test]
    fn test_resync_during_inhale_keeps_rainbow() {
        let mut engine = BreathEngine::default();
        engine.process_reading(0.0, ms(0));
        engine.process_reading(-0.5, ms(20));
        assert_eq!(engine.feedback().rainbow().index(), 1);

        for i in 0..5 {
            engine.resync();
            let out = engine.process_reading(-0.5, ms(40 + i * 20));
            assert!(out.ring.is_some());
        }
        assert_eq!(engine.feedback().rainbow().index(), 1);
    }

    #[test]
    fn test_pep_toggle_within_one_inhale_keeps_rainbow() {
        let mut engine = BreathEngine::default();
        let mut storage = MemoryPersistence::new();
        engine.process_reading(0.0, ms(0));
        engine.process_reading(-0.5, ms(20));
        assert_eq!(engine.feedback().rainbow().index(), 1);

        engine.process_command("SET:settings::{\"pep_mode_enabled\":true}\n", ms(30), &mut storage);
        engine.process_reading(-0.5, ms(40));
        engine.process_command("SET:settings::{\"pep_mode_enabled\":false}\n", ms(50), &mut storage);
        let out = engine.process_reading(-0.5, ms(60));

        assert!(out.ring.is_some());
        assert_eq!(engine.feedback().rainbow().index(), 1);
    }

    #[test]
    fn test_resync_resends_outputs() {
        let mut engine = BreathEngine::default();
        engine.process_reading(0.0, ms(0));
        assert_eq!(engine.process_reading(0.0, ms(10)).gamepad, None);

        engine.resync();
        let out = engine.process_reading(0.0, ms(20));
        assert!(out.gamepad.is_some());
        assert!(out.ring.is_some());
    }
}
