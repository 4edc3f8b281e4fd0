//! Output dispatch: gamepad report, trigger GPIOs, audio cues, status pixel.
//!
//! [`OutputDispatcher`] decides what the actuators should do for a reading
//! and records it in [`TickOutputs`]; [`Actuators`] then drives whatever
//! hardware is present. Every output is change-driven, so an idle device
//! does not flood the USB endpoint or the serial lines.

use core::fmt;
use core::future::Future;

use breath_proto::{AudioCommand, Response};
use heapless::Vec;

use crate::mapper;
use crate::settings::{ControlMode, Settings};
use crate::types::{
    BreathState, Rgb, RingFrame, Timestamp, TriggerLevels, XacButtons, XacReport,
};

/// Most audio commands a single reading can produce.
pub const AUDIO_QUEUE_LEN: usize = 4;

/// Tracks in folder 1 cycled by an inhale past the track threshold.
pub const AUDIO_TRACK_COUNT: u8 = 5;

/// DFPlayer folder holding the feedback tracks.
pub const AUDIO_FOLDER: u8 = 1;

/// Volume added per exhaling reading.
pub const VOLUME_STEP: u8 = 5;

/// Time without a sensor reading before the status pixel shows a timeout.
pub const SENSOR_TIMEOUT_MS: u64 = 2_000;

/// Status pixel colors.
pub mod status_color {
    use crate::types::Rgb;

    pub const EXHALING: Rgb = Rgb::GREEN;
    pub const INHALING: Rgb = Rgb::RED;
    pub const NEUTRAL: Rgb = Rgb::BLUE;
    /// Neutral while the audio player is enabled.
    pub const NEUTRAL_AUDIO: Rgb = Rgb::new(255, 128, 0);
    pub const BUTTON_ACTIVE: Rgb = Rgb::YELLOW;
    pub const SENSOR_TIMEOUT: Rgb = Rgb::new(64, 0, 64);
    pub const FAULT: Rgb = Rgb::new(255, 64, 0);
}

/// Actuator work produced by one engine step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutputs {
    /// Line for the command channel (reading echo or command reply).
    pub reply: Option<Response>,
    pub triggers: Option<TriggerLevels>,
    pub audio: Vec<AudioCommand, AUDIO_QUEUE_LEN>,
    pub gamepad: Option<XacReport>,
    pub ring: Option<RingFrame>,
    pub status: Option<Rgb>,
}

impl TickOutputs {
    /// Nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reply.is_none()
            && self.triggers.is_none()
            && self.audio.is_empty()
            && self.gamepad.is_none()
            && self.ring.is_none()
            && self.status.is_none()
    }
}

/// Runtime audio state. Never written back to the settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioState {
    pub enabled: bool,
    pub volume: u8,
    pub track: u8,
    below_track_threshold: bool,
}

impl AudioState {
    fn update(&mut self, value: f32, settings: &Settings, out: &mut Vec<AudioCommand, AUDIO_QUEUE_LEN>) {
        if !settings.dfplayer_enabled {
            self.enabled = false;
            return;
        }

        if !self.enabled {
            self.enabled = true;
            self.volume = settings.current_volume;
            self.track = settings.current_track.clamp(1, AUDIO_TRACK_COUNT);
            self.below_track_threshold = false;
            log::info!("Audio enabled, track {}", self.track);
            let _ = out.push(AudioCommand::SetVolume(settings.min_volume));
            let _ = out.push(AudioCommand::Play {
                folder: AUDIO_FOLDER,
                track: self.track,
            });
        }

        let volume = if value > 0.0 && value > settings.deadzone {
            self.volume.saturating_add(VOLUME_STEP).min(settings.max_volume)
        } else {
            settings.min_volume
        };
        if volume != self.volume {
            self.volume = volume;
            let _ = out.push(AudioCommand::SetVolume(volume));
        }

        let below = value < settings.track_change_threshold;
        if below && !self.below_track_threshold {
            self.track = self.track % AUDIO_TRACK_COUNT + 1;
            log::debug!("Next track {}", self.track);
            let _ = out.push(AudioCommand::Play {
                folder: AUDIO_FOLDER,
                track: self.track,
            });
        }
        self.below_track_threshold = below;
    }
}

/// Single status pixel; emits only on change.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusIndicator {
    shown: Option<Rgb>,
    last_reading: Timestamp,
}

impl StatusIndicator {
    /// Color for a reading.
    pub fn reading(&mut self, value: f32, now: Timestamp, settings: &Settings) -> Option<Rgb> {
        self.last_reading = now;

        let color = match settings.control_mode {
            ControlMode::Joystick => match BreathState::classify(value, settings.deadzone) {
                BreathState::Exhaling => status_color::EXHALING,
                BreathState::Inhaling => status_color::INHALING,
                BreathState::Neutral => status_color::NEUTRAL,
            },
            ControlMode::Buttons if libm::fabsf(value) > settings.deadzone => {
                status_color::BUTTON_ACTIVE
            }
            ControlMode::Buttons => status_color::NEUTRAL,
        };

        let color = if color == status_color::NEUTRAL && settings.dfplayer_enabled {
            status_color::NEUTRAL_AUDIO
        } else {
            color
        };

        self.show(color)
    }

    /// Timeout color once the sensor has been silent for too long.
    pub fn poll(&mut self, now: Timestamp) -> Option<Rgb> {
        if now.millis_since(self.last_reading) > SENSOR_TIMEOUT_MS {
            self.show(status_color::SENSOR_TIMEOUT)
        } else {
            None
        }
    }

    pub fn fault(&mut self) -> Option<Rgb> {
        self.show(status_color::FAULT)
    }

    /// Forget the shown color so the next one is always emitted.
    pub fn invalidate(&mut self) {
        self.shown = None;
    }

    fn show(&mut self, color: Rgb) -> Option<Rgb> {
        if self.shown == Some(color) {
            None
        } else {
            self.shown = Some(color);
            Some(color)
        }
    }
}

/// Maps readings to gamepad, trigger, audio and status outputs.
#[derive(Clone, Debug, Default)]
pub struct OutputDispatcher {
    last_report: Option<XacReport>,
    last_triggers: Option<TriggerLevels>,
    /// Buttons latched in buttons mode until the breath returns to the deadzone.
    held_buttons: XacButtons,
    audio: AudioState,
    status: StatusIndicator,
}

impl OutputDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn audio(&self) -> &AudioState {
        &self.audio
    }

    /// Handle one reading, filling `out` with what changed.
    pub fn dispatch(&mut self, value: f32, now: Timestamp, settings: &Settings, out: &mut TickOutputs) {
        let triggers = TriggerLevels {
            blow: value > settings.blow_gpio_threshold,
            inhale: value < settings.inhale_gpio_threshold,
        };
        if self.last_triggers != Some(triggers) {
            self.last_triggers = Some(triggers);
            out.triggers = Some(triggers);
        }

        self.audio.update(value, settings, &mut out.audio);

        let report = match settings.control_mode {
            ControlMode::Joystick => {
                self.held_buttons = XacButtons::NONE;
                joystick_report(value, settings)
            }
            ControlMode::Buttons => XacReport {
                buttons: self.button_state(value, settings),
                ..XacReport::NEUTRAL
            },
        };
        if self.last_report != Some(report) {
            self.last_report = Some(report);
            out.gamepad = Some(report);
        }

        out.status = self.status.reading(value, now, settings);
    }

    /// Time-driven status updates.
    pub fn poll(&mut self, now: Timestamp) -> Option<Rgb> {
        self.status.poll(now)
    }

    pub fn fault(&mut self) -> Option<Rgb> {
        self.status.fault()
    }

    /// Re-send every output on the next reading.
    pub fn resync(&mut self) {
        self.last_report = None;
        self.last_triggers = None;
        self.status.invalidate();
    }

    fn button_state(&mut self, value: f32, settings: &Settings) -> XacButtons {
        if let Some(button) = settings.blow_button.number().and_then(XacButtons::button) {
            if value > settings.blow_threshold {
                self.held_buttons |= button;
            }
        }
        if let Some(button) = settings.inhale_button.number().and_then(XacButtons::button) {
            if value < -settings.inhale_threshold {
                self.held_buttons |= button;
            }
        }
        if libm::fabsf(value) < settings.deadzone {
            self.held_buttons = XacButtons::NONE;
        }
        self.held_buttons
    }
}

fn joystick_report(value: f32, settings: &Settings) -> XacReport {
    let direction = match BreathState::classify(value, settings.deadzone) {
        BreathState::Exhaling => Some(settings.blow_direction),
        BreathState::Inhaling => Some(settings.inhale_direction),
        BreathState::Neutral => None,
    };

    let mut report = XacReport::NEUTRAL;
    if let Some(direction) = direction {
        let axis = mapper::map(value, settings);
        if direction.is_vertical() {
            report.y = axis;
        } else {
            report.x = axis;
        }
    }
    report
}

/// Error type for output operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// USB/UART/GPIO I/O error.
    Io,
    /// Device not ready (e.g., USB not enumerated).
    NotReady,
    /// Report dropped (e.g., host not polling fast enough).
    Dropped,
    /// Endpoint busy.
    Busy,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::NotReady => write!(f, "device not ready"),
            Self::Dropped => write!(f, "report dropped"),
            Self::Busy => write!(f, "endpoint busy"),
        }
    }
}

/// HID gamepad endpoint.
pub trait GamepadSink {
    /// Send a report; may wait until the previous one was taken by the host.
    fn send(&mut self, report: &XacReport) -> impl Future<Output = Result<(), OutputError>>;

    /// Check if the host is ready to accept reports.
    fn is_ready(&self) -> bool;
}

/// LED ring: fill every pixel, apply brightness, flush.
pub trait RingSink {
    fn show(&mut self, frame: &RingFrame) -> impl Future<Output = Result<(), OutputError>>;
}

/// Two trigger outputs driven as plain GPIOs.
pub trait TriggerPins {
    fn set(&mut self, levels: TriggerLevels) -> Result<(), OutputError>;
}

/// Serial audio player.
pub trait AudioSink {
    fn send(&mut self, command: AudioCommand) -> impl Future<Output = Result<(), OutputError>>;
}

/// Single RGB status pixel.
pub trait StatusSink {
    fn set(&mut self, color: Rgb) -> impl Future<Output = Result<(), OutputError>>;
}

/// The output hardware present on a board.
///
/// Each capability is optional; a missing one silently disables its
/// feature. An audio player that fails once is dropped.
pub struct Actuators<G, R, T, A, S> {
    pub gamepad: Option<G>,
    pub ring: Option<R>,
    pub triggers: Option<T>,
    pub audio: Option<A>,
    pub status: Option<S>,
}

impl<G, R, T, A, S> Actuators<G, R, T, A, S>
where
    G: GamepadSink,
    R: RingSink,
    T: TriggerPins,
    A: AudioSink,
    S: StatusSink,
{
    /// Perform the work in `outputs`.
    ///
    /// Every output is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure so the caller can resync outputs.
    pub async fn apply(&mut self, outputs: &TickOutputs) -> Result<(), OutputError> {
        let mut result = Ok(());

        if let (Some(levels), Some(pins)) = (outputs.triggers, self.triggers.as_mut()) {
            if let Err(e) = pins.set(levels) {
                log::warn!("Trigger output failed: {}", e);
                result = result.and(Err(e));
            }
        }

        let mut audio_failed = false;
        if let Some(player) = self.audio.as_mut() {
            for command in &outputs.audio {
                if let Err(e) = player.send(*command).await {
                    log::warn!("Audio player failed ({}), disabling audio", e);
                    audio_failed = true;
                    break;
                }
            }
        }
        if audio_failed {
            self.audio = None;
        }

        if let (Some(report), Some(gamepad)) = (outputs.gamepad, self.gamepad.as_mut()) {
            if gamepad.is_ready() {
                if let Err(e) = gamepad.send(&report).await {
                    log::warn!("Gamepad report failed: {}", e);
                    result = result.and(Err(e));
                }
            } else {
                result = result.and(Err(OutputError::NotReady));
            }
        }

        if let (Some(frame), Some(ring)) = (outputs.ring, self.ring.as_mut()) {
            if let Err(e) = ring.show(&frame).await {
                log::warn!("LED ring update failed: {}", e);
                result = result.and(Err(e));
            }
        }

        if let (Some(color), Some(status)) = (outputs.status, self.status.as_mut()) {
            if let Err(e) = status.set(color).await {
                log::warn!("Status pixel update failed: {}", e);
                result = result.and(Err(e));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::settings::{ButtonBinding, Direction};
    use crate::types::AXIS_CENTER;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use std::sync::{Arc, Mutex};
    use std::vec;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn dispatch(dispatcher: &mut OutputDispatcher, value: f32, now: u64, settings: &Settings) -> TickOutputs {
        let mut out = TickOutputs::default();
        dispatcher.dispatch(value, ms(now), settings, &mut out);
        out
    }

    #[test]
    fn test_first_report_always_sent_then_only_on_change() {
        let s = Settings::default();
        let mut d = OutputDispatcher::new();

        assert_eq!(dispatch(&mut d, 0.0, 0, &s).gamepad, Some(XacReport::NEUTRAL));
        assert_eq!(dispatch(&mut d, 0.01, 10, &s).gamepad, None);

        let out = dispatch(&mut d, 1.0, 20, &s);
        // Default blow direction is right: X below center
        assert_eq!(out.gamepad, Some(XacReport { x: 1, ..XacReport::NEUTRAL }));
        assert_eq!(dispatch(&mut d, 1.0, 30, &s).gamepad, None);
    }

    #[test]
    fn test_joystick_vertical_direction_drives_y() {
        let s = Settings {
            blow_direction: Direction::Up,
            ..Settings::default()
        };
        let mut d = OutputDispatcher::new();
        let out = dispatch(&mut d, 1.0, 0, &s);
        assert_eq!(out.gamepad, Some(XacReport { y: 255, ..XacReport::NEUTRAL }));
    }

    #[test]
    fn test_buttons_latch_until_deadzone() {
        let s = Settings {
            control_mode: ControlMode::Buttons,
            deadzone: 0.05,
            blow_button: ButtonBinding::Button(1),
            inhale_button: ButtonBinding::Button(2),
            ..Settings::default()
        };
        let mut d = OutputDispatcher::new();

        let out = dispatch(&mut d, 0.6, 0, &s);
        assert_eq!(out.gamepad.unwrap().buttons, XacButtons(0b01));
        assert_eq!(out.gamepad.unwrap().x, AXIS_CENTER);

        // Between deadzone and threshold: still held
        assert_eq!(dispatch(&mut d, 0.2, 10, &s).gamepad, None);

        // Inhale adds its button
        let out = dispatch(&mut d, -0.6, 20, &s);
        assert_eq!(out.gamepad.unwrap().buttons, XacButtons(0b11));

        // Deadzone releases everything
        let out = dispatch(&mut d, 0.0, 30, &s);
        assert_eq!(out.gamepad, Some(XacReport::NEUTRAL));
    }

    #[test]
    fn test_triggers_on_change() {
        let s = Settings::default();
        let mut d = OutputDispatcher::new();

        assert_eq!(dispatch(&mut d, 0.0, 0, &s).triggers, Some(TriggerLevels::default()));
        assert_eq!(
            dispatch(&mut d, 0.8, 10, &s).triggers,
            Some(TriggerLevels { blow: true, inhale: false })
        );
        assert_eq!(dispatch(&mut d, 0.9, 20, &s).triggers, None);
        assert_eq!(
            dispatch(&mut d, -0.8, 30, &s).triggers,
            Some(TriggerLevels { blow: false, inhale: true })
        );
    }

    #[test]
    fn test_audio_enable_edge_and_volume() {
        let s = Settings {
            dfplayer_enabled: true,
            min_volume: 5,
            max_volume: 20,
            current_volume: 10,
            current_track: 2,
            ..Settings::default()
        };
        let mut d = OutputDispatcher::new();

        let out = dispatch(&mut d, 0.0, 0, &s);
        assert_eq!(
            out.audio.as_slice(),
            &[
                AudioCommand::SetVolume(5),
                AudioCommand::Play { folder: 1, track: 2 },
                AudioCommand::SetVolume(5),
            ]
        );

        assert_eq!(dispatch(&mut d, 0.5, 10, &s).audio.as_slice(), &[AudioCommand::SetVolume(10)]);
        assert_eq!(dispatch(&mut d, 0.5, 20, &s).audio.as_slice(), &[AudioCommand::SetVolume(15)]);
        assert_eq!(dispatch(&mut d, 0.5, 30, &s).audio.as_slice(), &[AudioCommand::SetVolume(20)]);
        assert!(dispatch(&mut d, 0.5, 40, &s).audio.is_empty());
        assert_eq!(dispatch(&mut d, 0.0, 50, &s).audio.as_slice(), &[AudioCommand::SetVolume(5)]);
        assert_eq!(d.audio().volume, 5);
    }

    #[test]
    fn test_audio_track_advances_once_per_crossing() {
        let s = Settings {
            dfplayer_enabled: true,
            min_volume: 5,
            current_volume: 5,
            current_track: 5,
            ..Settings::default()
        };
        let mut d = OutputDispatcher::new();
        dispatch(&mut d, 0.0, 0, &s);

        let play = |out: &TickOutputs| {
            out.audio
                .iter()
                .filter(|c| matches!(c, AudioCommand::Play { .. }))
                .count()
        };

        let out = dispatch(&mut d, -0.7, 10, &s);
        assert_eq!(play(&out), 1);
        // Wraps 5 -> 1
        assert_eq!(d.audio().track, 1);

        assert_eq!(play(&dispatch(&mut d, -0.8, 20, &s)), 0);
        dispatch(&mut d, 0.0, 30, &s);
        assert_eq!(play(&dispatch(&mut d, -0.7, 40, &s)), 1);
        assert_eq!(d.audio().track, 2);
    }

    #[test]
    fn test_audio_disabled_produces_nothing() {
        let s = Settings::default();
        let mut d = OutputDispatcher::new();
        assert!(dispatch(&mut d, 0.9, 0, &s).audio.is_empty());
        assert!(!d.audio().enabled);
    }

    #[test]
    fn test_status_colors() {
        let mut s = Settings::default();
        let mut d = OutputDispatcher::new();

        assert_eq!(dispatch(&mut d, 0.5, 0, &s).status, Some(status_color::EXHALING));
        assert_eq!(dispatch(&mut d, 0.6, 10, &s).status, None);
        assert_eq!(dispatch(&mut d, -0.5, 20, &s).status, Some(status_color::INHALING));
        assert_eq!(dispatch(&mut d, 0.0, 30, &s).status, Some(status_color::NEUTRAL));

        s.control_mode = ControlMode::Buttons;
        assert_eq!(dispatch(&mut d, -0.5, 40, &s).status, Some(status_color::BUTTON_ACTIVE));

        s.dfplayer_enabled = true;
        assert_eq!(dispatch(&mut d, 0.0, 50, &s).status, Some(status_color::NEUTRAL_AUDIO));
    }

    #[test]
    fn test_status_timeout_and_fault() {
        let s = Settings::default();
        let mut d = OutputDispatcher::new();
        dispatch(&mut d, 0.0, 1_000, &s);

        assert_eq!(d.poll(ms(3_000)), None);
        assert_eq!(d.poll(ms(3_001)), Some(status_color::SENSOR_TIMEOUT));
        assert_eq!(d.poll(ms(3_500)), None);

        assert_eq!(d.fault(), Some(status_color::FAULT));
        assert_eq!(d.fault(), None);

        // A fresh reading restores the breath color
        assert_eq!(dispatch(&mut d, 0.0, 4_000, &s).status, Some(status_color::NEUTRAL));
    }

    #[test]
    fn test_resync_resends() {
        let s = Settings::default();
        let mut d = OutputDispatcher::new();
        dispatch(&mut d, 0.0, 0, &s);
        d.resync();
        let out = dispatch(&mut d, 0.0, 10, &s);
        assert!(out.gamepad.is_some());
        assert!(out.triggers.is_some());
        assert!(out.status.is_some());
    }

    // Mock actuators recording every call

    type Log<T> = Arc<Mutex<std::vec::Vec<T>>>;

    #[derive(Default)]
    struct MockGamepad {
        sent: Log<XacReport>,
        fail: bool,
    }

    impl GamepadSink for MockGamepad {
        fn send(&mut self, report: &XacReport) -> impl Future<Output = Result<(), OutputError>> {
            self.sent.lock().unwrap().push(*report);
            core::future::ready(if self.fail { Err(OutputError::Busy) } else { Ok(()) })
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct MockRing {
        frames: Log<RingFrame>,
    }

    impl RingSink for MockRing {
        fn show(&mut self, frame: &RingFrame) -> impl Future<Output = Result<(), OutputError>> {
            self.frames.lock().unwrap().push(*frame);
            core::future::ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct MockPins {
        levels: Log<TriggerLevels>,
    }

    impl TriggerPins for MockPins {
        fn set(&mut self, levels: TriggerLevels) -> Result<(), OutputError> {
            self.levels.lock().unwrap().push(levels);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAudio {
        commands: Log<AudioCommand>,
        fail: bool,
    }

    impl AudioSink for MockAudio {
        fn send(&mut self, command: AudioCommand) -> impl Future<Output = Result<(), OutputError>> {
            self.commands.lock().unwrap().push(command);
            core::future::ready(if self.fail { Err(OutputError::Io) } else { Ok(()) })
        }
    }

    #[derive(Default)]
    struct MockStatus {
        colors: Log<Rgb>,
    }

    impl StatusSink for MockStatus {
        fn set(&mut self, color: Rgb) -> impl Future<Output = Result<(), OutputError>> {
            self.colors.lock().unwrap().push(color);
            core::future::ready(Ok(()))
        }
    }

    type MockActuators = Actuators<MockGamepad, MockRing, MockPins, MockAudio, MockStatus>;

    fn full_actuators() -> MockActuators {
        Actuators {
            gamepad: Some(MockGamepad::default()),
            ring: Some(MockRing::default()),
            triggers: Some(MockPins::default()),
            audio: Some(MockAudio::default()),
            status: Some(MockStatus::default()),
        }
    }

    // Helper to run a future to completion (simple blocking executor)
    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: We don't move f after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {
                    panic!("Mock future returned Pending unexpectedly");
                }
            }
        }
    }

    fn sample_outputs() -> TickOutputs {
        let mut audio = Vec::new();
        audio.push(AudioCommand::SetVolume(5)).unwrap();
        audio.push(AudioCommand::Play { folder: 1, track: 1 }).unwrap();
        TickOutputs {
            reply: None,
            triggers: Some(TriggerLevels { blow: true, inhale: false }),
            audio,
            gamepad: Some(XacReport::NEUTRAL),
            ring: Some(RingFrame::new(Rgb::RED, 0.5)),
            status: Some(Rgb::GREEN),
        }
    }

    #[test]
    fn test_apply_drives_every_actuator() {
        let mut actuators = full_actuators();
        let sent = actuators.gamepad.as_ref().unwrap().sent.clone();
        let frames = actuators.ring.as_ref().unwrap().frames.clone();
        let levels = actuators.triggers.as_ref().unwrap().levels.clone();
        let commands = actuators.audio.as_ref().unwrap().commands.clone();
        let colors = actuators.status.as_ref().unwrap().colors.clone();

        assert_eq!(block_on(actuators.apply(&sample_outputs())), Ok(()));

        assert_eq!(*sent.lock().unwrap(), vec![XacReport::NEUTRAL]);
        assert_eq!(*frames.lock().unwrap(), vec![RingFrame::new(Rgb::RED, 0.5)]);
        assert_eq!(
            *levels.lock().unwrap(),
            vec![TriggerLevels { blow: true, inhale: false }]
        );
        assert_eq!(commands.lock().unwrap().len(), 2);
        assert_eq!(*colors.lock().unwrap(), vec![Rgb::GREEN]);
    }

    #[test]
    fn test_missing_capabilities_are_skipped() {
        let mut actuators: MockActuators = Actuators {
            gamepad: None,
            ring: None,
            triggers: None,
            audio: None,
            status: None,
        };
        assert_eq!(block_on(actuators.apply(&sample_outputs())), Ok(()));
    }

    #[test]
    fn test_failing_audio_is_disabled_after_first_call() {
        let mut actuators = full_actuators();
        actuators.audio = Some(MockAudio {
            fail: true,
            ..MockAudio::default()
        });
        let commands = actuators.audio.as_ref().unwrap().commands.clone();

        // Audio failure does not fail the tick
        assert_eq!(block_on(actuators.apply(&sample_outputs())), Ok(()));
        assert!(actuators.audio.is_none());
        assert_eq!(block_on(actuators.apply(&sample_outputs())), Ok(()));

        assert_eq!(commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_gamepad_failure_is_reported_after_other_outputs() {
        let mut actuators = full_actuators();
        actuators.gamepad = Some(MockGamepad {
            fail: true,
            ..MockGamepad::default()
        });
        let colors = actuators.status.as_ref().unwrap().colors.clone();

        assert_eq!(
            block_on(actuators.apply(&sample_outputs())),
            Err(OutputError::Busy)
        );
        assert_eq!(colors.lock().unwrap().len(), 1);
    }
}
