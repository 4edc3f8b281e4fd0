//! Blow/inhale trigger outputs.

use breath_core::{OutputError, TriggerLevels, TriggerPins};
use embedded_hal::digital::{OutputPin, PinState};

/// Two push-pull outputs driven from the breath thresholds.
pub struct GpioTriggers<P> {
    blow: P,
    inhale: P,
}

impl<P: OutputPin> GpioTriggers<P> {
    #[must_use]
    pub fn new(blow: P, inhale: P) -> Self {
        Self { blow, inhale }
    }
}

impl<P: OutputPin> TriggerPins for GpioTriggers<P> {
    fn set(&mut self, levels: TriggerLevels) -> Result<(), OutputError> {
        self.blow
            .set_state(PinState::from(levels.blow))
            .map_err(|_| OutputError::Io)?;
        self.inhale
            .set_state(PinState::from(levels.inhale))
            .map_err(|_| OutputError::Io)
    }
}
