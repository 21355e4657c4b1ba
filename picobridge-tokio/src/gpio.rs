//! Simulated GPIO bank for running the bridge on a host
//!
//! Clones share the same pins, so one clone can be handed to the bridge while
//! another injects button presses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use picobridge_core::{Direction, Gpio, GpioError, Level, Pin};

/// Number of pins on the simulated bank
pub const SIM_PIN_COUNT: u8 = 8;

type EdgeCallback = Arc<dyn Fn(Pin) + Send + Sync>;

#[derive(Default)]
struct PinState {
    direction: Option<Direction>,
    level: Level,
    on_rising: Option<EdgeCallback>,
}

#[derive(Clone, Default)]
pub struct SimGpio {
    pins: Arc<Mutex<HashMap<u8, PinState>>>,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    fn pins(&self) -> MutexGuard<'_, HashMap<u8, PinState>> {
        self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drive an input pin high, firing its rising-edge callback if it was low
    pub fn press(&self, pin: Pin) -> Result<(), GpioError> {
        let callback = {
            let mut pins = self.pins();
            let state = pins.get_mut(&pin.0).ok_or(GpioError::InvalidPin { pin: pin.0 })?;
            if state.direction != Some(Direction::Input) {
                return Err(GpioError::InvalidPin { pin: pin.0 });
            }
            let rising = state.level == Level::Low;
            state.level = Level::High;
            if rising {
                state.on_rising.clone()
            } else {
                None
            }
        };
        // The lock is released before the callback runs
        if let Some(callback) = callback {
            callback(pin);
        }
        Ok(())
    }

    /// Drive an input pin low
    pub fn release(&self, pin: Pin) {
        if let Some(state) = self.pins().get_mut(&pin.0) {
            if state.direction == Some(Direction::Input) {
                state.level = Level::Low;
            }
        }
    }
}

impl Gpio for SimGpio {
    fn configure(&mut self, pin: Pin, direction: Direction) -> Result<(), GpioError> {
        if pin.0 >= SIM_PIN_COUNT {
            return Err(GpioError::InvalidPin { pin: pin.0 });
        }
        self.pins().entry(pin.0).or_default().direction = Some(direction);
        Ok(())
    }

    fn set(&mut self, pin: Pin, level: Level) {
        let mut pins = self.pins();
        match pins.get_mut(&pin.0) {
            Some(state) if state.direction == Some(Direction::Output) => {
                if state.level != level {
                    info!("{} -> {:?}", pin, level);
                }
                state.level = level;
            }
            _ => warn!("Write to unconfigured output {}", pin),
        }
    }

    fn get(&self, pin: Pin) -> Level {
        self.pins()
            .get(&pin.0)
            .map(|state| state.level)
            .unwrap_or_default()
    }

    fn on_rising_edge<F>(&mut self, pin: Pin, callback: F) -> Result<(), GpioError>
    where
        F: Fn(Pin) + Send + Sync + 'static,
    {
        let mut pins = self.pins();
        let state = pins
            .get_mut(&pin.0)
            .ok_or(GpioError::CallbackFailed { pin: pin.0 })?;
        if state.direction != Some(Direction::Input) {
            return Err(GpioError::CallbackFailed { pin: pin.0 });
        }
        state.on_rising = Some(Arc::new(callback));
        Ok(())
    }
}
