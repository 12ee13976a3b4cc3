//! Load switch driver (DC-DC enable pin or relay coil driver).
//!
//! Dumb actuator: forced-hardware policy and state comparison live in the
//! module adapter.

use embedded_hal::digital::StatefulOutputPin;
use log::error;

use crate::ports::{LoadError, LoadPort};

pub struct LoadOutput<P> {
    pin: P,
}

impl<P: StatefulOutputPin> LoadOutput<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: StatefulOutputPin> LoadPort for LoadOutput<P> {
    fn set_output_state(&mut self, on: bool) -> Result<(), LoadError> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| {
            error!("load: pin write failed: {e:?}");
            LoadError::GpioWriteFailed
        })
    }

    fn output_state(&mut self) -> Result<bool, LoadError> {
        self.pin.is_set_high().map_err(|_| LoadError::StateUnknown)
    }
}
