//! Board composition.
//!
//! Combines the individual peripheral drivers into one value implementing
//! [`Board`](crate::ports::Board), which is what the node consumes.

use crate::drivers::led::LedColor;
use crate::ports::{
    AnalogChannel, AnalogError, AnalogPort, IndicatorLed, LedError, NvmError, NvmPort,
    SystemControl,
};

pub struct BoardAdapter<N, A, L, S> {
    nvm: N,
    analog: A,
    led: L,
    system: S,
}

impl<N, A, L, S> BoardAdapter<N, A, L, S> {
    pub fn new(nvm: N, analog: A, led: L, system: S) -> Self {
        Self {
            nvm,
            analog,
            led,
            system,
        }
    }

    pub fn nvm(&self) -> &N {
        &self.nvm
    }

    pub fn analog(&self) -> &A {
        &self.analog
    }

    pub fn analog_mut(&mut self) -> &mut A {
        &mut self.analog
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn led_mut(&mut self) -> &mut L {
        &mut self.led
    }

    pub fn system(&self) -> &S {
        &self.system
    }
}

// ── Port delegation ───────────────────────────────────────────

impl<N: NvmPort, A, L, S> NvmPort for BoardAdapter<N, A, L, S> {
    fn read_byte(&mut self, addr: u16) -> Result<u8, NvmError> {
        self.nvm.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), NvmError> {
        self.nvm.write_byte(addr, value)
    }
}

impl<N, A: AnalogPort, L, S> AnalogPort for BoardAdapter<N, A, L, S> {
    fn convert(&mut self, channel: AnalogChannel) -> Result<i32, AnalogError> {
        self.analog.convert(channel)
    }
}

impl<N, A, L: IndicatorLed, S> IndicatorLed for BoardAdapter<N, A, L, S> {
    fn start_single_blink(&mut self, duration_ms: u32, color: LedColor) -> Result<(), LedError> {
        self.led.start_single_blink(duration_ms, color)
    }

    fn stop_blink(&mut self) -> Result<(), LedError> {
        self.led.stop_blink()
    }

    fn is_active(&self) -> bool {
        self.led.is_active()
    }
}

impl<N, A, L, S: SystemControl> SystemControl for BoardAdapter<N, A, L, S> {
    fn software_reset(&mut self) {
        self.system.software_reset();
    }
}
