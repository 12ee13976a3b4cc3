//! Host simulation peripherals.
//!
//! In-memory stand-ins for the target peripherals, used by the
//! `regnode-sim` runner and by tests.  They record what was asked of them
//! instead of touching hardware.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::{info, warn};

use crate::drivers::led::DimmingTimer;
use crate::ports::{AnalogChannel, AnalogError, AnalogPort, LedError, SystemControl};

// ── GPIO ──────────────────────────────────────────────────────

/// Push-pull output that remembers its level.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high)
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Delay provider that advances a virtual clock instead of blocking.
#[derive(Debug, Default)]
pub struct SimClock {
    elapsed_ns: u64,
}

impl SimClock {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

// ── ADC front end ─────────────────────────────────────────────

/// Analog front end returning programmed values.
#[derive(Debug, Default)]
pub struct SimAnalog {
    values: [i32; AnalogChannel::ALL.len()],
    failing: Option<AnalogChannel>,
    conversions: u32,
}

impl SimAnalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, channel: AnalogChannel, value: i32) {
        self.values[channel.index()] = value;
    }

    /// Make conversions on `channel` fail (`None` heals).
    pub fn fail(&mut self, channel: Option<AnalogChannel>) {
        self.failing = channel;
    }

    pub fn conversions(&self) -> u32 {
        self.conversions
    }
}

impl AnalogPort for SimAnalog {
    fn convert(&mut self, channel: AnalogChannel) -> Result<i32, AnalogError> {
        self.conversions += 1;
        if self.failing == Some(channel) {
            warn!("sim adc: {:?} conversion failed", channel);
            return Err(AnalogError::ConversionFailed(channel));
        }
        Ok(self.values[channel.index()])
    }
}

// ── System ────────────────────────────────────────────────────

/// Records reset requests; the host process keeps running.
#[derive(Debug, Default)]
pub struct SimSystem {
    resets: u32,
}

impl SimSystem {
    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl SystemControl for SimSystem {
    fn software_reset(&mut self) {
        self.resets += 1;
        info!("sim: software reset #{}", self.resets);
    }
}

// ── LED timer and PWM ─────────────────────────────────────────

/// Dimming timer that only remembers whether it runs.
#[derive(Debug, Default)]
pub struct SimTimer {
    period_ms: Option<u32>,
}

impl SimTimer {
    pub fn period_ms(&self) -> Option<u32> {
        self.period_ms
    }
}

impl DimmingTimer for SimTimer {
    fn start(&mut self, period_ms: u32) -> Result<(), LedError> {
        self.period_ms = Some(period_ms);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LedError> {
        self.period_ms = None;
        Ok(())
    }
}

/// PWM channel with a 0..=100 duty range.
#[derive(Debug, Default)]
pub struct SimPwm {
    duty: u16,
}

impl SimPwm {
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        100
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty = duty;
        Ok(())
    }
}
