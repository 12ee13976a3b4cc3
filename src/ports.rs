//! Port traits: the boundary between the register bus core and the board.
//!
//! ```text
//!   Board adapter ──▶ Port trait ──▶ Node / ModuleAdapter (domain)
//! ```
//!
//! Peripheral drivers (NVM, ADC front end, load switch, RGB LED, reset
//! controller) implement these traits.  The [`Node`](crate::node::Node)
//! consumes them through the aggregate [`Board`] trait, so the register
//! logic never touches hardware directly and runs unchanged on the host.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::led::LedColor;

// ───────────────────────────────────────────────────────────────
// NVM mirror
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile memory.
pub trait NvmPort {
    fn read_byte(&mut self, addr: u16) -> Result<u8, NvmError>;

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), NvmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NvmError {
    /// Offset is beyond the end of the NVM area.
    AddressOutOfRange = 1,
    ReadFailed = 2,
    WriteFailed = 3,
}

impl NvmError {
    pub(crate) fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::AddressOutOfRange),
            2 => Some(Self::ReadFailed),
            3 => Some(Self::WriteFailed),
            _ => None,
        }
    }
}

impl fmt::Display for NvmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange => write!(f, "address out of range"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Analog front end
// ───────────────────────────────────────────────────────────────

/// Converted analog quantities available on the module family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnalogChannel {
    /// MCU supply voltage (mV).
    VmcuMv = 0,
    /// MCU die temperature (°C).
    TmcuDegrees = 1,
    /// Module input voltage (mV).
    VinMv = 2,
    /// Module output voltage (mV).
    VoutMv = 3,
    /// Module output current (µA).
    IoutUa = 4,
    /// Relay common / battery voltage (mV).
    VcomMv = 5,
}

impl AnalogChannel {
    pub const ALL: [Self; 6] = [
        Self::VmcuMv,
        Self::TmcuDegrees,
        Self::VinMv,
        Self::VoutMv,
        Self::IoutUa,
        Self::VcomMv,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// Blocking single-shot conversions.
///
/// Callers must hold the power domain feeding the channel (see
/// [`PowerControl`](crate::power::PowerControl)) while converting.
pub trait AnalogPort {
    fn convert(&mut self, channel: AnalogChannel) -> Result<i32, AnalogError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogError {
    /// The ADC reported an error on this channel.
    ConversionFailed(AnalogChannel),
    /// End of conversion never came.
    Timeout,
}

const ANALOG_SUB_TIMEOUT: u16 = 0x01;
const ANALOG_SUB_CONVERSION: u16 = 0x10;

impl AnalogError {
    pub(crate) const fn sub_code(self) -> u16 {
        match self {
            Self::Timeout => ANALOG_SUB_TIMEOUT,
            Self::ConversionFailed(ch) => ANALOG_SUB_CONVERSION + ch as u16,
        }
    }

    pub(crate) fn from_sub_code(sub: u8) -> Option<Self> {
        let sub = sub as u16;
        if sub == ANALOG_SUB_TIMEOUT {
            return Some(Self::Timeout);
        }
        sub.checked_sub(ANALOG_SUB_CONVERSION)
            .and_then(|ch| AnalogChannel::from_u8(ch as u8))
            .map(Self::ConversionFailed)
    }
}

impl fmt::Display for AnalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConversionFailed(ch) => write!(f, "conversion failed on {ch:?}"),
            Self::Timeout => write!(f, "conversion timeout"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Load / relay output
// ───────────────────────────────────────────────────────────────

/// Software-switched power output (DC-DC enable, relay coil).
pub trait LoadPort {
    fn set_output_state(&mut self, on: bool) -> Result<(), LoadError>;

    /// Current output state read back from the pin.
    fn output_state(&mut self) -> Result<bool, LoadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadError {
    GpioWriteFailed = 1,
    /// Pin readback failed.
    StateUnknown = 2,
}

impl LoadError {
    pub(crate) fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::GpioWriteFailed),
            2 => Some(Self::StateUnknown),
            _ => None,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::StateUnknown => write!(f, "output state unknown"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Status LED
// ───────────────────────────────────────────────────────────────

/// RGB status LED, single-blink contract only.
pub trait IndicatorLed {
    /// Start one fade-in/fade-out blink.  Returns immediately.
    fn start_single_blink(&mut self, duration_ms: u32, color: LedColor) -> Result<(), LedError>;

    fn stop_blink(&mut self) -> Result<(), LedError>;

    /// `true` while a blink is in progress.
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedError {
    NullDuration = 1,
    TimerFailed = 2,
    PwmFailed = 3,
}

impl LedError {
    pub(crate) fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::NullDuration),
            2 => Some(Self::TimerFailed),
            3 => Some(Self::PwmFailed),
            _ => None,
        }
    }
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullDuration => write!(f, "null blink duration"),
            Self::TimerFailed => write!(f, "dimming timer failed"),
            Self::PwmFailed => write!(f, "PWM channel failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// System control
// ───────────────────────────────────────────────────────────────

pub trait SystemControl {
    /// Request an MCU reset.  On target this does not return.
    fn software_reset(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Aggregate board
// ───────────────────────────────────────────────────────────────

/// Everything the node needs from the board besides power rails.
pub trait Board: NvmPort + AnalogPort + IndicatorLed + SystemControl {}

impl<T> Board for T where T: NvmPort + AnalogPort + IndicatorLed + SystemControl {}

// ───────────────────────────────────────────────────────────────
// Configuration errors
// ───────────────────────────────────────────────────────────────

/// Errors from [`NodeConfig::validate`](crate::config::NodeConfig::validate)
/// and config loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored or supplied config could not be parsed.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
