//! Unified error types for the node firmware core.
//!
//! A single `NodeError` enum that every layer converts into, so the
//! Dispatcher can hand one code back to the bus layer.  All variants are
//! `Copy` so they can be recorded in the [`ErrorStack`] and passed through
//! the fan-out combinator without allocation.
//!
//! ## Wire codes
//!
//! [`NodeError::code`] packs the kind into the high byte and the lower-layer
//! sub-kind into the low byte.  `0` is reserved for success.
//! [`NodeError::from_code`] is the exact inverse.

use core::fmt;

use heapless::Deque;
use log::error;

use crate::ports::{AnalogError, LedError, LoadError, NvmError};

// ---------------------------------------------------------------------------
// Top-level node error
// ---------------------------------------------------------------------------

/// Every fallible operation of the register bus funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// Register address is outside the node's address space.
    InvalidAddress,
    /// External write to a read-only register.
    AccessViolation,
    /// A required buffer argument was missing or empty.
    NullParameter,
    /// The requested actuation is wired in hardware, not software-switched.
    ForcedHardwareConflict,
    /// NVM mirror access failed.
    Nvm(NvmError),
    /// Analog front end conversion failed.
    Analog(AnalogError),
    /// Load / relay output driver failed.
    Load(LoadError),
    /// Status LED driver failed.
    Led(LedError),
}

const KIND_INVALID_ADDRESS: u16 = 0x01;
const KIND_ACCESS_VIOLATION: u16 = 0x02;
const KIND_NULL_PARAMETER: u16 = 0x03;
const KIND_FORCED_HARDWARE: u16 = 0x04;
const KIND_NVM: u16 = 0x10;
const KIND_ANALOG: u16 = 0x11;
const KIND_LOAD: u16 = 0x12;
const KIND_LED: u16 = 0x13;

impl NodeError {
    /// Wire code reported to the bus layer.  Never `0`.
    pub const fn code(self) -> u16 {
        let (kind, sub) = match self {
            Self::InvalidAddress => (KIND_INVALID_ADDRESS, 0),
            Self::AccessViolation => (KIND_ACCESS_VIOLATION, 0),
            Self::NullParameter => (KIND_NULL_PARAMETER, 0),
            Self::ForcedHardwareConflict => (KIND_FORCED_HARDWARE, 0),
            Self::Nvm(e) => (KIND_NVM, e as u16),
            Self::Analog(e) => (KIND_ANALOG, e.sub_code()),
            Self::Load(e) => (KIND_LOAD, e as u16),
            Self::Led(e) => (KIND_LED, e as u16),
        };
        (kind << 8) | sub
    }

    /// Decode a wire code produced by [`code`](Self::code).
    pub fn from_code(code: u16) -> Option<Self> {
        let kind = code >> 8;
        let sub = (code & 0xFF) as u8;
        match kind {
            KIND_INVALID_ADDRESS if sub == 0 => Some(Self::InvalidAddress),
            KIND_ACCESS_VIOLATION if sub == 0 => Some(Self::AccessViolation),
            KIND_NULL_PARAMETER if sub == 0 => Some(Self::NullParameter),
            KIND_FORCED_HARDWARE if sub == 0 => Some(Self::ForcedHardwareConflict),
            KIND_NVM => NvmError::from_u8(sub).map(Self::Nvm),
            KIND_ANALOG => AnalogError::from_sub_code(sub).map(Self::Analog),
            KIND_LOAD => LoadError::from_u8(sub).map(Self::Load),
            KIND_LED => LedError::from_u8(sub).map(Self::Led),
            _ => None,
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress => write!(f, "invalid register address"),
            Self::AccessViolation => write!(f, "register is read-only"),
            Self::NullParameter => write!(f, "missing buffer parameter"),
            Self::ForcedHardwareConflict => write!(f, "output is forced by hardware"),
            Self::Nvm(e) => write!(f, "nvm: {e}"),
            Self::Analog(e) => write!(f, "analog: {e}"),
            Self::Load(e) => write!(f, "load: {e}"),
            Self::Led(e) => write!(f, "led: {e}"),
        }
    }
}

impl From<NvmError> for NodeError {
    fn from(e: NvmError) -> Self {
        Self::Nvm(e)
    }
}

impl From<AnalogError> for NodeError {
    fn from(e: AnalogError) -> Self {
        Self::Analog(e)
    }
}

impl From<LoadError> for NodeError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<LedError> for NodeError {
    fn from(e: LedError) -> Self {
        Self::Led(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, NodeError>;

// ---------------------------------------------------------------------------
// Fan-out combinator
// ---------------------------------------------------------------------------

/// Aggregates the outcome of independent steps.
///
/// Every step runs; the first failure is kept and returned by
/// [`finish`](Self::finish).  Every failure is also pushed onto the
/// [`ErrorStack`] handed to [`record`](Self::record).
#[derive(Debug, Default)]
pub struct ErrorCollector {
    first: Option<NodeError>,
    failures: u8,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one step.  Returns the success value, if any.
    pub fn record<T>(&mut self, stack: &mut ErrorStack, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("fan-out step failed: {e}");
                stack.push(e);
                self.failures = self.failures.saturating_add(1);
                if self.first.is_none() {
                    self.first = Some(e);
                }
                None
            }
        }
    }

    /// Number of failed steps recorded so far.
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// First recorded failure, or `Ok(())` if every step succeeded.
    pub fn finish(self) -> Result<()> {
        match self.first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Error history
// ---------------------------------------------------------------------------

/// Maximum number of recorded failures kept for the bus master.
pub const ERROR_STACK_DEPTH: usize = 32;

/// Bounded FIFO of failures recorded in fan-out contexts.
///
/// When full, the oldest entry is dropped to make room.
#[derive(Debug, Default)]
pub struct ErrorStack {
    entries: Deque<NodeError, ERROR_STACK_DEPTH>,
}

impl ErrorStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, e: NodeError) {
        if self.entries.is_full() {
            let _ = self.entries.pop_front();
        }
        let _ = self.entries.push_back(e);
    }

    /// Oldest recorded failure.
    pub fn pop(&mut self) -> Option<NodeError> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
