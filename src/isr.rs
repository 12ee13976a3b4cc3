//! Interrupt-to-main-loop cells.
//!
//! Fields written by an interrupt handler and read by the main loop (or the
//! reverse) live in these cells.  Each cell has exactly one writer context
//! and one reader context, so plain atomics are enough; no locks.
//!
//! ```text
//! ┌─────────────┐   set / increment   ┌──────────┐   take / get   ┌───────────┐
//! │ Tick ISR    │────────────────────▶│  cell    │───────────────▶│ Main loop │
//! │ Dimming ISR │                     │ (atomic) │                │           │
//! └─────────────┘                     └──────────┘                └───────────┘
//! ```
//!
//! Cells are owned by whoever owns the device and handed out by reference;
//! they are never mutated through ambient globals.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// One-bit event raised by an ISR and consumed by the main loop.
#[derive(Debug, Default)]
pub struct IsrFlag(AtomicBool);

impl IsrFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag.  Lock-free, safe from interrupt context.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Monotonic counter advanced by a periodic ISR (e.g. the 1 Hz RTC tick).
#[derive(Debug, Default)]
pub struct IsrCounter(AtomicU32);

impl IsrCounter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Advance by one.  Lock-free, safe from interrupt context.
    pub fn increment(&self) {
        // Single writer: load + store is enough and also works on cores
        // without atomic read-modify-write.
        let v = self.0.load(Ordering::Relaxed);
        self.0.store(v.wrapping_add(1), Ordering::Release);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}
