//! Periodic task bookkeeping for the cooperative main loop.
//!
//! Each task compares the monotonic uptime against its own "next due"
//! timestamp.  When it fires, the next due time becomes `now + period`,
//! measured from the moment it actually ran, so a late main loop never
//! produces a burst of catch-up executions.

use log::debug;

/// A self-correcting periodic task.
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    label: &'static str,
    period_secs: u32,
    next_due_secs: u32,
}

impl PeriodicTask {
    /// New task, due on the first poll.
    pub fn new(label: &'static str, period_secs: u32) -> Self {
        Self {
            label,
            period_secs,
            next_due_secs: 0,
        }
    }

    /// Returns `true` (and re-arms) if the task is due at `now_secs`.
    pub fn poll(&mut self, now_secs: u32) -> bool {
        if now_secs < self.next_due_secs {
            return false;
        }
        self.next_due_secs = now_secs.saturating_add(self.period_secs);
        debug!("{}: due at {}s, next at {}s", self.label, now_secs, self.next_due_secs);
        true
    }

    /// Make the task due on the next poll.
    pub fn reset(&mut self) {
        self.next_due_secs = 0;
    }

    pub fn period_secs(&self) -> u32 {
        self.period_secs
    }

    pub fn next_due_secs(&self) -> u32 {
        self.next_due_secs
    }
}
