//! Statistics tracking for a diagnostics session.
//!
//! Counts the subsystem calls that went through the error policy and how many
//! of them reported a non-success status.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session call counters.
///
/// A non-zero soft error count means some output of the session was produced
/// from data the subsystem may never have filled in.
pub struct CallStats {
    calls_checked: AtomicU64,
    soft_errors: AtomicU64,
}

impl CallStats {
    /// Creates a new CallStats instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            calls_checked: AtomicU64::new(0),
            soft_errors: AtomicU64::new(0),
        }
    }

    /// Increments the checked call counter by one.
    pub fn add_call(&self) {
        self.calls_checked.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the soft error counter by one.
    pub fn add_soft_error(&self) {
        self.soft_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of calls checked so far.
    pub fn get_calls(&self) -> u64 {
        self.calls_checked.load(Ordering::Relaxed)
    }

    /// Returns the number of non-success statuses logged so far.
    pub fn get_soft_errors(&self) -> u64 {
        self.soft_errors.load(Ordering::Relaxed)
    }

    /// True when every checked call succeeded.
    pub fn is_clean(&self) -> bool {
        self.get_soft_errors() == 0
    }
}

impl Default for CallStats {
    fn default() -> Self {
        Self::new()
    }
}
