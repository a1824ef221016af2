//! Runner state
//!
//! `Created -> Started -> Done` with an orthogonal `Closed` flag. All
//! three flags sit under one mutex so multi-flag reads are consistent.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub started: bool,
    pub closed: bool,
    pub done: bool,
}

/// Lifecycle flags of one runner
#[derive(Debug, Default)]
pub struct RunnerState {
    flags: Mutex<StateFlags>,
}

impl RunnerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads never fail: a poisoned lock still holds valid booleans.
    fn guard(&self) -> MutexGuard<'_, StateFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn flags(&self) -> StateFlags {
        *self.guard()
    }

    pub fn is_started(&self) -> bool {
        self.guard().started
    }

    pub fn is_closed(&self) -> bool {
        self.guard().closed
    }

    pub fn is_done(&self) -> bool {
        self.guard().done
    }

    pub fn mark_started(&self) {
        self.guard().started = true;
    }

    /// Set `Closed`. Returns false if the lock was poisoned; the flag
    /// is set either way.
    pub fn close(&self) -> bool {
        match self.flags.lock() {
            Ok(mut flags) => {
                flags.closed = true;
                true
            }
            Err(poisoned) => {
                poisoned.into_inner().closed = true;
                false
            }
        }
    }

    /// Set `Done`. Returns false if it was already set.
    pub fn mark_done(&self) -> bool {
        let mut flags = self.guard();
        let first = !flags.done;
        flags.done = true;
        first
    }
}
