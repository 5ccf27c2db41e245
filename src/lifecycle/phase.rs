//! Shutdown phase state machine.
//!
//! # States
//! ```text
//! Accepting → Draining → Terminated
//! ```
//!
//! # Design Decisions
//! - Phase only moves forward; every transition is a compare-and-swap
//! - Stored in a single atomic so the request gate reads it without locking

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle stage of the shutdown coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Listener is serving traffic normally.
    Accepting = 0,
    /// A termination signal arrived; no new work is admitted.
    Draining = 1,
    /// Drain finished (cleanly or by deadline) and the process is exiting.
    Terminated = 2,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Phase::Accepting,
            1 => Phase::Draining,
            _ => Phase::Terminated,
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Accepting => "accepting",
            Phase::Draining => "draining",
            Phase::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic holder for the current [`Phase`].
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Phase::Accepting as u8))
    }

    pub(crate) fn load(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move from `from` to `to`. Returns false if the phase was not `from`.
    pub(crate) fn advance(&self, from: Phase, to: Phase) -> bool {
        debug_assert!((to as u8) > (from as u8), "phase must move forward");
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
