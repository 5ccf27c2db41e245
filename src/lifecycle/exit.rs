//! Process termination.
//!
//! The coordinator never calls `std::process::exit` directly; it goes through
//! [`ProcessExit`] so tests and embedders can observe the exit status instead.

/// Terminates the host process with a status code.
pub trait ProcessExit: Send + Sync + 'static {
    /// Exit with `code`. Real implementations do not return.
    fn exit(&self, code: i32);
}

/// Exits the current OS process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExit;

impl ProcessExit for SystemExit {
    fn exit(&self, code: i32) {
        tracing::debug!(code, "Exiting process");
        std::process::exit(code);
    }
}
