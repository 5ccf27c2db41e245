//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Configure coordinator → Bind listener → Ready → Signals
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit 0
//!                                      └ deadline first   → Exit 1
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT (configurable) → Coordinator::on_signal
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then coordinator, then listener
//! - Ordered shutdown: flip phase, stop accept, callback, arm deadline
//! - Shutdown has timeout: forced exit after deadline
//! - Repeated signals are ignored, never escalated

pub mod exit;
pub mod phase;
pub mod readiness;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use exit::{ProcessExit, SystemExit};
pub use phase::Phase;
pub use readiness::{NoopNotifier, ReadinessNotifier, SystemdNotifier};
pub use shutdown::{
    Coordinator, DrainListener, DrainOutcome, ShutdownCallback, ShutdownError,
    DEFAULT_DRAIN_DEADLINE,
};
pub use signals::{SignalHandlers, TerminationSignal, DEFAULT_SIGNALS};
pub use startup::{start, RunningServer, Startup, StartupError};
