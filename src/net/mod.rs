//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (open-connection count, drain waiters)
//!     → Hand off to axum (handle.rs owns the serve task)
//!
//! On drain:
//!     handle.rs stops the accept loop
//!     → waits for connection.rs to report zero open connections
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so "all closed" is observable
//! - The serve task is owned by the shutdown coordinator once attached

pub mod connection;
pub mod handle;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use handle::ServerHandle;
pub use listener::{ListenerError, TrackedListener, TrackedStream};
