//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → server.rs (axum setup, trace layer)
//!     → gate.rs (502 + Connection: close once draining)
//!     → application router
//!     → Send to client
//! ```

pub mod gate;
pub mod server;

pub use gate::{RequestGate, SHUTTING_DOWN_BODY};
pub use server::HttpServer;
