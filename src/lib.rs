//! Graceful drain for Tokio/Axum HTTP servers.
//!
//! A termination signal flips the [`Coordinator`] from accepting to draining:
//! the listener stops accepting, new requests get a `502` with
//! `Connection: close`, in-flight work finishes, and the process exits with
//! status 0. If the drain outlives its deadline the process exits with 1.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::DrainConfig;
pub use http::{HttpServer, RequestGate};
pub use lifecycle::{start, Coordinator, DrainOutcome, Phase, Startup};
