//! Metrics collection and exposition.
//!
//! # Metrics
//! - `drain_signals_total` (counter): termination signals that started a drain, by signal
//! - `drain_requests_rejected_total` (counter): requests turned away while draining
//! - `drain_outcomes_total` (counter): finished drains, by outcome
//! - `drain_active_connections` (gauge): currently open connections
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is free when no recorder is installed
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::shutdown::DrainOutcome;

/// Start the Prometheus scrape endpoint on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_signal(signal: &str) {
    ::metrics::counter!("drain_signals_total", "signal" => signal.to_string()).increment(1);
}

pub fn record_rejected() {
    ::metrics::counter!("drain_requests_rejected_total").increment(1);
}

pub fn record_outcome(outcome: DrainOutcome) {
    ::metrics::counter!("drain_outcomes_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn set_active_connections(count: usize) {
    ::metrics::gauge!("drain_active_connections").set(count as f64);
}
