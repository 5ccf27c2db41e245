//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::shutdown::ShutdownError;
use crate::lifecycle::signals::{TerminationSignal, DEFAULT_SIGNALS};

/// Address bound when no host is configured.
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DrainConfig {
    /// Listener configuration (host, port, limits).
    pub listener: ListenerConfig,

    /// Drain deadline and signal set.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind. Loopback when unset.
    pub host: Option<String>,

    /// TCP port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 3000,
            max_connections: 10_000,
        }
    }
}

impl ListenerConfig {
    /// Host the listener actually binds.
    pub fn bind_host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_BIND_HOST)
    }

    /// `host:port` as shown to users, `localhost` standing in for an unset host.
    pub fn display_address(&self) -> String {
        format!("{}:{}", self.host.as_deref().unwrap_or("localhost"), self.port)
    }

    /// Start-up line announcing where the server listens on `port`.
    pub fn listen_message(&self, port: u16) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        let message = format!("Server listening on http://{}:{}", host, port);
        match &self.host {
            Some(bound) => format!("{} (bound to host: {})", message, bound),
            None => message,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight connections may take to close, in milliseconds.
    pub timeout_ms: u64,

    /// Signals that start a drain (e.g. "SIGTERM", "SIGINT").
    pub signals: Vec<String>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            signals: DEFAULT_SIGNALS.iter().map(|s| s.name().to_string()).collect(),
        }
    }
}

impl ShutdownConfig {
    pub fn drain_deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse the configured signal names.
    pub fn termination_signals(&self) -> Result<Vec<TerminationSignal>, ShutdownError> {
        self.signals.iter().map(|s| s.parse()).collect()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
