//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and signal names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DrainConfig → Result<(), Vec<ValidationError>>
//! - Runs before any socket is bound

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DrainConfig;
use crate::lifecycle::signals::TerminationSignal;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("listener.max_connections must be greater than zero")]
    NoConnectionSlots,

    #[error("shutdown.signals must name at least one signal")]
    NoSignals,

    #[error("shutdown.signals contains unsupported signal {0:?}")]
    UnknownSignal(String),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    BadMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &DrainConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if matches!(config.listener.host.as_deref(), Some(host) if host.trim().is_empty()) {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::NoConnectionSlots);
    }

    if config.shutdown.signals.is_empty() {
        errors.push(ValidationError::NoSignals);
    }
    for name in &config.shutdown.signals {
        if name.parse::<TerminationSignal>().is_err() {
            errors.push(ValidationError::UnknownSignal(name.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&DrainConfig::default()), Ok(()));
    }

    #[test]
    fn zero_timeout_is_allowed() {
        let mut config = DrainConfig::default();
        config.shutdown.timeout_ms = 0;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = DrainConfig::default();
        config.listener.host = Some("  ".into());
        config.listener.max_connections = 0;
        config.shutdown.signals = vec!["SIGTERM".into(), "SIGUSR9".into()];
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost,
                ValidationError::NoConnectionSlots,
                ValidationError::UnknownSignal("SIGUSR9".into()),
                ValidationError::UnknownLogLevel("loud".into()),
                ValidationError::BadMetricsAddress("nowhere".into()),
            ]
        );
    }

    #[test]
    fn empty_signal_list_is_rejected() {
        let mut config = DrainConfig::default();
        config.shutdown.signals.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoSignals]));
    }

    #[test]
    fn metrics_address_ignored_when_disabled() {
        let mut config = DrainConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
