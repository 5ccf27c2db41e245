//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Configure the shutdown coordinator
//! - Bind the listener and begin accepting traffic
//! - Announce readiness and register signal handlers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and happens before traffic
//! - The coordinator is configured before the listener accepts anything

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;

use crate::config::{validate_config, ConfigError, DrainConfig};
use crate::http::{HttpServer, RequestGate};
use crate::lifecycle::exit::{ProcessExit, SystemExit};
use crate::lifecycle::readiness::{self, ReadinessNotifier};
use crate::lifecycle::shutdown::{Coordinator, DrainOutcome, ShutdownCallback, ShutdownError};
use crate::lifecycle::signals::SignalHandlers;
use crate::net::ListenerError;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Builder for a gated, drainable HTTP server.
pub struct Startup {
    config: DrainConfig,
    on_shutdown: Option<ShutdownCallback>,
    exit: Arc<dyn ProcessExit>,
    readiness: Box<dyn ReadinessNotifier>,
    register_signals: bool,
}

impl Startup {
    /// Defaults: real process exit, readiness from the environment, signal handlers on.
    pub fn new(config: DrainConfig) -> Self {
        Self {
            config,
            on_shutdown: None,
            exit: Arc::new(SystemExit),
            readiness: readiness::from_env(),
            register_signals: true,
        }
    }

    /// Called once with the signal name when the drain starts.
    pub fn on_shutdown<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&str) + Send + 'static,
    {
        self.on_shutdown = Some(Box::new(callback));
        self
    }

    pub fn process_exit(mut self, exit: Arc<dyn ProcessExit>) -> Self {
        self.exit = exit;
        self
    }

    pub fn readiness<N: ReadinessNotifier + 'static>(mut self, notifier: N) -> Self {
        self.readiness = Box::new(notifier);
        self
    }

    /// Leave signal delivery to the caller (tests, embedders with their own handling).
    pub fn without_signal_handlers(mut self) -> Self {
        self.register_signals = false;
        self
    }

    /// Bind, serve `app` behind the request gate, and arm the coordinator.
    pub async fn start(self, app: Router) -> Result<RunningServer, StartupError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;
        let signals = self.config.shutdown.termination_signals()?;

        let coordinator = Arc::new(Coordinator::new(self.exit));
        coordinator.configure(self.config.shutdown.drain_deadline(), self.on_shutdown)?;

        let listener_config = self.config.listener.clone();
        let server = HttpServer::new(app, coordinator.gate(), listener_config.clone());
        let handle = server.spawn().await?;
        let local_addr = handle.local_addr();
        coordinator.attach(handle)?;

        let message = listener_config.listen_message(local_addr.port());
        println!("{}", message);
        tracing::info!(
            address = %local_addr,
            drain_deadline_ms = self.config.shutdown.timeout_ms,
            "Server ready"
        );
        self.readiness.notify_ready();

        let signal_handlers = if self.register_signals {
            Some(coordinator.register_signal_handlers(&signals)?)
        } else {
            None
        };

        Ok(RunningServer {
            coordinator,
            local_addr,
            signal_handlers,
        })
    }
}

/// Start `app` with `config`, exiting the process when the drain ends.
pub async fn start(
    app: Router,
    config: DrainConfig,
    on_shutdown: Option<ShutdownCallback>,
) -> Result<RunningServer, StartupError> {
    let mut startup = Startup::new(config);
    startup.on_shutdown = on_shutdown;
    startup.start(app).await
}

/// A server that is accepting traffic.
#[derive(Debug)]
pub struct RunningServer {
    coordinator: Arc<Coordinator>,
    local_addr: SocketAddr,
    signal_handlers: Option<SignalHandlers>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn gate(&self) -> RequestGate {
        self.coordinator.gate()
    }

    pub fn signal_handlers(&self) -> Option<&SignalHandlers> {
        self.signal_handlers.as_ref()
    }

    /// Wait for the drain to settle.
    pub async fn wait(&self) -> DrainOutcome {
        self.coordinator.terminated().await
    }
}
