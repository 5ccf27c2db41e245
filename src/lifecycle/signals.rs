//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for the configured termination signals
//! - Forward every delivery to [`Coordinator::on_signal`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every configured signal is treated identically
//! - Repeated deliveries are swallowed by the coordinator, never escalated
//! - A panicking shutdown callback ends the drain with exit status 1

use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Coordinator, ShutdownError};

/// Signals that start a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
}

/// Signals registered when none are configured.
pub const DEFAULT_SIGNALS: [TerminationSignal; 2] =
    [TerminationSignal::Terminate, TerminationSignal::Interrupt];

impl TerminationSignal {
    /// Conventional name, as passed to the shutdown callback.
    pub fn name(&self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Quit => "SIGQUIT",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            TerminationSignal::Interrupt => SignalKind::interrupt(),
            TerminationSignal::Terminate => SignalKind::terminate(),
            TerminationSignal::Hangup => SignalKind::hangup(),
            TerminationSignal::Quit => SignalKind::quit(),
        }
    }
}

impl std::fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TerminationSignal {
    type Err = ShutdownError;

    /// Accepts `SIGTERM`, `TERM` or `term`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" => Ok(TerminationSignal::Interrupt),
            "TERM" => Ok(TerminationSignal::Terminate),
            "HUP" => Ok(TerminationSignal::Hangup),
            "QUIT" => Ok(TerminationSignal::Quit),
            _ => Err(ShutdownError::UnsupportedSignal(s.to_string())),
        }
    }
}

/// Handles to the tasks listening for signals.
///
/// Dropping this does not unregister anything; the handlers live for the
/// rest of the process.
#[derive(Debug)]
pub struct SignalHandlers {
    signals: Vec<TerminationSignal>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalHandlers {
    /// Signals being listened for.
    pub fn signals(&self) -> &[TerminationSignal] {
        &self.signals
    }

    /// Stop forwarding signals to the coordinator.
    pub fn abort(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

impl Coordinator {
    /// Subscribe this coordinator to host termination signals.
    ///
    /// Must run inside a Tokio runtime. Duplicate entries are registered once.
    pub fn register_signal_handlers(
        self: &Arc<Self>,
        signals: &[TerminationSignal],
    ) -> Result<SignalHandlers, ShutdownError> {
        if signals.is_empty() {
            return Err(ShutdownError::NoSignals);
        }

        let mut unique: Vec<TerminationSignal> = Vec::with_capacity(signals.len());
        for signal in signals {
            if !unique.contains(signal) {
                unique.push(*signal);
            }
        }

        let mut tasks = Vec::with_capacity(unique.len());
        for signal in &unique {
            match listen(Arc::clone(self), *signal) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    for task in tasks {
                        task.abort();
                    }
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            signals = ?unique.iter().map(TerminationSignal::name).collect::<Vec<_>>(),
            "Signal handlers registered"
        );
        Ok(SignalHandlers {
            signals: unique,
            tasks,
        })
    }
}

/// Forward one delivery, settling the drain if the callback panics.
///
/// The panic would otherwise die with the handler task, leaving the
/// coordinator in `Draining` with no deadline armed.
fn deliver(coordinator: &Arc<Coordinator>, signal: TerminationSignal) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| coordinator.on_signal(signal.name())));
    if let Err(payload) = result {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(signal = signal.name(), panic = %message, "Shutdown callback panicked");
        coordinator.handle_callback_failure();
    }
}

#[cfg(unix)]
fn listen(
    coordinator: Arc<Coordinator>,
    signal: TerminationSignal,
) -> Result<JoinHandle<()>, ShutdownError> {
    let mut stream = tokio::signal::unix::signal(signal.kind()).map_err(|source| {
        ShutdownError::SignalInstall {
            signal: signal.name(),
            source,
        }
    })?;

    Ok(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            deliver(&coordinator, signal);
        }
    }))
}

#[cfg(not(unix))]
fn listen(
    coordinator: Arc<Coordinator>,
    signal: TerminationSignal,
) -> Result<JoinHandle<()>, ShutdownError> {
    if signal != TerminationSignal::Interrupt {
        return Err(ShutdownError::UnsupportedSignal(signal.name().to_string()));
    }

    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Ctrl+C handler failed");
                return;
            }
            deliver(&coordinator, signal);
        }
    }))
}
