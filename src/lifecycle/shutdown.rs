//! Shutdown coordination for the server.
//!
//! # Data Flow
//! ```text
//! on_signal ──▶ Accepting → Draining
//!                 ├─ listener.stop_accepting() ──▶ all-closed future ─┐
//!                 ├─ on_shutdown(signal)                             ├─ select (biased)
//!                 └─ deadline timer ─────────────────────────────────┘
//!                                     │                      │
//!                          handle_drain_complete   handle_drain_timeout
//!                                  exit(0)                exit(1)
//! ```
//!
//! # Design Decisions
//! - Phase transitions are compare-and-swap, so exactly one terminal handler wins
//! - The all-closed future is polled before the timer: an already drained
//!   listener beats a zero-length deadline
//! - Only the first signal has an effect; later ones are ignored, not escalated

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::http::gate::RequestGate;
use crate::lifecycle::exit::{ProcessExit, SystemExit};
use crate::lifecycle::phase::{Phase, PhaseCell};
use crate::observability::metrics;

/// Drain deadline used until [`Coordinator::configure`] says otherwise.
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_millis(1000);

/// Callback invoked once with the name of the signal that started the drain.
pub type ShutdownCallback = Box<dyn FnOnce(&str) + Send + 'static>;

/// A listener the coordinator can drain.
///
/// Owned exclusively by the coordinator after [`Coordinator::attach`].
pub trait DrainListener: Send + 'static {
    /// Stop admitting new connections.
    ///
    /// The returned future resolves once the last open connection has closed,
    /// immediately if none were open.
    fn stop_accepting(&mut self) -> BoxFuture<'static, ()>;
}

/// How the drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection closed before the deadline.
    DrainedCleanly,
    /// The deadline fired first.
    DrainTimedOut,
    /// The shutdown callback panicked during a signal-driven drain.
    CallbackFailed,
}

impl DrainOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            DrainOutcome::DrainedCleanly => 0,
            DrainOutcome::DrainTimedOut | DrainOutcome::CallbackFailed => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DrainOutcome::DrainedCleanly => "drained",
            DrainOutcome::DrainTimedOut => "timed_out",
            DrainOutcome::CallbackFailed => "callback_failed",
        }
    }
}

/// Errors raised while setting up the coordinator.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The deadline cannot be scheduled on the monotonic clock.
    #[error("Drain deadline {0:?} is out of range")]
    InvalidDeadline(Duration),

    /// `attach` was called a second time.
    #[error("A listener is already attached to this coordinator")]
    ListenerAlreadyAttached,

    /// `register_signal_handlers` was given an empty set.
    #[error("At least one termination signal must be registered")]
    NoSignals,

    /// Signal name not known to this platform.
    #[error("Unsupported signal: {0}")]
    UnsupportedSignal(String),

    /// The OS refused to install a handler.
    #[error("Failed to install {signal} handler: {source}")]
    SignalInstall {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },
}

struct Inner {
    drain_deadline: Duration,
    on_shutdown: Option<ShutdownCallback>,
    listener: Option<Box<dyn DrainListener>>,
    timer: Option<AbortHandle>,
}

/// Turns a termination signal into a bounded drain of one listener.
///
/// Construct once per process and share through an `Arc`.
pub struct Coordinator {
    phase: Arc<PhaseCell>,
    inner: Mutex<Inner>,
    exit: Arc<dyn ProcessExit>,
    outcome: watch::Sender<Option<DrainOutcome>>,
}

impl Coordinator {
    /// Create a coordinator that terminates through `exit`.
    pub fn new(exit: Arc<dyn ProcessExit>) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            phase: Arc::new(PhaseCell::new()),
            inner: Mutex::new(Inner {
                drain_deadline: DEFAULT_DRAIN_DEADLINE,
                on_shutdown: None,
                listener: None,
                timer: None,
            }),
            exit,
            outcome,
        }
    }

    /// Create a coordinator that exits the real OS process.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemExit))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the drain deadline and optional shutdown callback.
    ///
    /// Returns `Ok(false)` without changing anything once draining has begun.
    pub fn configure(
        &self,
        deadline: Duration,
        on_shutdown: Option<ShutdownCallback>,
    ) -> Result<bool, ShutdownError> {
        if Instant::now().checked_add(deadline).is_none() {
            return Err(ShutdownError::InvalidDeadline(deadline));
        }

        let mut inner = self.lock();
        if self.phase.load() != Phase::Accepting {
            tracing::debug!(phase = %self.phase.load(), "Ignoring configure after shutdown began");
            return Ok(false);
        }
        inner.drain_deadline = deadline;
        inner.on_shutdown = on_shutdown;

        tracing::debug!(drain_deadline_ms = deadline.as_millis() as u64, "Coordinator configured");
        Ok(true)
    }

    /// Bind the listener this coordinator drains. Only one is allowed.
    pub fn attach<L: DrainListener>(&self, listener: L) -> Result<(), ShutdownError> {
        let mut inner = self.lock();
        if inner.listener.is_some() {
            return Err(ShutdownError::ListenerAlreadyAttached);
        }
        inner.listener = Some(Box::new(listener));
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.load()
    }

    /// Configured drain deadline.
    pub fn drain_deadline(&self) -> Duration {
        self.lock().drain_deadline
    }

    /// A request gate reading this coordinator's phase.
    pub fn gate(&self) -> RequestGate {
        RequestGate::new(Arc::clone(&self.phase))
    }

    /// Entry point for a delivered termination signal.
    ///
    /// Returns `true` if this call started the drain, `false` if a drain was
    /// already under way. Must run inside a Tokio runtime. A panic in the
    /// shutdown callback propagates to the caller and the deadline timer is
    /// never armed; the caller settles the drain with
    /// [`handle_callback_failure`](Self::handle_callback_failure).
    pub fn on_signal(self: &Arc<Self>, signal: &str) -> bool {
        if !self.phase.advance(Phase::Accepting, Phase::Draining) {
            tracing::debug!(signal, phase = %self.phase.load(), "Ignoring repeated termination signal");
            return false;
        }

        tracing::info!(signal, "Received {}, shutting down", signal);
        metrics::record_signal(signal);

        let (drained, callback, deadline) = {
            let mut inner = self.lock();
            let drained = match inner.listener.as_mut() {
                Some(listener) => listener.stop_accepting(),
                None => {
                    tracing::warn!("No listener attached, nothing to drain");
                    let ready: BoxFuture<'static, ()> = Box::pin(futures_util::future::ready(()));
                    ready
                }
            };
            (drained, inner.on_shutdown.take(), inner.drain_deadline)
        };

        if let Some(callback) = callback {
            callback(signal);
        }

        let coordinator = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = drained => {
                    coordinator.handle_drain_complete();
                }
                _ = tokio::time::sleep(deadline) => {
                    coordinator.handle_drain_timeout();
                }
            }
        });

        let mut inner = self.lock();
        if self.phase.load() == Phase::Terminated {
            timer.abort();
        } else {
            inner.timer = Some(timer.abort_handle());
        }
        true
    }

    /// All connections closed. Exits with status 0 unless the drain already ended.
    pub fn handle_drain_complete(&self) -> Option<DrainOutcome> {
        self.finish(DrainOutcome::DrainedCleanly)
    }

    /// Deadline elapsed. Exits with status 1 unless the drain already ended.
    pub fn handle_drain_timeout(&self) -> Option<DrainOutcome> {
        self.finish(DrainOutcome::DrainTimedOut)
    }

    /// The shutdown callback panicked. Exits with status 1 unless the drain already ended.
    ///
    /// Signal handlers call this after catching the panic, since nothing
    /// else would observe it and the deadline timer was never armed.
    pub fn handle_callback_failure(&self) -> Option<DrainOutcome> {
        self.finish(DrainOutcome::CallbackFailed)
    }

    fn finish(&self, outcome: DrainOutcome) -> Option<DrainOutcome> {
        if !self.phase.advance(Phase::Draining, Phase::Terminated) {
            tracing::debug!(
                outcome = outcome.as_str(),
                phase = %self.phase.load(),
                "Drain already settled, ignoring"
            );
            return None;
        }

        if let Some(timer) = self.lock().timer.take() {
            timer.abort();
        }

        match outcome {
            DrainOutcome::DrainedCleanly => tracing::info!("Closed remaining connections"),
            DrainOutcome::DrainTimedOut => tracing::error!(
                drain_deadline_ms = self.drain_deadline().as_millis() as u64,
                "Couldn't close connections in time, forcefully shutting down"
            ),
            DrainOutcome::CallbackFailed => {
                tracing::error!("Shutdown callback failed, forcefully shutting down")
            }
        }
        metrics::record_outcome(outcome);

        self.outcome.send_replace(Some(outcome));
        self.exit.exit(outcome.exit_code());
        Some(outcome)
    }

    /// Wait until the drain settles.
    pub async fn terminated(&self) -> DrainOutcome {
        let mut rx = self.outcome.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            // The sender lives in `self`, so this only fails if it is dropped.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("phase", &self.phase.load())
            .finish_non_exhaustive()
    }
}
