//! Drain handle for a running axum server.

use std::io;
use std::net::SocketAddr;

use axum::serve::Listener as _;
use axum::Router;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::DrainListener;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::TrackedListener;

/// A spawned `axum::serve` task that can be told to stop accepting.
pub struct ServerHandle {
    local_addr: SocketAddr,
    tracker: ConnectionTracker,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Start serving `router` on `listener`. Must run inside a Tokio runtime.
    pub fn spawn(listener: TrackedListener, router: Router) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let tracker = listener.tracker().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await;
            match &result {
                Ok(()) => tracing::info!("HTTP server stopped"),
                Err(e) => tracing::error!(error = %e, "HTTP server failed"),
            }
            result
        });

        Ok(Self {
            local_addr,
            tracker,
            stop_tx: Some(stop_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    /// Whether the serve task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl DrainListener for ServerHandle {
    fn stop_accepting(&mut self) -> BoxFuture<'static, ()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        tracing::info!(
            address = %self.local_addr,
            active_connections = self.tracker.active_count(),
            "Stopped accepting connections"
        );
        self.tracker.wait_until_idle().boxed()
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .field("active_connections", &self.tracker.active_count())
            .finish_non_exhaustive()
    }
}
