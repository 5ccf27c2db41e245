//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the application router with the request gate
//! - Wire up middleware (tracing)
//! - Bind the tracked listener and spawn the serve task

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::ListenerConfig;
use crate::http::gate::{self, RequestGate};
use crate::net::{ListenerError, ServerHandle, TrackedListener};

/// Application router plus the drain plumbing around it.
pub struct HttpServer {
    router: Router,
    listener: ListenerConfig,
}

impl HttpServer {
    /// Wrap `app` so it rejects requests once `gate` closes.
    pub fn new(app: Router, gate: RequestGate, listener: ListenerConfig) -> Self {
        let router = Self::build_router(app, gate);
        Self { router, listener }
    }

    /// Gate sits inside the trace layer so rejections are traced too.
    fn build_router(app: Router, gate: RequestGate) -> Router {
        gate::gated(app, gate).layer(TraceLayer::new_for_http())
    }

    /// Bind and start serving. The returned handle is what the coordinator drains.
    pub async fn spawn(self) -> Result<ServerHandle, ListenerError> {
        let listener = TrackedListener::bind(&self.listener).await?;
        let address = self.listener.display_address();
        ServerHandle::spawn(listener, self.router)
            .map_err(|source| ListenerError::Bind { address, source })
    }
}
