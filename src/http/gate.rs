//! Request gate and shutdown rejection middleware.
//!
//! # Responsibilities
//! - Answer "should this request be served?" from the coordinator's phase
//! - Short-circuit requests once drain has begun
//!
//! # Design Decisions
//! - The gate is a lock-free atomic read, safe from any number of tasks
//! - Rejections carry `Connection: close` so keep-alive clients go away

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::lifecycle::phase::{Phase, PhaseCell};
use crate::observability::metrics;

/// Body sent with every rejection.
pub const SHUTTING_DOWN_BODY: &str = "Server is shutting down.";

/// Per-request predicate over the shutdown phase.
#[derive(Debug, Clone)]
pub struct RequestGate {
    phase: Arc<PhaseCell>,
}

impl RequestGate {
    pub(crate) fn new(phase: Arc<PhaseCell>) -> Self {
        Self { phase }
    }

    /// True iff the coordinator is still accepting work.
    pub fn should_serve(&self) -> bool {
        self.phase.load() == Phase::Accepting
    }
}

/// The fixed response for requests arriving during a drain.
pub fn shutting_down_response() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(header::CONNECTION, "close")],
        SHUTTING_DOWN_BODY,
    )
        .into_response()
}

/// Middleware function rejecting requests once drain has begun.
pub async fn reject_when_draining(
    State(gate): State<RequestGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if gate.should_serve() {
        return next.run(request).await;
    }

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "Rejecting request during shutdown"
    );
    metrics::record_rejected();
    shutting_down_response()
}

/// Wrap `router` so every route goes through the gate.
pub fn gated(router: Router, gate: RequestGate) -> Router {
    router.layer(middleware::from_fn_with_state(gate, reject_when_draining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn gate() -> (RequestGate, Arc<PhaseCell>) {
        let phase = Arc::new(PhaseCell::new());
        (RequestGate::new(phase.clone()), phase)
    }

    fn counting_router(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "hello"
                }
            }),
        )
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[test]
    fn gate_tracks_phase() {
        let (gate, phase) = gate();
        assert!(gate.should_serve());
        phase.advance(Phase::Accepting, Phase::Draining);
        assert!(!gate.should_serve());
        phase.advance(Phase::Draining, Phase::Terminated);
        assert!(!gate.should_serve());
    }

    #[tokio::test]
    async fn forwards_while_accepting() {
        let (gate, _phase) = gate();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated(counting_router(hits.clone()), gate);

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_while_draining() {
        let (gate, phase) = gate();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated(counting_router(hits.clone()), gate);
        phase.advance(Phase::Accepting, Phase::Draining);

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[header::CONNECTION], "close");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], SHUTTING_DOWN_BODY.as_bytes());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
