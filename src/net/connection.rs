//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Count open connections
//! - Generate unique connection IDs for tracing
//! - Wake drain waiters when the last connection closes

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks open connections so a drain can wait for them.
///
/// The count lives in a watch channel; waiters are woken on every change.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    count: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let mut now = 0;
        self.count.send_modify(|n| {
            *n += 1;
            now = *n;
        });
        metrics::set_active_connections(now);

        let id = ConnectionId::new();
        tracing::trace!(connection_id = %id, active = now, "Connection opened");
        ConnectionGuard {
            count: Arc::clone(&self.count),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once no connections are open, immediately if none are.
    pub fn wait_until_idle(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.count.subscribe();
        async move {
            // The sender is held by every guard and by the tracker itself.
            let _ = rx.wait_for(|n| *n == 0).await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements the open count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    count: Arc<watch::Sender<usize>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut now = 0;
        self.count.send_modify(|n| {
            *n = n.saturating_sub(1);
            now = *n;
        });
        metrics::set_active_connections(now);
        tracing::trace!(connection_id = %self.id, active = now, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn idle_tracker_resolves_immediately() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(50), tracker.wait_until_idle())
            .await
            .expect("idle tracker should resolve at once");
    }

    #[tokio::test]
    async fn wait_until_idle_follows_last_guard() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track();
        let idle = tokio::spawn(tracker.wait_until_idle());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!idle.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_millis(200), idle)
            .await
            .expect("waiter should wake after last close")
            .unwrap();
    }
}
