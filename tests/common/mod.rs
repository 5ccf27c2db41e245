//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use graceful_drain::config::DrainConfig;
use graceful_drain::lifecycle::{DrainListener, ProcessExit};

/// Records exit codes instead of terminating the test process.
#[derive(Default)]
pub struct RecordingExit {
    codes: Mutex<Vec<i32>>,
}

impl RecordingExit {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl ProcessExit for RecordingExit {
    fn exit(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

/// A listener whose "all connections closed" moment is scripted.
pub struct ScriptedListener {
    stops: Arc<AtomicUsize>,
    drained: Option<BoxFuture<'static, ()>>,
}

impl ScriptedListener {
    /// No open connections: drained as soon as it stops accepting.
    pub fn idle() -> (Self, Arc<AtomicUsize>) {
        Self::with(Box::pin(async {}))
    }

    /// The last connection closes `delay` after stop-accept.
    pub fn closing_after(delay: Duration) -> (Self, Arc<AtomicUsize>) {
        Self::with(Box::pin(tokio::time::sleep(delay)))
    }

    /// Drained when the returned sender fires.
    pub fn manual() -> (Self, Arc<AtomicUsize>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let (listener, stops) = Self::with(Box::pin(async move {
            let _ = rx.await;
        }));
        (listener, stops, tx)
    }

    fn with(drained: BoxFuture<'static, ()>) -> (Self, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let listener = Self {
            stops: stops.clone(),
            drained: Some(drained),
        };
        (listener, stops)
    }
}

impl DrainListener for ScriptedListener {
    fn stop_accepting(&mut self) -> BoxFuture<'static, ()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.drained
            .take()
            .unwrap_or_else(|| Box::pin(std::future::pending()))
    }
}

/// Config bound to an ephemeral loopback port.
pub fn ephemeral_config(timeout_ms: u64) -> DrainConfig {
    let mut config = DrainConfig::default();
    config.listener.host = Some("127.0.0.1".into());
    config.listener.port = 0;
    config.shutdown.timeout_ms = timeout_ms;
    config
}

/// Counts callback invocations and remembers the last signal name.
#[derive(Clone, Default)]
pub struct CallbackRecorder {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<String>>>,
}

impl CallbackRecorder {
    pub fn callback(&self) -> Box<dyn FnOnce(&str) + Send + 'static> {
        let recorder = self.clone();
        Box::new(move |signal| {
            recorder.calls.fetch_add(1, Ordering::SeqCst);
            *recorder.last.lock().unwrap() = Some(signal.to_string());
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<String> {
        self.last.lock().unwrap().clone()
    }
}
