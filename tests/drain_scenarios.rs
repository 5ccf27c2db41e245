//! Drain timing scenarios against the coordinator.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use graceful_drain::lifecycle::{Coordinator, DrainOutcome, Phase};

mod common;
use common::{CallbackRecorder, RecordingExit, ScriptedListener};

fn coordinator() -> (Arc<Coordinator>, Arc<RecordingExit>) {
    let exit = Arc::new(RecordingExit::default());
    (Arc::new(Coordinator::new(exit.clone())), exit)
}

#[tokio::test]
async fn test_idle_listener_exits_zero_within_deadline() {
    let (coordinator, exit) = coordinator();
    let (listener, stops) = ScriptedListener::idle();
    coordinator.configure(Duration::from_millis(50), None).unwrap();
    coordinator.attach(listener).unwrap();

    let started = Instant::now();
    assert!(coordinator.on_signal("SIGTERM"));
    let outcome = coordinator.terminated().await;

    assert_eq!(outcome, DrainOutcome::DrainedCleanly);
    assert!(started.elapsed() < Duration::from_millis(50), "took {:?}", started.elapsed());
    assert_eq!(exit.codes(), vec![0]);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // The deadline passing afterwards changes nothing.
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert_eq!(exit.codes(), vec![0]);
}

#[tokio::test]
async fn test_held_connection_times_out_and_late_close_is_ignored() {
    let (coordinator, exit) = coordinator();
    let (listener, _stops) = ScriptedListener::closing_after(Duration::from_millis(60));
    coordinator.configure(Duration::from_millis(50), None).unwrap();
    coordinator.attach(listener).unwrap();

    let started = Instant::now();
    coordinator.on_signal("SIGTERM");
    let outcome = coordinator.terminated().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, DrainOutcome::DrainTimedOut);
    assert!(elapsed >= Duration::from_millis(50), "fired early at {:?}", elapsed);
    assert_eq!(exit.codes(), vec![1]);

    // Simulated all-closed notification arriving at ~60 ms.
    tokio::time::sleep(Duration::from_millis(60).saturating_sub(started.elapsed())).await;
    assert_eq!(coordinator.handle_drain_complete(), None);
    assert_eq!(exit.codes(), vec![1]);
    assert_eq!(coordinator.phase(), Phase::Terminated);
}

#[tokio::test]
async fn test_second_signal_five_ms_later_is_a_no_op() {
    let (coordinator, exit) = coordinator();
    let (listener, stops, tx) = ScriptedListener::manual();
    let recorder = CallbackRecorder::default();
    coordinator
        .configure(Duration::from_millis(200), Some(recorder.callback()))
        .unwrap();
    coordinator.attach(listener).unwrap();

    assert!(coordinator.on_signal("SIGINT"));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(!coordinator.on_signal("SIGTERM"));

    assert_eq!(recorder.calls(), 1);
    assert_eq!(recorder.last().as_deref(), Some("SIGINT"));
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // One timer only: closing at ~100 ms wins against the single 200 ms deadline.
    tokio::time::sleep(Duration::from_millis(95)).await;
    tx.send(()).unwrap();
    assert_eq!(coordinator.terminated().await, DrainOutcome::DrainedCleanly);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(exit.codes(), vec![0]);
}

#[tokio::test]
async fn test_many_signals_produce_one_transition() {
    let (coordinator, exit) = coordinator();
    let (listener, stops, _tx) = ScriptedListener::manual();
    let recorder = CallbackRecorder::default();
    coordinator
        .configure(Duration::from_secs(10), Some(recorder.callback()))
        .unwrap();
    coordinator.attach(listener).unwrap();
    let gate = coordinator.gate();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator.on_signal(if i % 2 == 0 { "SIGTERM" } else { "SIGINT" })
            })
        })
        .collect();

    let mut started = 0;
    for task in tasks {
        if task.await.unwrap() {
            started += 1;
        }
    }

    assert_eq!(started, 1);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.calls(), 1);
    assert!(!gate.should_serve());
    assert!(exit.codes().is_empty());
}

#[tokio::test]
async fn test_zero_deadline_idle_listener_always_drains_cleanly() {
    for _ in 0..50 {
        let (coordinator, exit) = coordinator();
        let (listener, _stops) = ScriptedListener::idle();
        coordinator.configure(Duration::ZERO, None).unwrap();
        coordinator.attach(listener).unwrap();

        coordinator.on_signal("SIGTERM");
        assert_eq!(coordinator.terminated().await, DrainOutcome::DrainedCleanly);
        assert_eq!(exit.codes(), vec![0]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_terminal_handlers_settle_once() {
    for _ in 0..50 {
        let (coordinator, exit) = coordinator();
        let (listener, _stops, _tx) = ScriptedListener::manual();
        coordinator.configure(Duration::from_secs(10), None).unwrap();
        coordinator.attach(listener).unwrap();
        coordinator.on_signal("SIGTERM");

        let a = coordinator.clone();
        let b = coordinator.clone();
        let (clean, timed_out) = tokio::join!(
            tokio::spawn(async move { a.handle_drain_complete() }),
            tokio::spawn(async move { b.handle_drain_timeout() }),
        );

        let settled = [clean.unwrap().is_some(), timed_out.unwrap().is_some()];
        assert_eq!(settled.iter().filter(|s| **s).count(), 1);
        assert_eq!(exit.codes().len(), 1);
    }
}
