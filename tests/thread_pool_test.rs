//! Thread-pool isolation under saturation.
//!
//! These tests validate the admission and timeout behavior of thread-pool
//! isolated commands:
//! - Concurrent submissions beyond the pool size are rejected immediately
//! - Timeouts abandon the worker without interrupting it
//! - Worker slots are returned on every outcome

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use cordon::{Command, CommandError, CommandSpec, Executor, FailureType, IsolationConfig};

const POOL_SIZE: usize = 10;

fn pool_spec(group: &str, pool_size: usize) -> CommandSpec {
    cordon::util::init_tracing();
    CommandSpec::builder(group)
        .isolation(IsolationConfig::thread_pool(pool_size).no_timeout())
        .build()
}

/// Pool of 10, 11 concurrent slow submissions: exactly one is rejected and
/// the other ten eventually succeed.
#[test]
fn should_reject_one_submission_when_pool_is_full() {
    let executor = Arc::new(Executor::new());
    let spec = pool_spec("FullThreadPool", POOL_SIZE);
    let barrier = Arc::new(Barrier::new(POOL_SIZE + 1));

    let mut handles = Vec::with_capacity(POOL_SIZE + 1);
    for i in 0..=POOL_SIZE {
        let executor = Arc::clone(&executor);
        let barrier = Arc::clone(&barrier);
        let spec = spec.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let command = Command::new(spec, move || {
                thread::sleep(Duration::from_secs(1));
                Ok(format!("Thread-{i}"))
            });
            executor.execute(command)
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("submitter thread"))
        .collect();

    let rejected: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
    assert_eq!(rejected.len(), 1);
    assert!(matches!(
        rejected[0],
        Err(CommandError::RejectedThreadExecution)
    ));
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), POOL_SIZE);
}

/// A free queue slot admits one submission beyond the busy workers.
#[test]
fn queue_capacity_admits_waiting_submissions() {
    let executor = Arc::new(Executor::new());
    let spec = CommandSpec::builder("QueuedThreadPool")
        .isolation(
            IsolationConfig::thread_pool(1)
                .with_queue_capacity(1)
                .no_timeout(),
        )
        .build();
    let barrier = Arc::new(Barrier::new(4));

    let mut handles = Vec::with_capacity(3);
    for i in 0..3 {
        let executor = Arc::clone(&executor);
        let barrier = Arc::clone(&barrier);
        let spec = spec.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let command = Command::new(spec, move || {
                thread::sleep(Duration::from_millis(500));
                Ok(i)
            });
            executor.execute(command)
        }));
    }
    barrier.wait();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("submitter thread"))
        .collect();

    // One running, one queued, one rejected.
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
}

#[test]
fn should_time_out_and_abandon_worker() {
    let executor = Executor::new();
    let spec = CommandSpec::builder("TimeoutGroup")
        .isolation(IsolationConfig::thread_pool(1).with_timeout(Duration::from_millis(50)))
        .build();

    let err = executor
        .execute(Command::new(spec, || {
            thread::sleep(Duration::from_millis(300));
            Ok("slow")
        }))
        .unwrap_err();
    assert_eq!(err.failure_type(), Some(FailureType::Timeout));

    // The abandoned worker still holds its slot until natural completion.
    let strategy = executor
        .registry()
        .get("TimeoutGroup", "TimeoutGroup")
        .expect("registered");
    assert_eq!(strategy.in_flight(), 1);
    thread::sleep(Duration::from_millis(500));
    assert_eq!(strategy.in_flight(), 0);
}

#[test]
fn should_use_fallback_on_timeout() {
    let executor = Executor::new();
    let spec = CommandSpec::builder("TimeoutFallbackGroup")
        .isolation(IsolationConfig::thread_pool(1).with_timeout(Duration::from_millis(50)))
        .build();

    let command = Command::new(spec, || {
        thread::sleep(Duration::from_millis(300));
        Ok("slow".to_string())
    })
    .with_fallback(|| Ok("fallback".to_string()));

    assert_eq!(executor.execute(command).expect("fallback"), "fallback");
}

/// Slots are returned after success, failure, timeout and rejection alike.
#[test]
fn slots_are_never_leaked() {
    let executor = Arc::new(Executor::new());
    let spec = CommandSpec::builder("LeakCheckGroup")
        .isolation(IsolationConfig::thread_pool(2).with_timeout(Duration::from_millis(50)))
        .build();

    // Success.
    executor
        .execute(Command::new(spec.clone(), || Ok(1)))
        .expect("success");

    // Run failure.
    let _ = executor
        .execute(Command::new(spec.clone(), || Err::<i32, _>(anyhow!("expected"))))
        .unwrap_err();

    // Timeout (worker abandoned, completes at 200ms).
    let _ = executor
        .execute(Command::new(spec.clone(), || {
            thread::sleep(Duration::from_millis(200));
            Ok(2)
        }))
        .unwrap_err();
    // Let the abandoned worker run to completion and return its slot.
    thread::sleep(Duration::from_millis(250));

    // Rejection: saturate both workers, then submit a third.
    let barrier = Arc::new(Barrier::new(3));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let executor = Arc::clone(&executor);
        let barrier = Arc::clone(&barrier);
        let spec = spec.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let _ = executor.execute(Command::new(spec, || {
                thread::sleep(Duration::from_millis(300));
                Ok(3)
            }));
        }));
    }
    barrier.wait();
    thread::sleep(Duration::from_millis(100));
    let err = executor
        .execute(Command::new(spec.clone(), || Ok(4)))
        .unwrap_err();
    assert_eq!(
        err.failure_type(),
        Some(FailureType::RejectedThreadExecution)
    );
    for handle in handles {
        handle.join().expect("submitter thread");
    }

    let strategy = executor
        .registry()
        .get("LeakCheckGroup", "LeakCheckGroup")
        .expect("registered");
    thread::sleep(Duration::from_millis(400));
    assert_eq!(strategy.in_flight(), 0);
}
