//! Retry a flaky operation with logging enabled.
//!
//! Run with: cargo run --example retry_backoff --features tracing

use std::cell::Cell;
use std::fmt;
use std::thread;
use std::time::Duration;

use reprise::prelude::*;

#[derive(Debug)]
enum FetchError {
    Timeout,
    NotFound,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::NotFound => write!(f, "resource not found"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let policy = BackoffPolicy::new(Duration::from_millis(50), 2.0, Duration::from_millis(400));

    // Transient errors, then a retryable status, then success.
    let calls = Cell::new(0);
    let result = Retry::new(|| {
        calls.set(calls.get() + 1);
        match calls.get() {
            1 | 2 => Err(FetchError::Timeout),
            3 => Ok(503),
            _ => Ok(200),
        }
    })
    .with_policy(policy.clone())
    .retry_if_result(|status| *status >= 500)
    .retry_if_error(|e| matches!(e, FetchError::Timeout))
    .on_retry(|event| println!("attempt {} in {:?} ({:?})", event.attempt, event.delay, event.cause))
    .run();
    println!("flaky endpoint: {:?}", result);

    // A permanent error stops immediately.
    let result = Retry::new(|| Err::<(), _>(FetchError::NotFound))
        .with_policy(policy.clone())
        .retry_if_error(|e| matches!(e, FetchError::Timeout))
        .run();
    println!("missing resource: {:?}", result.map_err(|e| e.message()));

    // Cancel a long backoff from another thread.
    let source = CancellationSource::new();
    let token = source.token();
    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            Retry::new(|| Err::<(), _>(FetchError::Timeout))
                .with_policy(BackoffPolicy::new(
                    Duration::from_secs(5),
                    2.0,
                    Duration::from_secs(5),
                ))
                .with_cancellation(token)
                .run()
        });
        thread::sleep(Duration::from_millis(100));
        source.cancel();
        worker.join()
    });
    match result {
        Ok(outcome) => println!("cancelled sequence: {:?}", outcome.map_err(|e| e.message())),
        Err(_) => println!("worker panicked"),
    }
}
