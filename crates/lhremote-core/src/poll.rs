//! Waiting on external state: bounded polling and first-success races.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Interval and overall bound of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollTiming {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Run `check` until it yields `Some`, an error, or `timing.timeout` elapses.
///
/// The first check runs immediately and one final check runs at the deadline.
/// Returns `Ok(None)` on timeout.
pub async fn poll_until<T, E, F, Fut>(timing: PollTiming, mut check: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timing.timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(timing.interval.min(deadline - now)).await;
    }
}

/// [`poll_until`] for checks that cannot fail
pub async fn poll_for<T, F, Fut>(timing: PollTiming, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let result: Result<Option<T>, Infallible> =
        poll_until(timing, || {
            let pending = check();
            async move { Ok(pending.await) }
        })
        .await;
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Run every task concurrently and return the first `Some`.
///
/// Tasks are detached: once a winner is found the rest keep running to
/// completion and their results are dropped. Returns `None` when every task
/// yields `None`.
pub async fn first_success<T, I, Fut>(tasks: I) -> Option<T>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Option<T>> + Send + 'static,
    T: Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    for task in tasks {
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }
    drop(tx);

    while let Some(result) = rx.recv().await {
        if result.is_some() {
            return result;
        }
    }
    None
}
