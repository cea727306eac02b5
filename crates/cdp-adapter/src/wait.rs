//! Bounded polling shared by every wait-type operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Interval/timeout pair for [`poll_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub const fn secs(interval: u64, timeout: u64) -> Self {
        Self::new(Duration::from_secs(interval), Duration::from_secs(timeout))
    }
}

/// Result of one probe evaluation.
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    Pending,
    /// Not ready; wait this long instead of the regular interval.
    Backoff(Duration),
}

/// Evaluates `probe` immediately and then once per interval until it is ready or
/// the timeout elapses. Sleeps never overshoot the deadline, so a probe that
/// never becomes ready returns `None` at the timeout boundary.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        let pause = match probe().await {
            Probe::Ready(value) => return Some(value),
            Probe::Pending => policy.interval,
            Probe::Backoff(pause) => pause,
        };
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(pause.min(deadline - now)).await;
    }
}

/// Boolean form of [`poll_until`].
pub async fn poll_until_true<F, Fut>(policy: PollPolicy, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(policy, move || {
        let check = predicate();
        async move {
            if check.await {
                Probe::Ready(())
            } else {
                Probe::Pending
            }
        }
    })
    .await
    .is_some()
}
