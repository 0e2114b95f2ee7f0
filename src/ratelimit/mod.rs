//! Process-wide spacing of outbound requests.


use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Grants at most one request per `min_interval`, across all callers.
///
/// The grant slot is a fair async mutex, so waiters are served roughly in
/// arrival order. The lock is held through the wait, which serialises grants.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until `min_interval` has passed since the previous grant, then
    /// records a new grant.
    pub async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;
        if let Some(last) = *last_grant {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                trace!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "rate limited");
                sleep_until(ready_at).await;
            }
        }
        *last_grant = Some(Instant::now());
    }
}
