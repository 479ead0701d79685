//! Request pacing for embedding providers.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

/// Rate limiter shared by every request a provider issues.
///
/// A single-permit [`Semaphore`] serialises callers and each holder sleeps
/// for one interval before releasing, which caps throughput at
/// `requests_per_second`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter allowing at most `requests_per_second` requests.
    /// Zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = u64::from(requests_per_second.max(1));
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval: Duration::from_millis(1000 / rps),
        }
    }

    /// Interval between consecutive requests.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for a slot, then holds it for one interval.
    pub async fn acquire(&self) {
        // The semaphore is never closed, so acquisition only fails if that changes.
        if let Ok(_permit) = self.semaphore.acquire().await {
            sleep(self.interval).await;
        }
    }
}
