use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between consecutive requests to one source.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / requests_per_second.max(1e-6)),
            last_request: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the interval since the previous call has elapsed. The
    /// first call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            sleep_until(last + self.min_interval).await;
        }
        self.last_request = Some(Instant::now());
    }
}
