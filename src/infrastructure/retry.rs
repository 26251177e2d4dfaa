// Bounded retry with a fixed backoff between attempts
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Runs `attempt` until it succeeds or the attempt budget is spent. Every
    /// failure is retried; only the last one is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut current = 1;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if current >= max_attempts => {
                    tracing::error!(
                        operation,
                        attempts = current,
                        "Giving up after final attempt: {}",
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        operation,
                        "Attempt {}/{} failed: {}",
                        current,
                        max_attempts,
                        e
                    );
                    tokio::time::sleep(self.backoff).await;
                    current += 1;
                }
            }
        }
    }
}
