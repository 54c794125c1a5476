//! Retry schedules: `RetryPolicy` for every unit load and `Backoff` for
//! collaborators that rate limit.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};

/// Bounded attempts, each with its own timeout, separated by a linearly
/// increasing delay (`attempt * base_delay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Duration, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            base_delay,
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.max_attempts(), config.item_timeout(), config.retry_delay())
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> LoadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut last = LoadError::Loader("no attempt made".to_string());

        for attempt in 1..=self.max_attempts {
            last = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => LoadError::Loader(format!("{:#}", e)),
                Err(_) => LoadError::Timeout(self.attempt_timeout),
            };

            warn!(
                item = label,
                attempt = attempt,
                max_attempts = self.max_attempts,
                error = %last,
                "Load attempt failed"
            );

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay_after(attempt)).await;
            }
        }

        Err(LoadError::RetriesExhausted {
            attempts: self.max_attempts,
            last: last.to_string(),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

/// Doubling pauses (`initial`, `2 * initial`, ...) for a collaborator that
/// asks us to slow down. Unlike `RetryPolicy` it retries only the errors
/// the caller marks as transient and applies no per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_retries: u32,
}

impl Backoff {
    pub const fn new(initial: Duration, max_retries: u32) -> Self {
        Self {
            initial,
            max_retries,
        }
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial;
        (0..self.max_retries).map(move |retry| initial.saturating_mul(1 << retry.min(16)))
    }

    /// Run `op`, pausing and retrying while `transient` holds for its error.
    /// The last error is returned once the pauses are used up.
    pub async fn retry_while<T, E, F, Fut, P>(&self, label: &str, mut op: F, transient: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut delays = self.delays();
        loop {
            match op().await {
                Err(e) if transient(&e) => match delays.next() {
                    Some(delay) => {
                        warn!(
                            item = label,
                            backoff_ms = delay.as_millis() as u64,
                            error = %e,
                            "Backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                result => return result,
            }
        }
    }
}
