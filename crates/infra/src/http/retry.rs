//! Retry budget, backoff state and the sleeping primitive behind it.

use std::time::Duration;

use async_trait::async_trait;
use sheetsync_domain::config::RetrySettings;
use sheetsync_domain::constants::{DEFAULT_INITIAL_BACKOFF_SECS, DEFAULT_MAX_RETRIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total physical attempts per logical request, including the first.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs_f64(DEFAULT_INITIAL_BACKOFF_SECS),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self { max_retries: settings.max_retries, initial_backoff: settings.initial_backoff() }
    }
}

impl RetryPolicy {
    pub const fn attempts(&self) -> u32 {
        if self.max_retries == 0 {
            1
        } else {
            self.max_retries
        }
    }
}

/// Per-request retry bookkeeping; lives for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub backoff: Duration,
}

impl RetryState {
    pub const fn new(initial_backoff: Duration) -> Self {
        Self { attempt: 0, backoff: initial_backoff }
    }

    pub fn double(&mut self) {
        self.backoff = self.backoff.saturating_mul(2);
    }
}

/// Suspends the current task. Swapped out in tests to observe delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
