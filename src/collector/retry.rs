//! Bounded retry with fixed backoff

use super::CancelToken;
use crate::config::CollectorConfig;
use crate::NavigationError;
use std::time::Duration;

/// How many times a navigation step is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff())
    }

    /// Returns true if `error` after `attempt` attempts (1-based) warrants another try
    pub fn should_retry(&self, error: &NavigationError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Waits out the backoff; returns `false` if the run was cancelled meanwhile
    pub async fn backoff(&self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        cancel.sleep(self.backoff).await
    }
}
