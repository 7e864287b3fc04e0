use super::RetryPolicy;
use crate::error::ConsumerError;
use std::time::Duration;

/// 固定延迟重试策略
pub struct FixedRetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl FixedRetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl RetryPolicy for FixedRetryPolicy {
    fn should_retry(&self, attempt: usize, error: &ConsumerError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    fn backoff_duration(&self, _attempt: usize) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}
