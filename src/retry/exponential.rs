use super::RetryPolicy;
use crate::error::ConsumerError;
use std::time::Duration;

/// 指数退避重试策略
pub struct ExponentialBackoffPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoffPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn should_retry(&self, attempt: usize, error: &ConsumerError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        // 只对可重试的错误进行重试
        error.is_retryable()
    }

    fn backoff_duration(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10) as u32;
        let delay = self.base_delay.saturating_mul(1 << exponent);
        delay.min(self.max_delay)
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = ExponentialBackoffPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_millis(1_000),
        );
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(4), Duration::from_millis(800));
        assert_eq!(policy.backoff_duration(5), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_duration(60), Duration::from_millis(1_000));
    }

    #[test]
    fn stops_retrying_after_max_attempts_or_fatal_code() {
        let policy =
            ExponentialBackoffPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1));
        let transient = ConsumerError::transport("broker down");
        let fatal = ConsumerError::coded(ErrorCode::InternalError, "bug");

        assert!(policy.should_retry(1, &transient));
        assert!(!policy.should_retry(3, &transient));
        assert!(!policy.should_retry(1, &fatal));
    }
}
