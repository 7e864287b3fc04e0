//! 会话配置模块

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConsumerError, Result};
use crate::retry::RetryConfig;

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 单次拉取的最长等待时间（默认 100 毫秒）
    pub poll_timeout_ms: u64,
    /// 单次拉取的最大记录数（默认 500）
    pub max_batch_size: usize,
    /// 拉取失败后的退避策略
    pub retry: RetryConfig,
    /// worker 线程名前缀
    pub thread_name_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
            max_batch_size: 500,
            retry: RetryConfig::default(),
            thread_name_prefix: "topic-consumer".to_string(),
        }
    }
}

impl SessionConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置拉取超时时间
    ///
    /// 按毫秒向上取整，不足 1 毫秒的非零时长记为 1 毫秒
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms =
            u64::try_from(timeout.as_micros().div_ceil(1000)).unwrap_or(u64::MAX);
        self
    }

    /// 设置单批最大记录数
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// 设置重试策略
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_ms == 0 {
            return Err(ConsumerError::configuration(
                "poll_timeout_ms must be greater than zero",
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConsumerError::configuration(
                "max_batch_size must be greater than zero",
            ));
        }
        Ok(())
    }
}
