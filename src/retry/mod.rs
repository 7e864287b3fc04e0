//! 重试策略模块
//!
//! 拉取失败不会终止会话，worker 按策略退避后继续拉取。
//! 连续失败超过 `max_attempts` 或错误不可重试时升级为 error 日志。

pub mod exponential;
pub mod fixed;

pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConsumerError;

/// 重试策略 trait
pub trait RetryPolicy: Send + Sync {
    /// 第 `attempt` 次连续失败后是否仍视为瞬时故障
    fn should_retry(&self, attempt: usize, error: &ConsumerError) -> bool;
    /// 第 `attempt` 次连续失败后的退避时间
    fn backoff_duration(&self, attempt: usize) -> Duration;
    fn max_attempts(&self) -> usize;
}

/// 重试策略配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RetryConfig {
    Fixed {
        max_attempts: usize,
        delay_ms: u64,
    },
    Exponential {
        max_attempts: usize,
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::Exponential {
            max_attempts: 10,
            base_delay_ms: 50,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    /// 构建策略实例
    pub fn build(&self) -> Box<dyn RetryPolicy> {
        match *self {
            RetryConfig::Fixed {
                max_attempts,
                delay_ms,
            } => Box::new(FixedRetryPolicy::new(
                max_attempts,
                Duration::from_millis(delay_ms),
            )),
            RetryConfig::Exponential {
                max_attempts,
                base_delay_ms,
                max_delay_ms,
            } => Box::new(ExponentialBackoffPolicy::new(
                max_attempts,
                Duration::from_millis(base_delay_ms),
                Duration::from_millis(max_delay_ms),
            )),
        }
    }
}
