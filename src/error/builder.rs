//! 错误构建器
//!
//! 提供链式 API 用于构建错误

use super::{ConsumerError, ErrorCode};

/// 错误构建器
pub struct ErrorBuilder {
    code: ErrorCode,
    reason: String,
    details: Vec<String>,
}

impl ErrorBuilder {
    /// 创建新的错误构建器
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            details: Vec::new(),
        }
    }

    /// 添加错误详情
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details.push(details.into());
        self
    }

    /// 添加键值形式的上下文（topic、partition 等）
    #[must_use]
    pub fn context(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.details.push(format!("{key}={value}"));
        self
    }

    /// 构建 ConsumerError
    pub fn build(self) -> ConsumerError {
        ConsumerError::Coded {
            code: self.code,
            reason: self.reason,
            details: (!self.details.is_empty()).then(|| self.details.join(", ")),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_joins_details_and_context() {
        let err = ErrorBuilder::new(ErrorCode::OffsetResolutionFailed, "watermark query failed")
            .context("topic", "orders")
            .context("partition", 3)
            .details("broker timeout")
            .build();

        assert_eq!(err.code(), ErrorCode::OffsetResolutionFailed);
        assert_eq!(err.reason(), "watermark query failed");
        assert_eq!(
            err.details(),
            Some("topic=orders, partition=3, broker timeout")
        );
    }

    #[test]
    fn builder_without_details_leaves_none() {
        let err = ErrorBuilder::new(ErrorCode::NoPartitions, "empty").build();
        assert_eq!(err.details(), None);
        assert!(!err.is_retryable());
    }
}
