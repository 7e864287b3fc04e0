//! 消费会话统一错误类型

use super::code::{ErrorCategory, ErrorCode};
use thiserror::Error;

/// 消费会话统一错误类型
#[derive(Error, Debug, Clone)]
pub enum ConsumerError {
    /// 带错误代码的错误（启动失败、拉取失败等）
    #[error("错误 [{code}] {reason}")]
    Coded {
        code: ErrorCode,
        reason: String,
        details: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// 系统错误（内部错误）
    #[error("系统错误: {0}")]
    System(String),
}

impl ConsumerError {
    /// 创建带错误代码的错误
    pub fn coded(code: ErrorCode, reason: impl Into<String>) -> Self {
        ConsumerError::Coded {
            code,
            reason: reason.into(),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建系统错误
    pub fn system(msg: impl Into<String>) -> Self {
        ConsumerError::System(msg.into())
    }

    // ============================================================
    // 便捷方法：客户端相关错误
    // ============================================================

    pub fn client_create_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::ClientCreateFailed, reason)
    }

    pub fn client_close_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::ClientCloseFailed, reason)
    }

    // ============================================================
    // 便捷方法：起始位置相关错误
    // ============================================================

    pub fn metadata_unavailable(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::MetadataUnavailable, reason)
    }

    /// 主题没有任何可发现的分区
    pub fn no_partitions(topic: &str) -> Self {
        Self::coded(
            ErrorCode::NoPartitions,
            format!("主题 {topic} 没有可用分区"),
        )
    }

    pub fn offset_resolution_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::OffsetResolutionFailed, reason)
    }

    pub fn assignment_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::AssignmentFailed, reason)
    }

    pub fn seek_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::SeekFailed, reason)
    }

    // ============================================================
    // 便捷方法：拉取与会话相关错误
    // ============================================================

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::TransportError, reason)
    }

    /// 会话已在运行
    pub fn already_running(topic: &str) -> Self {
        Self::coded(
            ErrorCode::SessionAlreadyRunning,
            format!("会话已在运行: topic={topic}"),
        )
    }

    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::InvalidParameter, reason)
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::ConfigurationError, reason)
    }

    // ============================================================
    // 信息获取方法
    // ============================================================

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            ConsumerError::Coded { code, .. } => *code,
            ConsumerError::System(_) => ErrorCode::InternalError,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// 获取错误原因
    pub fn reason(&self) -> &str {
        match self {
            ConsumerError::Coded { reason, .. } => reason,
            ConsumerError::System(msg) => msg,
        }
    }

    /// 获取错误详情
    pub fn details(&self) -> Option<&str> {
        match self {
            ConsumerError::Coded { details, .. } => details.as_deref(),
            ConsumerError::System(_) => None,
        }
    }

    /// 附加错误详情
    #[must_use]
    pub fn with_details(mut self, extra: impl Into<String>) -> Self {
        if let ConsumerError::Coded { details, .. } = &mut self {
            *details = Some(extra.into());
        }
        self
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ConsumerError>;
