//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 客户端相关错误（构建、关闭）
/// - 2000-2999: 起始位置解析相关错误（元数据、水位、分配、定位）
/// - 3000-3999: 拉取相关错误
/// - 4000-4999: 解码相关错误
/// - 5000-5999: 会话生命周期相关错误
/// - 6000-6999: 系统相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 客户端相关错误 (1000-1999)
    // ============================================================
    ClientCreateFailed = 1000,
    ClientCloseFailed = 1001,
    ClientUnavailable = 1002,

    // ============================================================
    // 起始位置相关错误 (2000-2999)
    // ============================================================
    MetadataUnavailable = 2000,
    NoPartitions = 2001,
    OffsetResolutionFailed = 2002,
    AssignmentFailed = 2003,
    SeekFailed = 2004,

    // ============================================================
    // 拉取相关错误 (3000-3999)
    // ============================================================
    FetchFailed = 3000,
    TransportError = 3002,

    // ============================================================
    // 解码相关错误 (4000-4999)
    // ============================================================
    InvalidUtf8 = 4001,
    InvalidJson = 4002,
    UnknownFormat = 4003,

    // ============================================================
    // 会话相关错误 (5000-5999)
    // ============================================================
    SessionAlreadyRunning = 5000,
    WorkerSpawnFailed = 5001,
    WorkerPanicked = 5002,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    InternalError = 6000,
    ConfigurationError = 6001,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    InvalidParameter = 9001,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::ClientCreateFailed),
            1001 => Some(ErrorCode::ClientCloseFailed),
            1002 => Some(ErrorCode::ClientUnavailable),
            2000 => Some(ErrorCode::MetadataUnavailable),
            2001 => Some(ErrorCode::NoPartitions),
            2002 => Some(ErrorCode::OffsetResolutionFailed),
            2003 => Some(ErrorCode::AssignmentFailed),
            2004 => Some(ErrorCode::SeekFailed),
            3000 => Some(ErrorCode::FetchFailed),
            3002 => Some(ErrorCode::TransportError),
            4001 => Some(ErrorCode::InvalidUtf8),
            4002 => Some(ErrorCode::InvalidJson),
            4003 => Some(ErrorCode::UnknownFormat),
            5000 => Some(ErrorCode::SessionAlreadyRunning),
            5001 => Some(ErrorCode::WorkerSpawnFailed),
            5002 => Some(ErrorCode::WorkerPanicked),
            6000 => Some(ErrorCode::InternalError),
            6001 => Some(ErrorCode::ConfigurationError),
            9001 => Some(ErrorCode::InvalidParameter),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ClientCreateFailed => "CLIENT_CREATE_FAILED",
            ErrorCode::ClientCloseFailed => "CLIENT_CLOSE_FAILED",
            ErrorCode::ClientUnavailable => "CLIENT_UNAVAILABLE",
            ErrorCode::MetadataUnavailable => "METADATA_UNAVAILABLE",
            ErrorCode::NoPartitions => "NO_PARTITIONS",
            ErrorCode::OffsetResolutionFailed => "OFFSET_RESOLUTION_FAILED",
            ErrorCode::AssignmentFailed => "ASSIGNMENT_FAILED",
            ErrorCode::SeekFailed => "SEEK_FAILED",
            ErrorCode::FetchFailed => "FETCH_FAILED",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::InvalidUtf8 => "INVALID_UTF8",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::UnknownFormat => "UNKNOWN_FORMAT",
            ErrorCode::SessionAlreadyRunning => "SESSION_ALREADY_RUNNING",
            ErrorCode::WorkerSpawnFailed => "WORKER_SPAWN_FAILED",
            ErrorCode::WorkerPanicked => "WORKER_PANICKED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Client,
            2000..=2999 => ErrorCategory::Position,
            3000..=3999 => ErrorCategory::Fetch,
            4000..=4999 => ErrorCategory::Decode,
            5000..=5999 => ErrorCategory::Session,
            6000..=6999 => ErrorCategory::System,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 拉取阶段的传输错误可以恢复，会话不会因此终止
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::FetchFailed
                | ErrorCode::TransportError
                | ErrorCode::ClientUnavailable
        )
    }

    /// 判断是否属于启动阶段的致命错误
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Client | ErrorCategory::Position
        ) && *self != ErrorCode::ClientCloseFailed
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Client,
    Position,
    Fetch,
    Decode,
    Session,
    System,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Client => write!(f, "CLIENT"),
            ErrorCategory::Position => write!(f, "POSITION"),
            ErrorCategory::Fetch => write!(f, "FETCH"),
            ErrorCategory::Decode => write!(f, "DECODE"),
            ErrorCategory::Session => write!(f, "SESSION"),
            ErrorCategory::System => write!(f, "SYSTEM"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_resolve_back_to_variants() {
        for code in [
            ErrorCode::ClientCreateFailed,
            ErrorCode::NoPartitions,
            ErrorCode::FetchFailed,
            ErrorCode::InvalidJson,
            ErrorCode::SessionAlreadyRunning,
            ErrorCode::InvalidParameter,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(ErrorCode::from_u32(4242), None);
    }

    #[test]
    fn categories_follow_code_ranges() {
        assert_eq!(ErrorCode::ClientCreateFailed.category(), ErrorCategory::Client);
        assert_eq!(ErrorCode::SeekFailed.category(), ErrorCategory::Position);
        assert_eq!(ErrorCode::TransportError.category(), ErrorCategory::Fetch);
        assert_eq!(ErrorCode::InvalidUtf8.category(), ErrorCategory::Decode);
        assert_eq!(ErrorCode::WorkerPanicked.category(), ErrorCategory::Session);
        assert_eq!(ErrorCode::InvalidParameter.category(), ErrorCategory::General);
    }

    #[test]
    fn only_fetch_side_errors_are_retryable() {
        assert!(ErrorCode::TransportError.is_retryable());
        assert!(ErrorCode::FetchFailed.is_retryable());
        assert!(!ErrorCode::NoPartitions.is_retryable());
        assert!(!ErrorCode::InvalidJson.is_retryable());
    }

    #[test]
    fn start_failures_cover_client_and_position_codes() {
        assert!(ErrorCode::ClientCreateFailed.is_start_failure());
        assert!(ErrorCode::OffsetResolutionFailed.is_start_failure());
        assert!(!ErrorCode::ClientCloseFailed.is_start_failure());
        assert!(!ErrorCode::FetchFailed.is_start_failure());
    }
}
