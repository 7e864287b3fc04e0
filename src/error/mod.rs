//! 错误处理模块
//!
//! 提供统一的错误代码分类、错误构建和单条记录的解码错误

pub mod builder;
pub mod code;
pub mod consumer_error;
pub mod conversions;

pub use builder::ErrorBuilder;
pub use code::{ErrorCategory, ErrorCode};
pub use consumer_error::{ConsumerError, Result};

use crate::decode::FormatSelector;

/// 单条记录解码失败
///
/// 只影响当前记录，批次中的其余记录照常投递
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("解码失败 [{format}] partition={partition} offset={offset}: {reason}")]
pub struct DecodeError {
    pub format: FormatSelector,
    pub partition: i32,
    pub offset: i64,
    pub code: ErrorCode,
    pub reason: String,
}

impl DecodeError {
    pub fn new(
        format: FormatSelector,
        partition: i32,
        offset: i64,
        code: ErrorCode,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            format,
            partition,
            offset,
            code,
            reason: reason.into(),
        }
    }
}

impl From<DecodeError> for ConsumerError {
    fn from(err: DecodeError) -> Self {
        ErrorBuilder::new(err.code, err.reason)
            .context("format", err.format)
            .context("partition", err.partition)
            .context("offset", err.offset)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_converts_with_record_context() {
        let err = ConsumerError::from(DecodeError::new(
            FormatSelector::Json,
            2,
            41,
            ErrorCode::InvalidJson,
            "expected value",
        ));

        assert_eq!(err.code(), ErrorCode::InvalidJson);
        assert_eq!(err.category(), ErrorCategory::Decode);
        assert_eq!(err.reason(), "expected value");
        assert_eq!(err.details(), Some("format=json, partition=2, offset=41"));
    }
}
