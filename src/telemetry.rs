//! 日志初始化
//!
//! 库内部只使用 `tracing` 宏；宿主应用可以用这里的辅助函数安装订阅者。

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{ConsumerError, Result};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// 安装全局 tracing 订阅者
///
/// `RUST_LOG` 优先；未设置时使用 `default_directive`（例如 `"info"`）。
/// `default_directive` 总是先校验；重复调用返回错误而不是 panic。
pub fn init_tracing(default_directive: &str, format: LogFormat) -> Result<()> {
    let fallback = EnvFilter::try_new(default_directive)
        .map_err(|e| ConsumerError::configuration(format!("invalid log filter: {e}")))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(fallback);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_thread_names(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_thread_names(true))
            .try_init(),
    };

    installed.map_err(|e| ConsumerError::system(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn invalid_directive_is_a_configuration_error() {
        let err = init_tracing("!bad", LogFormat::Pretty).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn second_initialization_returns_error() {
        // 本测试二进制中只有这里安装全局订阅者
        init_tracing("info", LogFormat::Json).unwrap();
        let err = init_tracing("info", LogFormat::Pretty).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
