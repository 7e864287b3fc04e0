use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::decode::FormatSelector;
use crate::error::Result;
use crate::position::StartingPosition;
use crate::session::SessionConfig;

/// 配置文件根结构
///
/// ```toml
/// [session]
/// poll_timeout_ms = 200
/// max_batch_size = 1000
///
/// [session.retry]
/// kind = "fixed"
/// max_attempts = 5
/// delay_ms = 250
///
/// [defaults]
/// position = "now"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: ConsumeDefaults,
    #[cfg(feature = "kafka")]
    pub kafka: Option<crate::kafka::KafkaSettings>,
}

/// 宿主应用未指定时使用的起始位置和格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConsumeDefaults {
    #[serde(default = "default_position")]
    pub position: StartingPosition,
    #[serde(default = "default_format")]
    pub format: FormatSelector,
}

impl Default for ConsumeDefaults {
    fn default() -> Self {
        Self {
            position: default_position(),
            format: default_format(),
        }
    }
}

fn default_position() -> StartingPosition {
    StartingPosition::Beginning
}

fn default_format() -> FormatSelector {
    FormatSelector::String
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.session.validate()?;
        Ok(config)
    }

    /// 宿主应用启动时加载配置：未给出路径时使用默认配置
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        Self::load_from_file(path).with_context(|| {
            format!("Failed to load consumer config from {}", path.display())
        })
    }
}
