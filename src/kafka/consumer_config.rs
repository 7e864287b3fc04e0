//! Kafka 消息源配置 Trait
//!
//! 定义构建 Kafka 消息源所需的连接参数，宿主应用可以提供自己的配置实现

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kafka 消息源配置 Trait
pub trait KafkaSourceConfig: Send + Sync {
    /// Kafka Bootstrap Servers 地址
    fn kafka_bootstrap(&self) -> &str;

    /// Consumer Group ID
    ///
    /// 会话使用静态分配，group 只用于满足客户端要求，不参与再均衡
    fn consumer_group(&self) -> &str;

    /// 最小 fetch 字节数，默认 1
    fn fetch_min_bytes(&self) -> usize {
        1
    }

    /// 最大 fetch 等待时间（毫秒），默认 100
    fn fetch_max_wait_ms(&self) -> u64 {
        100
    }

    /// 会话超时（毫秒），默认 30000
    fn session_timeout_ms(&self) -> u64 {
        30000
    }

    /// 安全协议，默认 "plaintext"
    fn security_protocol(&self) -> &str {
        "plaintext"
    }

    /// 最大分区 fetch 大小（字节），默认 10MB
    fn max_partition_fetch_bytes(&self) -> usize {
        10 * 1024 * 1024
    }

    /// 元数据与水位查询超时，默认 10 秒
    fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

/// 基于配置文件的 Kafka 连接参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaSettings {
    pub bootstrap_servers: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_security_protocol")]
    pub security_protocol: String,
    #[serde(default = "default_metadata_timeout_ms")]
    pub metadata_timeout_ms: u64,
}

fn default_group_id() -> String {
    "flare-topic-consumer".to_string()
}

fn default_security_protocol() -> String {
    "plaintext".to_string()
}

fn default_metadata_timeout_ms() -> u64 {
    10_000
}

impl KafkaSettings {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: default_group_id(),
            security_protocol: default_security_protocol(),
            metadata_timeout_ms: default_metadata_timeout_ms(),
        }
    }
}

impl KafkaSourceConfig for KafkaSettings {
    fn kafka_bootstrap(&self) -> &str {
        &self.bootstrap_servers
    }

    fn consumer_group(&self) -> &str {
        &self.group_id
    }

    fn security_protocol(&self) -> &str {
        &self.security_protocol
    }

    fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }
}
