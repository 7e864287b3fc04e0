//! Kafka 消息源构建器

use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::StreamConsumer;
use tracing::info;

use crate::error::{ConsumerError, Result};
use crate::kafka::consumer_config::KafkaSourceConfig;
use crate::kafka::source::KafkaSource;
use crate::source::{MessageSource, SourceFactory};

/// 构建 Kafka 消费者
///
/// 关闭自动提交和 offset 存储：会话不持久化消费位置
pub fn build_kafka_consumer(
    config: &dyn KafkaSourceConfig,
) -> std::result::Result<StreamConsumer, rdkafka::error::KafkaError> {
    ClientConfig::new()
        .set("bootstrap.servers", config.kafka_bootstrap())
        .set("group.id", config.consumer_group())
        .set("enable.partition.eof", "false")
        .set("enable.auto.commit", "false")
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", config.session_timeout_ms().to_string())
        .set("security.protocol", config.security_protocol())
        .set(
            "max.partition.fetch.bytes",
            config.max_partition_fetch_bytes().to_string(),
        )
        .set("fetch.min.bytes", config.fetch_min_bytes().to_string())
        .set("fetch.wait.max.ms", config.fetch_max_wait_ms().to_string())
        .create()
}

/// 构建 Kafka 消息源
pub fn build_kafka_source(config: &dyn KafkaSourceConfig) -> Result<KafkaSource> {
    let consumer = build_kafka_consumer(config)
        .map_err(|e| ConsumerError::client_create_failed(e.to_string()))?;

    info!(
        bootstrap = %config.kafka_bootstrap(),
        group = %config.consumer_group(),
        "Kafka source created successfully"
    );

    Ok(KafkaSource::new(consumer, config.metadata_timeout()))
}

/// Kafka 消息源工厂
#[derive(Clone)]
pub struct KafkaSourceFactory {
    config: Arc<dyn KafkaSourceConfig>,
}

impl KafkaSourceFactory {
    pub fn new(config: impl KafkaSourceConfig + 'static) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl SourceFactory for KafkaSourceFactory {
    fn create(&self) -> Result<Box<dyn MessageSource>> {
        Ok(Box::new(build_kafka_source(self.config.as_ref())?))
    }
}
