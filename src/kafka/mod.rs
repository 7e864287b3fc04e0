//! Kafka 消息源模块
//!
//! 提供基于 rdkafka 的 `MessageSource` 实现、连接配置和工厂
//!
//! 此模块需要启用 `kafka` feature 才能使用

pub mod consumer_builder;
pub mod consumer_config;
pub mod source;

pub use consumer_builder::{KafkaSourceFactory, build_kafka_consumer, build_kafka_source};
pub use consumer_config::{KafkaSettings, KafkaSourceConfig};
pub use source::KafkaSource;
