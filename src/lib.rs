//! Flare Topic Consumer
//!
//! Restartable single-topic consumption session: a synchronous start/stop/status
//! lifecycle for host applications, a cancellable background read loop, two
//! starting positions and pluggable payload decoding.

pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod position;
pub mod retry;
pub mod session;
pub mod sink;
pub mod source;
pub mod telemetry;

// Kafka 消息源（可选）
#[cfg(feature = "kafka")]
pub mod kafka;

// Re-exports
pub use config::{Config, ConsumeDefaults};
pub use decode::{DecodedRecord, DecodedValue, FormatSelector};
pub use error::{ConsumerError, DecodeError, ErrorCategory, ErrorCode, Result};
pub use metrics::MetricsSnapshot;
pub use position::{PartitionAssignment, PartitionOffset, StartingPosition};
pub use retry::RetryConfig;
pub use session::{ConsumerController, SessionConfig, SessionInfo};
pub use sink::RecordSink;
pub use source::{MessageSource, RawRecord, SourceFactory, Watermarks};

#[cfg(feature = "kafka")]
pub use kafka::{KafkaSettings, KafkaSourceConfig, KafkaSourceFactory};
