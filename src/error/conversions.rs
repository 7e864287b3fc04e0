//! 错误类型转换实现

use super::{ConsumerError, ErrorCode};
use std::io;

impl From<io::Error> for ConsumerError {
    fn from(err: io::Error) -> Self {
        ConsumerError::system(format!("IO 错误: {err}"))
    }
}

impl From<toml::de::Error> for ConsumerError {
    fn from(err: toml::de::Error) -> Self {
        ConsumerError::configuration(format!("TOML 解析错误: {err}"))
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for ConsumerError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        use rdkafka::error::KafkaError;

        // 根据 rdkafka 错误映射到消费会话错误代码
        let code = match &err {
            KafkaError::ClientCreation(_) | KafkaError::ClientConfig(..) => {
                ErrorCode::ClientCreateFailed
            }
            KafkaError::MetadataFetch(_) => ErrorCode::MetadataUnavailable,
            KafkaError::Seek(_) => ErrorCode::SeekFailed,
            KafkaError::MessageConsumption(_) | KafkaError::PartitionEOF(_) => {
                ErrorCode::FetchFailed
            }
            _ => ErrorCode::TransportError,
        };

        ConsumerError::coded(code, err.to_string())
    }
}
