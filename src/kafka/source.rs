//! 基于 rdkafka 的消息源

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::{Message, Offset, TopicPartitionList};
use tracing::debug;

use crate::error::{ConsumerError, ErrorCode, Result};
use crate::position::PartitionAssignment;
use crate::source::{MessageSource, RawRecord, Watermarks};

/// Kafka 消息源
pub struct KafkaSource {
    consumer: StreamConsumer,
    metadata_timeout: Duration,
    assignment: Option<TopicPartitionList>,
    closed: bool,
}

impl KafkaSource {
    pub fn new(consumer: StreamConsumer, metadata_timeout: Duration) -> Self {
        Self {
            consumer,
            metadata_timeout,
            assignment: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ConsumerError::coded(
                ErrorCode::ClientUnavailable,
                "kafka source already closed",
            ));
        }
        Ok(())
    }
}

fn to_raw(message: &BorrowedMessage<'_>) -> RawRecord {
    let record = RawRecord::new(
        message.partition(),
        message.offset(),
        message.key(),
        message.payload(),
    );
    match message.timestamp().to_millis() {
        Some(ts) => record.with_timestamp(ts),
        None => record,
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn partitions(&mut self, topic: &str) -> Result<Vec<i32>> {
        self.ensure_open()?;
        let metadata = self
            .consumer
            .fetch_metadata(Some(topic), self.metadata_timeout)
            .map_err(|e| ConsumerError::metadata_unavailable(e.to_string()))?;

        let Some(found) = metadata.topics().iter().find(|t| t.name() == topic) else {
            return Ok(Vec::new());
        };
        if let Some(err) = found.error() {
            // 主题不存在等错误按“没有可发现的分区”处理
            debug!(topic = %topic, error = ?err, "Topic metadata returned an error");
            return Ok(Vec::new());
        }
        Ok(found.partitions().iter().map(|p| p.id()).collect())
    }

    async fn watermarks(&mut self, topic: &str, partition: i32) -> Result<Watermarks> {
        self.ensure_open()?;
        let (low, high) = self
            .consumer
            .fetch_watermarks(topic, partition, self.metadata_timeout)
            .map_err(|e| ConsumerError::offset_resolution_failed(e.to_string()))?;
        Ok(Watermarks { low, high })
    }

    async fn assign(&mut self, assignment: &PartitionAssignment) -> Result<()> {
        self.ensure_open()?;
        let mut tpl = TopicPartitionList::new();
        for p in assignment.partitions() {
            tpl.add_partition_offset(assignment.topic(), p.partition, Offset::Offset(p.offset))
                .map_err(|e| ConsumerError::assignment_failed(e.to_string()))?;
        }
        self.consumer
            .assign(&tpl)
            .map_err(|e| ConsumerError::assignment_failed(e.to_string()))?;
        self.assignment = Some(tpl);
        Ok(())
    }

    async fn seek(&mut self, topic: &str, partition: i32, offset: i64) -> Result<()> {
        self.ensure_open()?;
        let tpl = self
            .assignment
            .as_mut()
            .ok_or_else(|| ConsumerError::seek_failed("no partitions assigned"))?;
        tpl.set_partition_offset(topic, partition, Offset::Offset(offset))
            .map_err(|e| ConsumerError::seek_failed(e.to_string()))?;
        // librdkafka 对尚未开始拉取的分区调用 seek 会报状态错误，改用带 offset 的重新分配
        self.consumer
            .assign(tpl)
            .map_err(|e| ConsumerError::seek_failed(e.to_string()))
    }

    async fn poll(&mut self, timeout: Duration, max_records: usize) -> Result<Vec<RawRecord>> {
        self.ensure_open()?;
        let first = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(message) => message?,
            Err(_) => return Ok(Vec::new()),
        };

        let mut batch = Vec::with_capacity(max_records.min(64));
        batch.push(to_raw(&first));
        drop(first);

        // 只取已经就绪的消息，不再等待
        while batch.len() < max_records {
            match tokio::time::timeout(Duration::ZERO, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.push(to_raw(&message)),
                Ok(Err(e)) => {
                    debug!(error = %e, "Stopping batch early after consume error");
                    break;
                }
                Err(_) => break,
            }
        }
        Ok(batch)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.assignment = None;
        self.consumer
            .unassign()
            .map_err(|e| ConsumerError::client_close_failed(e.to_string()))
    }
}
