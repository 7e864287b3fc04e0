//! 起始位置解析
//!
//! 在会话启动前把抽象的起始位置（Beginning / Now）解析成每个分区的具体 offset，
//! 然后对消息源执行静态分配和显式定位。分配结果在会话运行期间不再变化。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConsumerError, ErrorBuilder, Result};
use crate::source::MessageSource;

/// 起始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartingPosition {
    /// 从每个分区最早保留的 offset 开始
    Beginning,
    /// 从每个分区当前的末尾开始，只消费之后写入的消息
    Now,
}

impl fmt::Display for StartingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartingPosition::Beginning => write!(f, "beginning"),
            StartingPosition::Now => write!(f, "now"),
        }
    }
}

impl FromStr for StartingPosition {
    type Err = ConsumerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginning" | "earliest" => Ok(StartingPosition::Beginning),
            "now" | "latest" | "end" => Ok(StartingPosition::Now),
            other => Err(ConsumerError::invalid_parameter(format!(
                "unknown starting position: {other}"
            ))),
        }
    }
}

/// 单个分区的起始 offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOffset {
    pub partition: i32,
    pub offset: i64,
}

/// 分区分配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionAssignment {
    topic: String,
    partitions: Vec<PartitionOffset>,
}

impl PartitionAssignment {
    pub fn new(topic: impl Into<String>, mut partitions: Vec<PartitionOffset>) -> Self {
        partitions.sort_by_key(|p| p.partition);
        Self {
            topic: topic.into(),
            partitions,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partitions(&self) -> &[PartitionOffset] {
        &self.partitions
    }

    /// 查询某分区的起始 offset
    pub fn offset_of(&self, partition: i32) -> Option<i64> {
        self.partitions
            .iter()
            .find(|p| p.partition == partition)
            .map(|p| p.offset)
    }
}

/// 起始位置解析器
pub struct PositionResolver;

impl PositionResolver {
    /// 解析、分配并定位
    ///
    /// 任何一步失败都是启动失败；主题没有可发现的分区同样视为失败
    pub async fn resolve(
        source: &mut dyn MessageSource,
        topic: &str,
        position: StartingPosition,
    ) -> Result<PartitionAssignment> {
        let mut partitions = source.partitions(topic).await?;
        if partitions.is_empty() {
            return Err(ConsumerError::no_partitions(topic));
        }
        partitions.sort_unstable();
        partitions.dedup();

        let mut offsets = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let marks = source.watermarks(topic, partition).await.map_err(|e| {
                let builder = ErrorBuilder::new(e.code(), e.reason())
                    .context("topic", topic)
                    .context("partition", partition);
                match e.details() {
                    Some(details) => builder.details(details),
                    None => builder,
                }
                .build()
            })?;
            let offset = match position {
                StartingPosition::Beginning => marks.low,
                StartingPosition::Now => marks.high,
            };
            debug!(
                topic = %topic,
                partition,
                low = marks.low,
                high = marks.high,
                offset,
                "Resolved starting offset"
            );
            offsets.push(PartitionOffset { partition, offset });
        }

        let assignment = PartitionAssignment::new(topic, offsets);
        source.assign(&assignment).await?;
        for p in assignment.partitions() {
            source.seek(topic, p.partition, p.offset).await?;
        }

        info!(
            topic = %topic,
            position = %position,
            partition_count = assignment.partitions().len(),
            "Partitions assigned"
        );
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::source::memory::Fault;
    use crate::source::InMemoryCluster;

    fn seeded_cluster() -> InMemoryCluster {
        let cluster = InMemoryCluster::new();
        cluster.create_topic("orders", 2);
        for i in 0..3 {
            cluster.produce_str("orders", 0, "k", &format!("a{i}"));
        }
        cluster.produce_str("orders", 1, "k", "b0");
        cluster.truncate_before("orders", 0, 1);
        cluster
    }

    #[tokio::test]
    async fn beginning_resolves_to_low_watermarks() {
        let cluster = seeded_cluster();
        let mut source = cluster.connect().unwrap();
        let assignment =
            PositionResolver::resolve(&mut source, "orders", StartingPosition::Beginning)
                .await
                .unwrap();

        assert_eq!(assignment.topic(), "orders");
        assert_eq!(assignment.offset_of(0), Some(1));
        assert_eq!(assignment.offset_of(1), Some(0));
    }

    #[tokio::test]
    async fn now_resolves_to_high_watermarks() {
        let cluster = seeded_cluster();
        let mut source = cluster.connect().unwrap();
        let assignment = PositionResolver::resolve(&mut source, "orders", StartingPosition::Now)
            .await
            .unwrap();

        assert_eq!(assignment.offset_of(0), Some(3));
        assert_eq!(assignment.offset_of(1), Some(1));

        let batch = source
            .poll(std::time::Duration::from_millis(5), 10)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn unknown_topic_is_a_start_failure() {
        let cluster = InMemoryCluster::new();
        let mut source = cluster.connect().unwrap();
        let err = PositionResolver::resolve(&mut source, "missing", StartingPosition::Now)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoPartitions);
    }

    #[tokio::test]
    async fn watermark_failure_carries_partition_context() {
        let cluster = seeded_cluster();
        cluster.inject_fault(Fault::Watermarks);
        let mut source = cluster.connect().unwrap();
        let err = PositionResolver::resolve(&mut source, "orders", StartingPosition::Beginning)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::OffsetResolutionFailed);
        assert_eq!(
            err.details(),
            Some("topic=orders, partition=0, broker=in-memory")
        );
    }

    #[tokio::test]
    async fn assign_failure_propagates() {
        let cluster = seeded_cluster();
        cluster.inject_fault(Fault::Assign);
        let mut source = cluster.connect().unwrap();
        let err = PositionResolver::resolve(&mut source, "orders", StartingPosition::Now)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AssignmentFailed);
    }

    #[test]
    fn starting_position_parses_aliases() {
        assert_eq!("Beginning".parse::<StartingPosition>().unwrap(), StartingPosition::Beginning);
        assert_eq!("latest".parse::<StartingPosition>().unwrap(), StartingPosition::Now);
        assert!("middle".parse::<StartingPosition>().is_err());
    }
}
