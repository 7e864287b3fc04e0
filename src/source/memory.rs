//! 内存消息源
//!
//! 确定性的 `MessageSource` 实现，用于测试和本地演示：
//! - `InMemoryCluster` 保存主题、分区和记录，可在会话运行中继续写入
//! - `InMemorySource` 按分配和定位结果读取记录
//! - 支持故障注入（构建、元数据、水位、分配、定位、拉取、关闭）

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use super::{MessageSource, RawRecord, SourceFactory, Watermarks};
use crate::error::{ConsumerError, ErrorCode, Result};
use crate::position::PartitionAssignment;

/// 可注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 工厂构建客户端失败
    Create,
    /// 分区元数据查询失败
    Metadata,
    /// 水位查询失败
    Watermarks,
    /// 分区分配失败
    Assign,
    /// 定位失败
    Seek,
    /// 接下来 N 次拉取返回传输错误
    Poll(usize),
    /// 关闭失败
    Close,
}

#[derive(Debug, Default)]
struct Faults {
    create: bool,
    metadata: bool,
    watermarks: bool,
    assign: bool,
    seek: bool,
    poll: usize,
    close: bool,
}

#[derive(Debug, Default)]
struct PartitionLog {
    /// 最早保留的 offset
    low: i64,
    records: Vec<RawRecord>,
}

impl PartitionLog {
    fn high(&self) -> i64 {
        self.low + self.records.len() as i64
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    topics: HashMap<String, BTreeMap<i32, PartitionLog>>,
    faults: Faults,
    created: usize,
    closed: usize,
    polls: usize,
}

/// 内存集群
///
/// 可克隆，所有克隆共享同一份状态
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
    appended: Arc<Notify>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 创建主题（已存在时补齐分区数）
    pub fn create_topic(&self, topic: &str, partitions: i32) {
        let mut state = self.state();
        let logs = state.topics.entry(topic.to_string()).or_default();
        for partition in 0..partitions {
            logs.entry(partition).or_default();
        }
    }

    /// 写入一条记录，返回分配到的 offset
    ///
    /// 主题或分区不存在时自动创建
    pub fn produce(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> i64 {
        let offset = {
            let mut state = self.state();
            let log = state
                .topics
                .entry(topic.to_string())
                .or_default()
                .entry(partition)
                .or_default();
            let offset = log.high();
            log.records.push(RawRecord::new(partition, offset, key, value));
            offset
        };
        self.appended.notify_waiters();
        offset
    }

    /// 写入一条字符串记录
    pub fn produce_str(&self, topic: &str, partition: i32, key: &str, value: &str) -> i64 {
        self.produce(topic, partition, Some(key.as_bytes()), Some(value.as_bytes()))
    }

    /// 模拟保留策略：删除 `offset` 之前的记录
    pub fn truncate_before(&self, topic: &str, partition: i32, offset: i64) {
        let mut state = self.state();
        if let Some(log) = state
            .topics
            .get_mut(topic)
            .and_then(|logs| logs.get_mut(&partition))
        {
            let drop_count = (offset - log.low).clamp(0, log.records.len() as i64) as usize;
            log.records.drain(..drop_count);
            log.low += drop_count as i64;
        }
    }

    /// 注入故障
    pub fn inject_fault(&self, fault: Fault) {
        let mut state = self.state();
        let faults = &mut state.faults;
        match fault {
            Fault::Create => faults.create = true,
            Fault::Metadata => faults.metadata = true,
            Fault::Watermarks => faults.watermarks = true,
            Fault::Assign => faults.assign = true,
            Fault::Seek => faults.seek = true,
            Fault::Poll(count) => faults.poll += count,
            Fault::Close => faults.close = true,
        }
    }

    /// 清除全部故障
    pub fn clear_faults(&self) {
        self.state().faults = Faults::default();
    }

    /// 已构建的客户端数量
    pub fn created_sources(&self) -> usize {
        self.state().created
    }

    /// 已关闭的客户端数量
    pub fn closed_sources(&self) -> usize {
        self.state().closed
    }

    /// 当前仍打开的客户端数量
    pub fn open_sources(&self) -> usize {
        let state = self.state();
        state.created - state.closed
    }

    /// 累计拉取次数
    pub fn poll_calls(&self) -> usize {
        self.state().polls
    }

    /// 构建一个连接到本集群的消息源
    pub fn connect(&self) -> Result<InMemorySource> {
        let mut state = self.state();
        if state.faults.create {
            return Err(ConsumerError::client_create_failed(
                "injected client construction failure",
            ));
        }
        state.created += 1;
        Ok(InMemorySource {
            cluster: self.clone(),
            topic: None,
            positions: BTreeMap::new(),
            next_partition: 0,
            closed: false,
        })
    }

    /// 获取工厂
    pub fn factory(&self) -> InMemorySourceFactory {
        InMemorySourceFactory {
            cluster: self.clone(),
        }
    }
}

/// 内存消息源工厂
#[derive(Clone)]
pub struct InMemorySourceFactory {
    cluster: InMemoryCluster,
}

impl SourceFactory for InMemorySourceFactory {
    fn create(&self) -> Result<Box<dyn MessageSource>> {
        Ok(Box::new(self.cluster.connect()?))
    }
}

/// 内存消息源
pub struct InMemorySource {
    cluster: InMemoryCluster,
    topic: Option<String>,
    /// 分区 -> 下一条要读取的 offset
    positions: BTreeMap<i32, i64>,
    /// 下一次读取从第几个分区开始，轮转避免低编号分区独占批次
    next_partition: usize,
    closed: bool,
}

impl InMemorySource {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ConsumerError::coded(
                ErrorCode::ClientUnavailable,
                "source already closed",
            ));
        }
        Ok(())
    }

    /// 读取已定位之后的记录，并推进读取位置
    ///
    /// 分区内保持 offset 顺序；起始分区每次轮转一位
    fn drain_ready(&mut self, max_records: usize) -> Vec<RawRecord> {
        let Some(topic) = self.topic.as_deref() else {
            return Vec::new();
        };
        let state = self.cluster.state();
        let Some(logs) = state.topics.get(topic) else {
            return Vec::new();
        };

        let partitions: Vec<i32> = self.positions.keys().copied().collect();
        if partitions.is_empty() {
            return Vec::new();
        }
        let start = self.next_partition % partitions.len();
        self.next_partition = start + 1;

        let mut batch = Vec::new();
        for partition in partitions[start..].iter().chain(&partitions[..start]) {
            let (Some(log), Some(position)) =
                (logs.get(partition), self.positions.get_mut(partition))
            else {
                continue;
            };
            // 被保留策略删除的 offset 直接跳到最早保留位置
            if *position < log.low {
                *position = log.low;
            }
            let skip = (*position - log.low) as usize;
            for record in log.records.iter().skip(skip) {
                if batch.len() >= max_records {
                    return batch;
                }
                batch.push(record.clone());
                *position = record.offset + 1;
            }
        }
        batch
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn partitions(&mut self, topic: &str) -> Result<Vec<i32>> {
        self.ensure_open()?;
        let state = self.cluster.state();
        if state.faults.metadata {
            return Err(ConsumerError::metadata_unavailable(
                "injected metadata failure",
            ));
        }
        Ok(state
            .topics
            .get(topic)
            .map(|logs| logs.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn watermarks(&mut self, topic: &str, partition: i32) -> Result<Watermarks> {
        self.ensure_open()?;
        let state = self.cluster.state();
        if state.faults.watermarks {
            return Err(
                ConsumerError::offset_resolution_failed("injected watermark failure")
                    .with_details("broker=in-memory"),
            );
        }
        state
            .topics
            .get(topic)
            .and_then(|logs| logs.get(&partition))
            .map(|log| Watermarks {
                low: log.low,
                high: log.high(),
            })
            .ok_or_else(|| {
                ConsumerError::offset_resolution_failed(format!(
                    "unknown partition {topic}/{partition}"
                ))
            })
    }

    async fn assign(&mut self, assignment: &PartitionAssignment) -> Result<()> {
        self.ensure_open()?;
        if self.cluster.state().faults.assign {
            return Err(ConsumerError::assignment_failed("injected assign failure"));
        }
        self.topic = Some(assignment.topic().to_string());
        self.positions = assignment
            .partitions()
            .iter()
            .map(|p| (p.partition, p.offset))
            .collect();
        Ok(())
    }

    async fn seek(&mut self, topic: &str, partition: i32, offset: i64) -> Result<()> {
        self.ensure_open()?;
        if self.cluster.state().faults.seek {
            return Err(ConsumerError::seek_failed("injected seek failure"));
        }
        if self.topic.as_deref() != Some(topic) {
            return Err(ConsumerError::seek_failed(format!(
                "topic {topic} is not assigned"
            )));
        }
        match self.positions.get_mut(&partition) {
            Some(position) => {
                *position = offset;
                Ok(())
            }
            None => Err(ConsumerError::seek_failed(format!(
                "partition {topic}/{partition} is not assigned"
            ))),
        }
    }

    async fn poll(&mut self, timeout: Duration, max_records: usize) -> Result<Vec<RawRecord>> {
        self.ensure_open()?;
        {
            let mut state = self.cluster.state();
            state.polls += 1;
            if state.faults.poll > 0 {
                state.faults.poll -= 1;
                return Err(ConsumerError::transport("injected transport failure"));
            }
        }

        let appended = self.cluster.appended.clone();
        let notified = appended.notified();
        tokio::pin!(notified);
        // 先注册唤醒再检查，避免错过检查之后的写入
        notified.as_mut().enable();

        let batch = self.drain_ready(max_records);
        if !batch.is_empty() {
            return Ok(batch);
        }

        if tokio::time::timeout(timeout, notified).await.is_err() {
            return Ok(Vec::new());
        }
        Ok(self.drain_ready(max_records))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = self.cluster.state();
        state.closed += 1;
        debug!(created = state.created, closed = state.closed, "In-memory source closed");
        if state.faults.close {
            return Err(ConsumerError::client_close_failed("injected close failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PartitionOffset;

    fn assignment(topic: &str, offsets: &[(i32, i64)]) -> PartitionAssignment {
        PartitionAssignment::new(
            topic,
            offsets
                .iter()
                .map(|&(partition, offset)| PartitionOffset { partition, offset })
                .collect(),
        )
    }

    #[tokio::test]
    async fn watermarks_track_produce_and_truncate() {
        let cluster = InMemoryCluster::new();
        cluster.create_topic("t", 1);
        for i in 0..5 {
            cluster.produce_str("t", 0, "k", &format!("v{i}"));
        }
        cluster.truncate_before("t", 0, 2);

        let mut source = cluster.connect().unwrap();
        let marks = source.watermarks("t", 0).await.unwrap();
        assert_eq!(marks, Watermarks { low: 2, high: 5 });
    }

    #[tokio::test]
    async fn poll_reads_from_seeked_position_in_partition_order() {
        let cluster = InMemoryCluster::new();
        cluster.create_topic("t", 2);
        cluster.produce_str("t", 1, "a", "p1-0");
        cluster.produce_str("t", 0, "b", "p0-0");
        cluster.produce_str("t", 0, "c", "p0-1");

        let mut source = cluster.connect().unwrap();
        source.assign(&assignment("t", &[(0, 0), (1, 0)])).await.unwrap();
        source.seek("t", 0, 1).await.unwrap();

        let batch = source.poll(Duration::from_millis(10), 100).await.unwrap();
        let seen: Vec<(i32, i64)> = batch.iter().map(|r| (r.partition, r.offset)).collect();
        assert_eq!(seen, vec![(0, 1), (1, 0)]);

        let empty = source.poll(Duration::from_millis(10), 100).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn poll_respects_max_records() {
        let cluster = InMemoryCluster::new();
        for i in 0..4 {
            cluster.produce_str("t", 0, "k", &i.to_string());
        }
        let mut source = cluster.connect().unwrap();
        source.assign(&assignment("t", &[(0, 0)])).await.unwrap();

        assert_eq!(source.poll(Duration::ZERO, 3).await.unwrap().len(), 3);
        assert_eq!(source.poll(Duration::ZERO, 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn busy_partition_does_not_starve_others() {
        let cluster = InMemoryCluster::new();
        cluster.create_topic("t", 2);
        for i in 0..10 {
            cluster.produce_str("t", 0, "k", &format!("p0-{i}"));
        }
        cluster.produce_str("t", 1, "k", "p1-0");

        let mut source = cluster.connect().unwrap();
        source.assign(&assignment("t", &[(0, 0), (1, 0)])).await.unwrap();

        let first = source.poll(Duration::ZERO, 2).await.unwrap();
        assert!(first.iter().all(|r| r.partition == 0));

        let second = source.poll(Duration::ZERO, 2).await.unwrap();
        let seen: Vec<(i32, i64)> = second.iter().map(|r| (r.partition, r.offset)).collect();
        assert_eq!(seen, vec![(1, 0), (0, 2)]);
    }

    #[tokio::test]
    async fn poll_wakes_up_on_new_record() {
        let cluster = InMemoryCluster::new();
        cluster.create_topic("t", 1);
        let mut source = cluster.connect().unwrap();
        source.assign(&assignment("t", &[(0, 0)])).await.unwrap();

        let producer = cluster.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.produce_str("t", 0, "k", "late");
        });

        let batch = source.poll(Duration::from_secs(5), 10).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn injected_poll_failures_are_consumed_in_order() {
        let cluster = InMemoryCluster::new();
        cluster.produce_str("t", 0, "k", "v");
        cluster.inject_fault(Fault::Poll(1));

        let mut source = cluster.connect().unwrap();
        source.assign(&assignment("t", &[(0, 0)])).await.unwrap();

        let err = source.poll(Duration::ZERO, 10).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TransportError);
        assert_eq!(source.poll(Duration::ZERO, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_source_rejects_calls_and_counts_once() {
        let cluster = InMemoryCluster::new();
        let mut source = cluster.connect().unwrap();
        source.close().await.unwrap();
        source.close().await.unwrap();

        assert_eq!(cluster.closed_sources(), 1);
        assert_eq!(cluster.open_sources(), 0);
        let err = source.partitions("t").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ClientUnavailable);
    }

    #[test]
    fn create_fault_fails_factory() {
        let cluster = InMemoryCluster::new();
        cluster.inject_fault(Fault::Create);
        let err = cluster.factory().create().err().unwrap();
        assert_eq!(err.code(), ErrorCode::ClientCreateFailed);
        assert_eq!(cluster.created_sources(), 0);
    }
}
