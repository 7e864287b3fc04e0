//! 消息源能力接口
//!
//! 消费会话不依赖具体的 broker 客户端，而是依赖 `MessageSource` trait：
//! - 分区元数据发现
//! - 最早 / 最新水位查询
//! - 静态分区分配与显式定位
//! - 有界超时拉取
//! - 关闭释放
//!
//! 生产环境使用 Kafka 实现（`kafka` feature），测试使用 `memory::InMemorySource`。

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::position::PartitionAssignment;

pub use memory::{InMemoryCluster, InMemorySource, InMemorySourceFactory};

/// 分区水位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    /// 最早保留的 offset
    pub low: i64,
    /// 下一条将写入的 offset（高水位）
    pub high: i64,
}

/// 拉取到的原始记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    /// 毫秒时间戳（如果 broker 提供）
    pub timestamp: Option<i64>,
}

impl RawRecord {
    pub fn new(partition: i32, offset: i64, key: Option<&[u8]>, value: Option<&[u8]>) -> Self {
        Self {
            partition,
            offset,
            key: key.map(<[u8]>::to_vec),
            value: value.map(<[u8]>::to_vec),
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// 消息源 trait
///
/// 实例在会话运行期间由后台 worker 独占，控制器不会并发调用任何方法。
#[async_trait]
pub trait MessageSource: Send {
    /// 查询主题的全部分区 ID
    async fn partitions(&mut self, topic: &str) -> Result<Vec<i32>>;

    /// 查询分区的最早 / 最新水位
    async fn watermarks(&mut self, topic: &str, partition: i32) -> Result<Watermarks>;

    /// 静态分配分区（不参与消费组再均衡）
    async fn assign(&mut self, assignment: &PartitionAssignment) -> Result<()>;

    /// 将分区定位到指定 offset
    async fn seek(&mut self, topic: &str, partition: i32, offset: i64) -> Result<()>;

    /// 有界超时拉取
    ///
    /// 超时内没有消息时返回空批次，不是错误
    async fn poll(&mut self, timeout: Duration, max_records: usize) -> Result<Vec<RawRecord>>;

    /// 关闭并释放底层拉取会话
    async fn close(&mut self) -> Result<()>;
}

/// 消息源工厂
///
/// 每次 `start` 都会构建一个全新的客户端句柄；连接参数由工厂的实现方持有。
pub trait SourceFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn MessageSource>>;
}

impl<F> SourceFactory for F
where
    F: Fn() -> Result<Box<dyn MessageSource>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn MessageSource>> {
        self()
    }
}
