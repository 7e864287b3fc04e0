//! 消费会话
//!
//! 提供可重复启停的单主题消费会话：
//!
//! 1. **同步生命周期**：`start` / `stop` / `is_running`，互斥的启停转换
//! 2. **独立的后台读取循环**：独立线程上的单线程 tokio 运行时
//! 3. **协作式取消**：`CancellationToken` 与有界拉取竞争，停止延迟可预期
//! 4. **故障隔离**：拉取失败退避重试，解码失败跳过单条记录
//!
//! # 使用示例
//! ```rust,no_run
//! use flare_topic_consumer::session::{ConsumerController, SessionConfig};
//! use flare_topic_consumer::source::InMemoryCluster;
//! use flare_topic_consumer::{FormatSelector, StartingPosition};
//! use std::time::Duration;
//!
//! let cluster = InMemoryCluster::new();
//! cluster.create_topic("audit", 3);
//!
//! let config = SessionConfig::new().with_poll_timeout(Duration::from_millis(50));
//! let controller = ConsumerController::with_config(cluster.factory(), config);
//! controller.start("audit", StartingPosition::Now, FormatSelector::Json, |records| {
//!     tracing::info!(count = records.len(), "received");
//! })?;
//! assert!(controller.is_running());
//! controller.stop();
//! # Ok::<(), flare_topic_consumer::ConsumerError>(())
//! ```

pub mod config;
pub mod controller;
mod worker;

pub use config::SessionConfig;
pub use controller::{ConsumerController, SessionInfo};
