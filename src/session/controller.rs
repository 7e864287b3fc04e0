//! 会话控制器
//!
//! 对宿主应用暴露同步的 `start` / `stop` / `is_running`：
//! - `start` 同步完成客户端构建和起始位置解析，失败时不启动 worker
//! - worker 运行在独立线程上（单线程 tokio 运行时），`start` 不等待它
//! - `stop` 发出取消信号并阻塞到 worker 退出、消息源关闭
//! - `is_running` 只读原子标志，不阻塞
//!
//! 这些方法会阻塞当前线程，不能在异步执行器的线程上调用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::decode::{DecodedRecord, FormatSelector};
use crate::error::{ConsumerError, ErrorCode, Result};
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::position::{PartitionAssignment, PositionResolver, StartingPosition};
use crate::session::config::SessionConfig;
use crate::session::worker::SessionWorker;
use crate::sink::{DeliveryAdapter, RecordSink};
use crate::source::SourceFactory;

/// 活动会话的只读快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub topic: String,
    pub position: StartingPosition,
    pub format: FormatSelector,
    pub started_at: DateTime<Utc>,
    pub assignment: PartitionAssignment,
}

struct ActiveSession {
    topic: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// worker 线程退出时清除运行标志，包括回调 panic 导致的退出
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Status {
    info: Option<SessionInfo>,
    metrics: SessionMetrics,
}

/// 单主题消费会话控制器
///
/// 同一时间最多一个活动会话；停止后可以再次启动。
///
/// # 使用示例
/// ```rust,no_run
/// use flare_topic_consumer::{ConsumerController, FormatSelector, StartingPosition};
/// use flare_topic_consumer::source::InMemoryCluster;
///
/// let cluster = InMemoryCluster::new();
/// cluster.produce_str("orders", 0, "k", "hello");
///
/// let controller = ConsumerController::new(cluster.factory());
/// controller.start("orders", StartingPosition::Beginning, FormatSelector::String, |records| {
///     for record in records {
///         println!("{}@{}: {}", record.partition, record.offset, record.value.render());
///     }
/// })?;
/// controller.stop();
/// # Ok::<(), flare_topic_consumer::ConsumerError>(())
/// ```
pub struct ConsumerController {
    factory: Arc<dyn SourceFactory>,
    config: SessionConfig,
    running: Arc<AtomicBool>,
    /// start / stop 的互斥锁，stop 在等待 worker 退出期间一直持有
    lifecycle: Mutex<Option<ActiveSession>>,
    status: Mutex<Status>,
}

impl ConsumerController {
    /// 使用默认配置创建控制器
    pub fn new(factory: impl SourceFactory + 'static) -> Self {
        Self::with_config(factory, SessionConfig::default())
    }

    pub fn with_config(factory: impl SourceFactory + 'static, config: SessionConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            config,
            running: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(None),
            status: Mutex::new(Status::default()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lifecycle(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 启动消费会话
    ///
    /// 已有会话在运行时返回 `SessionAlreadyRunning`，不影响现有会话。
    /// 客户端构建、分区发现、offset 解析、分配失败都会同步返回，且不启动 worker。
    pub fn start<F>(
        &self,
        topic: &str,
        position: StartingPosition,
        format: FormatSelector,
        on_records: F,
    ) -> Result<()>
    where
        F: FnMut(Vec<DecodedRecord>) + Send + 'static,
    {
        self.start_with_sink(topic, position, format, Box::new(on_records))
    }

    /// 使用自定义 `RecordSink` 启动消费会话
    pub fn start_with_sink(
        &self,
        topic: &str,
        position: StartingPosition,
        format: FormatSelector,
        sink: Box<dyn RecordSink>,
    ) -> Result<()> {
        let mut active = self.lifecycle();

        if let Some(session) = active.as_ref() {
            if self.running.load(Ordering::SeqCst) {
                warn!(
                    topic = %topic,
                    active_topic = %session.topic,
                    "Start rejected, a session is already running"
                );
                return Err(ConsumerError::already_running(&session.topic));
            }
        }
        // worker 已自行退出（例如回调 panic），先回收
        if let Some(dead) = active.take() {
            Self::join_worker(dead);
        }

        if topic.trim().is_empty() || topic.contains('\0') {
            return Err(ConsumerError::invalid_parameter(format!(
                "invalid topic name: {topic:?}"
            )));
        }
        self.config.validate()?;

        info!(
            topic = %topic,
            position = %position,
            format = %format,
            "🚀 Starting consumer session"
        );

        let mut source = self.factory.create().inspect_err(|e| {
            error!(topic = %topic, error = %e, "❌ Failed to create message source");
        })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                ConsumerError::coded(
                    ErrorCode::WorkerSpawnFailed,
                    format!("failed to build worker runtime: {e}"),
                )
            })?;

        let assignment =
            match runtime.block_on(PositionResolver::resolve(source.as_mut(), topic, position)) {
                Ok(assignment) => assignment,
                Err(e) => {
                    error!(topic = %topic, error = %e, "❌ Failed to resolve starting position");
                    if let Err(close_err) = runtime.block_on(source.close()) {
                        warn!(
                            topic = %topic,
                            error = %close_err,
                            "⚠️ Failed to close message source after start failure"
                        );
                    }
                    return Err(e);
                }
            };

        let metrics = SessionMetrics::new();
        let adapter = DeliveryAdapter::new(topic, format, sink);
        let worker = SessionWorker::new(
            topic,
            source,
            adapter,
            self.config.clone(),
            metrics.clone(),
        );
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        self.running.store(true, Ordering::SeqCst);
        let guard = RunningGuard(self.running.clone());
        let spawned = std::thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, topic))
            .spawn(move || {
                let _guard = guard;
                runtime.block_on(worker.run(worker_cancel));
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // 闭包随错误一起被丢弃，guard 已清除运行标志
                self.running.store(false, Ordering::SeqCst);
                error!(topic = %topic, error = %e, "❌ Failed to spawn consumer worker");
                return Err(ConsumerError::coded(
                    ErrorCode::WorkerSpawnFailed,
                    format!("failed to spawn worker thread: {e}"),
                ));
            }
        };

        let info = SessionInfo {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            position,
            format,
            started_at: Utc::now(),
            assignment,
        };
        info!(
            session_id = %info.id,
            topic = %topic,
            partition_count = info.assignment.partitions().len(),
            "✅ Consumer session started"
        );
        {
            let mut status = self.status();
            status.info = Some(info);
            status.metrics = metrics;
        }

        *active = Some(ActiveSession {
            topic: topic.to_string(),
            cancel,
            handle,
        });
        Ok(())
    }

    /// 停止消费会话
    ///
    /// 幂等；阻塞到 worker 完全退出并关闭消息源。返回之后不会再有回调。
    /// 在回调内部调用时不等待，当前回调返回后 worker 关闭消息源并退出。
    pub fn stop(&self) {
        let mut active = self.lifecycle();
        let Some(session) = active.take() else {
            debug!("Stop requested but no session is active");
            return;
        };

        // 在回调里调用 stop：只发取消信号，worker 返回循环后自行关闭消息源；
        // 句柄留给下一次 start / stop 回收
        if session.handle.thread().id() == std::thread::current().id() {
            debug!(
                topic = %session.topic,
                "Stop requested from the consumer worker, cancelling without join"
            );
            session.cancel.cancel();
            *active = Some(session);
            return;
        }

        info!(topic = %session.topic, "Stopping consumer session");
        session.cancel.cancel();
        Self::join_worker(session);
        self.running.store(false, Ordering::SeqCst);
        self.status().info = None;
        info!("Consumer session stopped");
    }

    fn join_worker(session: ActiveSession) {
        if session.handle.join().is_err() {
            error!(
                topic = %session.topic,
                code = %ErrorCode::WorkerPanicked,
                "❌ Consumer worker panicked"
            );
        }
    }

    /// 当前是否有会话在运行（不阻塞）
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 活动会话信息
    pub fn session_info(&self) -> Option<SessionInfo> {
        if !self.is_running() {
            return None;
        }
        self.status().info.clone()
    }

    /// 当前（或最近一次）会话的指标
    pub fn metrics(&self) -> MetricsSnapshot {
        self.status().metrics.snapshot()
    }
}

impl Drop for ConsumerController {
    fn drop(&mut self) {
        self.stop();
    }
}
