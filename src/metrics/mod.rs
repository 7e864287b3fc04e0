//! 会话指标收集模块
//!
//! 拉取失败、解码失败、关闭失败这类可恢复问题不会返回给调用方，
//! 除了日志之外通过这里的计数器对外暴露。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub polls_total: u64,
    pub empty_polls: u64,
    pub fetch_errors: u64,
    pub records_delivered: u64,
    pub records_skipped: u64,
    pub batches_delivered: u64,
    pub shutdown_errors: u64,
    pub worker_panics: u64,
}

#[derive(Debug, Default)]
struct Counters {
    polls_total: AtomicU64,
    empty_polls: AtomicU64,
    fetch_errors: AtomicU64,
    records_delivered: AtomicU64,
    records_skipped: AtomicU64,
    batches_delivered: AtomicU64,
    shutdown_errors: AtomicU64,
    worker_panics: AtomicU64,
}

/// 会话指标收集器
///
/// 克隆共享同一组计数器；worker 写入，控制器读取
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    counters: Arc<Counters>,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次拉取及其结果条数
    pub fn record_poll(&self, fetched: usize) {
        self.counters.polls_total.fetch_add(1, Ordering::Relaxed);
        if fetched == 0 {
            self.counters.empty_polls.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_fetch_error(&self) {
        self.counters.polls_total.fetch_add(1, Ordering::Relaxed);
        self.counters.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一个批次的投递结果
    pub fn record_batch(&self, delivered: usize, skipped: usize) {
        if delivered > 0 {
            self.counters.batches_delivered.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .records_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.counters
            .records_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    pub fn record_shutdown_error(&self) {
        self.counters.shutdown_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次回调 panic（会话随之结束）
    pub fn record_worker_panic(&self) {
        self.counters.worker_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            polls_total: c.polls_total.load(Ordering::Relaxed),
            empty_polls: c.empty_polls.load(Ordering::Relaxed),
            fetch_errors: c.fetch_errors.load(Ordering::Relaxed),
            records_delivered: c.records_delivered.load(Ordering::Relaxed),
            records_skipped: c.records_skipped.load(Ordering::Relaxed),
            batches_delivered: c.batches_delivered.load(Ordering::Relaxed),
            shutdown_errors: c.shutdown_errors.load(Ordering::Relaxed),
            worker_panics: c.worker_panics.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = SessionMetrics::new();
        let worker_side = metrics.clone();

        worker_side.record_poll(0);
        worker_side.record_poll(3);
        worker_side.record_fetch_error();
        worker_side.record_batch(2, 1);
        worker_side.record_batch(0, 1);
        worker_side.record_worker_panic();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.polls_total, 3);
        assert_eq!(snapshot.empty_polls, 1);
        assert_eq!(snapshot.fetch_errors, 1);
        assert_eq!(snapshot.records_delivered, 2);
        assert_eq!(snapshot.records_skipped, 2);
        assert_eq!(snapshot.batches_delivered, 1);
        assert_eq!(snapshot.worker_panics, 1);
    }
}
