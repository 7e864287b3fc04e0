//! 后台读取循环
//!
//! worker 独占消息源：循环执行有界拉取、解码、投递，直到收到取消信号或回调 panic，
//! 任何退出路径都会先关闭消息源。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ErrorCode;
use crate::metrics::SessionMetrics;
use crate::retry::RetryPolicy;
use crate::session::config::SessionConfig;
use crate::sink::DeliveryAdapter;
use crate::source::MessageSource;

pub(crate) struct SessionWorker {
    topic: String,
    source: Box<dyn MessageSource>,
    adapter: DeliveryAdapter,
    config: SessionConfig,
    retry: Box<dyn RetryPolicy>,
    metrics: SessionMetrics,
}

impl SessionWorker {
    pub(crate) fn new(
        topic: impl Into<String>,
        source: Box<dyn MessageSource>,
        adapter: DeliveryAdapter,
        config: SessionConfig,
        metrics: SessionMetrics,
    ) -> Self {
        let retry = config.retry.build();
        Self {
            topic: topic.into(),
            source,
            adapter,
            config,
            retry,
            metrics,
        }
    }

    /// 运行读取循环直到取消
    ///
    /// 取消信号在每轮开始时检查，并与挂起的拉取和退避等待竞争，
    /// 所以停止延迟不受拉取超时限制
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        let poll_timeout = self.config.poll_timeout();
        let max_batch = self.config.max_batch_size;
        let mut consecutive_failures = 0usize;

        info!(
            topic = %self.topic,
            format = %self.adapter.format(),
            poll_timeout_ms = self.config.poll_timeout_ms,
            "Consumer loop started"
        );

        while !cancel.is_cancelled() {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.source.poll(poll_timeout, max_batch) => result,
            };

            match polled {
                Ok(batch) => {
                    if consecutive_failures > 0 {
                        info!(
                            topic = %self.topic,
                            failures = consecutive_failures,
                            "Fetch recovered"
                        );
                        consecutive_failures = 0;
                    }
                    self.metrics.record_poll(batch.len());
                    let adapter = &mut self.adapter;
                    let delivered =
                        panic::catch_unwind(AssertUnwindSafe(|| adapter.deliver_batch(batch)));
                    let outcome = match delivered {
                        Ok(outcome) => outcome,
                        Err(payload) => {
                            self.metrics.record_worker_panic();
                            error!(
                                topic = %self.topic,
                                code = %ErrorCode::WorkerPanicked,
                                panic = panic_message(payload.as_ref()),
                                "❌ Record callback panicked, stopping session"
                            );
                            break;
                        }
                    };
                    self.metrics.record_batch(outcome.delivered, outcome.skipped);
                    if outcome.delivered > 0 || outcome.skipped > 0 {
                        debug!(
                            topic = %self.topic,
                            delivered = outcome.delivered,
                            skipped = outcome.skipped,
                            "Batch processed"
                        );
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.metrics.record_fetch_error();
                    if self.retry.should_retry(consecutive_failures, &e) {
                        warn!(
                            topic = %self.topic,
                            attempt = consecutive_failures,
                            error = %e,
                            "Fetch failed, will retry"
                        );
                    } else {
                        error!(
                            topic = %self.topic,
                            attempt = consecutive_failures,
                            max_attempts = self.retry.max_attempts(),
                            error = %e,
                            "Fetch keeps failing, session stays alive"
                        );
                    }

                    let backoff = self.retry.backoff_duration(consecutive_failures);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        debug!(topic = %self.topic, "Consumer loop exiting, closing source");
        if let Err(e) = self.source.close().await {
            self.metrics.record_shutdown_error();
            warn!(
                topic = %self.topic,
                error = %e,
                "⚠️ Failed to close message source"
            );
        }
        info!(topic = %self.topic, "Consumer loop stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
