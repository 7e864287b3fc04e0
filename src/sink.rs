//! 投递适配器
//!
//! 把一次拉取得到的原始批次解码后，通过一次回调交给调用方。
//! 不跨批次缓冲；空批次不触发回调。

use tracing::warn;

use crate::decode::{DecodedRecord, FormatSelector, decode_record};
use crate::error::ConsumerError;
use crate::source::RawRecord;

/// 记录接收方
///
/// 每个批次在 worker 上同步调用一次，同一会话内不会并发调用
pub trait RecordSink: Send {
    fn deliver(&mut self, records: Vec<DecodedRecord>);
}

impl<F> RecordSink for F
where
    F: FnMut(Vec<DecodedRecord>) + Send,
{
    fn deliver(&mut self, records: Vec<DecodedRecord>) {
        self(records)
    }
}

/// 单个批次的投递结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub delivered: usize,
    pub skipped: usize,
}

/// 投递适配器
pub struct DeliveryAdapter {
    topic: String,
    format: FormatSelector,
    sink: Box<dyn RecordSink>,
}

impl DeliveryAdapter {
    pub fn new(topic: impl Into<String>, format: FormatSelector, sink: Box<dyn RecordSink>) -> Self {
        Self {
            topic: topic.into(),
            format,
            sink,
        }
    }

    pub fn format(&self) -> FormatSelector {
        self.format
    }

    /// 解码并投递一个批次
    ///
    /// 解码失败的记录被跳过并告警，其余记录保持拉取顺序投递
    pub fn deliver_batch(&mut self, batch: Vec<RawRecord>) -> BatchOutcome {
        if batch.is_empty() {
            return BatchOutcome::default();
        }

        let mut skipped = 0;
        let mut records = Vec::with_capacity(batch.len());
        for raw in &batch {
            match decode_record(self.format, &self.topic, raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    let (partition, offset) = (e.partition, e.offset);
                    let err = ConsumerError::from(e);
                    warn!(
                        topic = %self.topic,
                        partition,
                        offset,
                        code = %err.code(),
                        error = %err,
                        details = err.details().unwrap_or_default(),
                        "Skipping record that failed to decode"
                    );
                }
            }
        }

        let delivered = records.len();
        if delivered > 0 {
            self.sink.deliver(records);
        }
        BatchOutcome { delivered, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<Vec<DecodedRecord>>>>;

    fn adapter(format: FormatSelector) -> (DeliveryAdapter, Calls) {
        let calls: Calls = Arc::default();
        let sink_calls = calls.clone();
        let adapter = DeliveryAdapter::new(
            "events",
            format,
            Box::new(move |records: Vec<DecodedRecord>| sink_calls.lock().unwrap().push(records)),
        );
        (adapter, calls)
    }

    fn text(offset: i64, value: &str) -> RawRecord {
        RawRecord::new(0, offset, Some(b"k"), Some(value.as_bytes()))
    }

    #[test]
    fn empty_batch_does_not_invoke_sink() {
        let (mut adapter, calls) = adapter(FormatSelector::String);
        assert_eq!(adapter.deliver_batch(Vec::new()), BatchOutcome::default());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn whole_batch_delivered_in_one_call_preserving_order() {
        let (mut adapter, calls) = adapter(FormatSelector::String);
        let outcome = adapter.deliver_batch(vec![text(0, "a"), text(1, "b"), text(2, "c")]);

        assert_eq!(outcome, BatchOutcome { delivered: 3, skipped: 0 });
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let offsets: Vec<i64> = calls[0].iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert!(calls[0].iter().all(|r| r.topic == "events"));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let (mut adapter, calls) = adapter(FormatSelector::Json);
        let outcome = adapter.deliver_batch(vec![
            text(0, r#"{"ok":true}"#),
            text(1, "not-json"),
            text(2, "[1,2]"),
        ]);

        assert_eq!(outcome, BatchOutcome { delivered: 2, skipped: 1 });
        let calls = calls.lock().unwrap();
        let offsets: Vec<i64> = calls[0].iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 2]);
    }

    #[test]
    fn all_malformed_batch_does_not_invoke_sink() {
        let (mut adapter, calls) = adapter(FormatSelector::Json);
        let outcome = adapter.deliver_batch(vec![text(0, "x"), text(1, "y")]);
        assert_eq!(outcome, BatchOutcome { delivered: 0, skipped: 2 });
        assert!(calls.lock().unwrap().is_empty());
    }
}
