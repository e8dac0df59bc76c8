//! Buffered request-log writer (spec §5.3): the request-logging
//! interceptor enqueues one record per request; a background flusher
//! drains the buffer to the repository at ≥50 entries or ≥3s, whichever
//! comes first, and unconditionally on shutdown. Flush failures are logged
//! but never surface to the HTTP client.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;

const FLUSH_AT_LEN: usize = 50;
const FLUSH_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct RequestLogRecord {
    pub request_id: String,
    pub endpoint_id: Option<String>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: i64,
    pub timestamp: DateTime<Utc>,
}

/// Anything that can durably persist a batch of request-log records. The
/// in-memory and SQLite stores each implement this trivially; kept as its
/// own trait rather than folded into `ResourceStore` since request logs are
/// not SCIM resources.
pub trait RequestLogSink: Send + Sync + 'static {
    fn write_batch(&self, records: Vec<RequestLogRecord>) -> impl Future<Output = Result<(), String>> + Send;
}

/// Default sink for deployments that don't wire up their own `RequestLog`
/// table — emits each flushed batch as a single structured `tracing` event
/// rather than dropping it.
#[derive(Debug, Default)]
pub struct TracingRequestLogSink;

impl RequestLogSink for TracingRequestLogSink {
    async fn write_batch(&self, records: Vec<RequestLogRecord>) -> Result<(), String> {
        for record in &records {
            tracing::info!(
                category = "http",
                request_id = %record.request_id,
                endpoint_id = record.endpoint_id.as_deref().unwrap_or(""),
                method = %record.method,
                path = %record.path,
                status = record.status,
                duration_ms = record.duration_ms,
                "request completed"
            );
        }
        Ok(())
    }
}

struct Buffer {
    records: Vec<RequestLogRecord>,
    first_enqueued_at: Option<std::time::Instant>,
}

pub struct RequestLogWriter<S> {
    sink: Arc<S>,
    buffer: Arc<Mutex<Buffer>>,
}

impl<S: RequestLogSink> RequestLogWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
            buffer: Arc::new(Mutex::new(Buffer { records: Vec::new(), first_enqueued_at: None })),
        }
    }

    pub async fn enqueue(&self, record: RequestLogRecord) {
        let mut buf = self.buffer.lock().await;
        if buf.records.is_empty() {
            buf.first_enqueued_at = Some(std::time::Instant::now());
        }
        buf.records.push(record);
        let should_flush = buf.records.len() >= FLUSH_AT_LEN;
        drop(buf);
        if should_flush {
            self.flush().await;
        }
    }

    /// Drains whatever is currently buffered, regardless of size — used by
    /// both the periodic ticker and graceful shutdown.
    pub async fn flush(&self) {
        let drained = {
            let mut buf = self.buffer.lock().await;
            buf.first_enqueued_at = None;
            std::mem::take(&mut buf.records)
        };
        if drained.is_empty() {
            return;
        }
        if let Err(err) = self.sink.write_batch(drained).await {
            tracing::error!(category = "database", "request-log flush failed: {err}");
        }
    }

    /// Spawns the background ticker that flushes every time ≥3s has
    /// elapsed since the oldest buffered record, even if the 50-entry
    /// threshold was never reached.
    pub fn spawn_ticker(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_millis(500));
            loop {
                tick.tick().await;
                let stale = {
                    let buf = self.buffer.lock().await;
                    buf.first_enqueued_at.is_some_and(|t| t.elapsed() >= FLUSH_AFTER)
                };
                if stale {
                    self.flush().await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        batches: AtomicUsize,
        total_records: AtomicUsize,
    }

    impl RequestLogSink for Arc<CountingSink> {
        async fn write_batch(&self, records: Vec<RequestLogRecord>) -> Result<(), String> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.total_records.fetch_add(records.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample(id: &str) -> RequestLogRecord {
        RequestLogRecord {
            request_id: id.into(),
            endpoint_id: Some("ep1".into()),
            method: "GET".into(),
            path: "/Users".into(),
            status: 200,
            duration_ms: 5,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn flushes_at_fifty_entries() {
        let sink = Arc::new(CountingSink { batches: AtomicUsize::new(0), total_records: AtomicUsize::new(0) });
        let writer = RequestLogWriter::new(sink.clone());
        for i in 0..50 {
            writer.enqueue(sample(&i.to_string())).await;
        }
        assert_eq!(sink.batches.load(Ordering::SeqCst), 1);
        assert_eq!(sink.total_records.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn manual_flush_drains_partial_buffer() {
        let sink = Arc::new(CountingSink { batches: AtomicUsize::new(0), total_records: AtomicUsize::new(0) });
        let writer = RequestLogWriter::new(sink.clone());
        writer.enqueue(sample("1")).await;
        writer.enqueue(sample("2")).await;
        writer.flush().await;
        assert_eq!(sink.batches.load(Ordering::SeqCst), 1);
        assert_eq!(sink.total_records.load(Ordering::SeqCst), 2);
    }
}
