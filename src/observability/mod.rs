//! Structured logging and request-log buffering (spec §4.7–§4.8, §5.2–§5.3).

pub mod context;
pub mod level;
pub mod logger;
pub mod redact;
pub mod request_log;
pub mod ring_buffer;

pub use context::CorrelationContext;
pub use level::{Category, Level};
pub use logger::{LogConfig, LogFormat, Logger};
pub use request_log::{RequestLogRecord, RequestLogSink, RequestLogWriter, TracingRequestLogSink};
pub use ring_buffer::{LogEntry, LogQuery, RingBuffer};
