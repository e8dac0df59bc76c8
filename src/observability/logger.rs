//! Process-wide structured logger (spec §4.7): three-tier cascade filter,
//! redaction, truncation, pretty/json emission via `tracing`.

use super::context;
use super::level::{Category, Level};
use super::redact;
use super::ring_buffer::{LogEntry, LogQuery, RingBuffer};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global_level: Level,
    pub category_overrides: HashMap<&'static str, Level>,
    pub endpoint_overrides: HashMap<String, Level>,
    pub format: LogFormat,
    pub max_payload_size_bytes: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global_level: Level::Info,
            category_overrides: HashMap::new(),
            endpoint_overrides: HashMap::new(),
            format: LogFormat::Pretty,
            max_payload_size_bytes: 4096,
        }
    }
}

impl LogConfig {
    /// Three-tier cascade, first match wins: per-endpoint override,
    /// per-category override, then the global level.
    fn resolve_threshold(&self, category: Category, endpoint_id: Option<&str>) -> Level {
        if let Some(id) = endpoint_id {
            if let Some(level) = self.endpoint_overrides.get(id) {
                return *level;
            }
        }
        if let Some(level) = self.category_overrides.get(category.as_wire()) {
            return *level;
        }
        self.global_level
    }
}

pub struct Logger {
    config: RwLock<LogConfig>,
    ring: Arc<RingBuffer>,
}

impl Logger {
    pub fn new(config: LogConfig, ring_buffer_capacity: usize) -> Self {
        Self {
            config: RwLock::new(config),
            ring: Arc::new(RingBuffer::new(ring_buffer_capacity)),
        }
    }

    pub fn ring(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.ring)
    }

    pub fn config(&self) -> LogConfig {
        self.config.read().clone()
    }

    pub fn set_global_level(&self, level: Level) {
        self.config.write().global_level = level;
    }

    pub fn set_category_level(&self, category: Category, level: Level) {
        self.config.write().category_overrides.insert(category.as_wire(), level);
    }

    pub fn set_endpoint_level(&self, endpoint_id: &str, level: Level) {
        self.config.write().endpoint_overrides.insert(endpoint_id.to_string(), level);
    }

    pub fn clear_endpoint_level(&self, endpoint_id: &str) {
        self.config.write().endpoint_overrides.remove(endpoint_id);
    }

    pub fn query_recent(&self, filter: &LogQuery) -> Vec<LogEntry> {
        self.ring.query(filter)
    }

    pub fn clear_recent(&self) {
        self.ring.clear();
    }

    /// Emit one log entry if the cascade filter admits it. `data` is
    /// redacted and truncated before it ever reaches the ring buffer, a
    /// subscriber, or a `tracing` sink.
    pub fn log(&self, level: Level, category: Category, message: impl Into<String>, data: Option<Value>) {
        let ctx = context::current();
        let endpoint_id = ctx.as_ref().and_then(|c| c.endpoint_id.clone());

        let config = self.config.read();
        if level < config.resolve_threshold(category, endpoint_id.as_deref()) {
            return;
        }
        let max_bytes = config.max_payload_size_bytes;
        drop(config);

        let message = message.into();
        let data = data.map(|v| redact::truncate(&redact::redact(&v), max_bytes));

        emit_to_tracing(level, category, &message, &data);

        let entry = LogEntry {
            timestamp: chrono::Utc::now(),
            level,
            category,
            message,
            request_id: ctx.as_ref().map(|c| c.request_id.clone()),
            endpoint_id,
            method: ctx.as_ref().map(|c| c.method.clone()),
            path: ctx.as_ref().map(|c| c.path.clone()),
            duration_ms: None,
            error: None,
            data,
        };
        self.ring.push(entry);
    }
}

fn emit_to_tracing(level: Level, category: Category, message: &str, data: &Option<Value>) {
    let category = category.as_wire();
    match level {
        Level::Trace => tracing::trace!(category, ?data, "{message}"),
        Level::Debug => tracing::debug!(category, ?data, "{message}"),
        Level::Info => tracing::info!(category, ?data, "{message}"),
        Level::Warn => tracing::warn!(category, ?data, "{message}"),
        Level::Error | Level::Fatal => tracing::error!(category, ?data, "{message}"),
        Level::Off => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn below_global_threshold_is_dropped() {
        let logger = Logger::new(LogConfig { global_level: Level::Warn, ..Default::default() }, 10);
        logger.log(Level::Debug, Category::Http, "noisy", None);
        assert_eq!(logger.ring().len(), 0);
    }

    #[test]
    fn endpoint_override_wins_over_global() {
        let logger = Logger::new(Default::default(), 10);
        logger.set_endpoint_level("ep1", Level::Error);
        logger.set_category_level(Category::Http, Level::Debug);
        // Endpoint override (Error) beats the category override (Debug).
        let config = logger.config();
        assert_eq!(config.resolve_threshold(Category::Http, Some("ep1")), Level::Error);
        assert_eq!(config.resolve_threshold(Category::Http, Some("ep2")), Level::Debug);
    }

    #[test]
    fn data_is_redacted_before_storage() {
        let logger = Logger::new(Default::default(), 10);
        logger.log(Level::Info, Category::Auth, "login attempt", Some(json!({"token": "abc123"})));
        let entries = logger.query_recent(&LogQuery::default());
        assert_eq!(entries[0].data.as_ref().unwrap()["token"], "[REDACTED]");
    }
}
