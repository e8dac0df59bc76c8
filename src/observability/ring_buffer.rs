//! Bounded FIFO of recent log entries (spec §4.7), readable by admin
//! queries and streamed live over SSE. Safe under concurrent append from
//! many request handlers (`parking_lot::Mutex`, teacher's lock of choice
//! elsewhere in the ambient pack) and concurrent reads from admin/SSE.

use super::level::{Category, Level};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub level: Option<Level>,
    pub category: Option<Category>,
    pub request_id: Option<String>,
    pub endpoint_id: Option<String>,
}

impl LogQuery {
    fn matches(&self, entry: &LogEntry) -> bool {
        self.level.is_none_or(|l| entry.level >= l)
            && self.category.is_none_or(|c| entry.category.as_wire() == c.as_wire())
            && self.request_id.as_deref().is_none_or(|r| entry.request_id.as_deref() == Some(r))
            && self.endpoint_id.as_deref().is_none_or(|e| entry.endpoint_id.as_deref() == Some(e))
    }
}

pub struct RingBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    tail: broadcast::Sender<LogEntry>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tail, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            tail,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut guard = self.entries.lock();
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry.clone());
        drop(guard);
        // No subscribers is a normal, non-error condition for the SSE tail.
        let _ = self.tail.send(entry);
    }

    pub fn query(&self, filter: &LogQuery) -> Vec<LogEntry> {
        self.entries.lock().iter().filter(|e| filter.matches(e)).cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tail.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(level: Level, category: Category, endpoint_id: Option<&str>) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            category,
            message: "test".into(),
            request_id: None,
            endpoint_id: endpoint_id.map(String::from),
            method: None,
            path: None,
            duration_ms: None,
            error: None,
            data: None,
        }
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let buf = RingBuffer::new(2);
        buf.push(sample(Level::Info, Category::Http, None));
        buf.push(sample(Level::Info, Category::Http, Some("a")));
        buf.push(sample(Level::Info, Category::Http, Some("b")));
        assert_eq!(buf.len(), 2);
        let all = buf.query(&LogQuery::default());
        assert_eq!(all[0].endpoint_id.as_deref(), Some("a"));
        assert_eq!(all[1].endpoint_id.as_deref(), Some("b"));
    }

    #[test]
    fn query_filters_by_level_and_endpoint() {
        let buf = RingBuffer::new(10);
        buf.push(sample(Level::Debug, Category::Auth, Some("ep1")));
        buf.push(sample(Level::Error, Category::Auth, Some("ep1")));
        buf.push(sample(Level::Error, Category::Auth, Some("ep2")));

        let errors_ep1 = buf.query(&LogQuery {
            level: Some(Level::Error),
            endpoint_id: Some("ep1".into()),
            ..Default::default()
        });
        assert_eq!(errors_ep1.len(), 1);
    }
}
