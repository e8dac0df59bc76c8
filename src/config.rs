//! Process configuration (spec §4.10): the thinnest layer consistent with
//! the teacher never reaching for a config-management crate — one struct,
//! environment overrides, documented defaults.

use crate::observability::{Level, LogFormat};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// e.g. "0.0.0.0:8080".
    pub bind_address: String,
    pub ring_buffer_capacity: usize,
    pub log_format: LogFormat,
    pub log_level: Level,
    /// `None` selects the in-memory store; `Some(dsn)` selects SQLite.
    pub sqlite_dsn: Option<String>,
    pub base_url: String,
    /// Bearer token protecting the `/admin/*` plane, distinct from any
    /// per-tenant SCIM credential (spec §6.1).
    pub admin_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            ring_buffer_capacity: 500,
            log_format: LogFormat::Pretty,
            log_level: Level::Info,
            sqlite_dsn: None,
            base_url: "http://localhost:8080".to_string(),
            admin_token: None,
        }
    }
}

impl AppConfig {
    /// Reads `SCIM_*` environment variables, falling back to documented
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("SCIM_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            ring_buffer_capacity: env::var("SCIM_RING_BUFFER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ring_buffer_capacity),
            log_format: env::var("SCIM_LOG_FORMAT")
                .ok()
                .and_then(|v| match v.to_ascii_lowercase().as_str() {
                    "json" => Some(LogFormat::Json),
                    "pretty" => Some(LogFormat::Pretty),
                    _ => None,
                })
                .unwrap_or(defaults.log_format),
            log_level: env::var("SCIM_LOG_LEVEL")
                .ok()
                .and_then(|v| Level::from_str(&v).ok())
                .unwrap_or(defaults.log_level),
            sqlite_dsn: env::var("SCIM_SQLITE_DSN").ok(),
            base_url: env::var("SCIM_BASE_URL").unwrap_or(defaults.base_url),
            admin_token: env::var("SCIM_ADMIN_TOKEN").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selects_in_memory_store() {
        assert!(AppConfig::default().sqlite_dsn.is_none());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.ring_buffer_capacity, 500);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
