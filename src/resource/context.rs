use chrono::{DateTime, Utc};

/// Per-request correlation context (spec §4.7, §8.1 property 11).
///
/// Established by the request-logging interceptor at entry and carried
/// through every downstream call so log entries, store calls, and the
/// response headers all agree on the same `request_id`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub endpoint_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub auth_type: Option<String>,
    pub client_id: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            method: method.into(),
            path: path.into(),
            endpoint_id: None,
            start_time: Utc::now(),
            auth_type: None,
            client_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    pub fn with_auth(mut self, auth_type: impl Into<String>, client_id: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self.client_id = Some(client_id.into());
        self
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.start_time).num_milliseconds()
    }
}
