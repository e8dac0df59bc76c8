//! Per-request correlation context (spec §4.7, §5.2): established on
//! request entry, accessible from any call site in that request's call
//! stack without explicit plumbing, released on exit. `tokio::task_local!`
//! gives exactly this scoping for free since axum runs each request in its
//! own task.

use chrono::{DateTime, Utc};
use std::future::Future;

#[derive(Debug, Clone)]
pub struct CorrelationContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub endpoint_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub auth_type: Option<String>,
    pub client_id: Option<String>,
}

impl CorrelationContext {
    pub fn new(request_id: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            path: path.into(),
            endpoint_id: None,
            start_time: Utc::now(),
            auth_type: None,
            client_id: None,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.start_time).num_milliseconds()
    }
}

tokio::task_local! {
    static CURRENT: CorrelationContext;
}

/// Bind `ctx` for the duration of `fut`; any log call inside `fut` (or any
/// function it calls, transitively) can read it via [`current`].
pub async fn scoped<F: Future>(ctx: CorrelationContext, fut: F) -> F::Output {
    CURRENT.scope(ctx, fut).await
}

/// Read the bound context, cloned, if one is bound at this call site.
pub fn current() -> Option<CorrelationContext> {
    CURRENT.try_with(|ctx| ctx.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scoped_context_is_visible_to_nested_calls() {
        assert!(current().is_none());
        let ctx = CorrelationContext::new("req-1", "GET", "/Users");
        scoped(ctx, async {
            let seen = current().expect("context should be bound inside scope");
            assert_eq!(seen.request_id, "req-1");
        })
        .await;
        assert!(current().is_none());
    }
}
