//! SCIM-plane content-type enforcement (spec §4.6), per-request
//! correlation-context binding and request-id echo (spec §5.2, §6.3), plus
//! the SCIM- and admin-plane auth guards.

use crate::core::authenticate;
use crate::http::error::HttpScimError;
use crate::http::state::AppState;
use crate::observability::{Category, CorrelationContext, Level, RequestLogRecord, context};
use crate::store::ports::{CredentialStore, TenantStore};
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json; charset=utf-8";

/// Enforces `Content-Type: application/scim+json` on every response from the
/// SCIM plane (spec §4.6). Scoped to the SCIM routes only — the admin plane's
/// observability endpoints (NDJSON download, SSE log stream) set their own
/// content types and must not be clobbered. `X-Request-Id` minting/echoing is
/// owned entirely by [`correlation`], which wraps both planes, so every layer
/// and log line agrees on the same id.
pub async fn enforce_scim_content_type(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(SCIM_CONTENT_TYPE));
    response
}

#[derive(Deserialize)]
struct EndpointParam {
    #[serde(rename = "endpoint_id")]
    endpoint_id: Option<String>,
}

/// Binds a [`CorrelationContext`] around the rest of the middleware stack
/// and the handler, then logs the request's outcome and enqueues a
/// buffered request-log record (spec §5.2–§5.3).
pub async fn correlation<S, L>(State(state): State<AppState<S, L>>, req: Request, next: Next) -> Response
where
    S: Clone,
    L: crate::observability::RequestLogSink,
{
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let endpoint_id = path_segment_after(&path, "endpoints");

    let mut ctx = CorrelationContext::new(request_id.clone(), method.clone(), path.clone());
    ctx.endpoint_id = endpoint_id.clone();

    let started = std::time::Instant::now();
    let mut response = context::scoped(ctx, next.run(req)).await;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    if elapsed_ms > 2000 {
        state.logger.log(
            Level::Warn,
            Category::Http,
            format!("slow request: {method} {path} took {elapsed_ms}ms"),
            None,
        );
    }

    state
        .request_log
        .enqueue(RequestLogRecord {
            request_id,
            endpoint_id,
            method,
            path,
            status: response.status().as_u16(),
            duration_ms: elapsed_ms,
            timestamp: chrono::Utc::now(),
        })
        .await;

    response
}

fn path_segment_after(path: &str, marker: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(seg) = segments.next() {
        if seg == marker {
            return segments.next().map(String::from);
        }
    }
    None
}

/// SCIM-plane authentication guard (spec §4.5), attached per-route so it
/// has the matched `endpoint_id` path parameter available.
pub async fn scim_auth<S, L>(
    State(state): State<AppState<S, L>>,
    Path(param): Path<EndpointParam>,
    headers: HeaderMap,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpScimError>
where
    S: TenantStore + CredentialStore + Clone,
{
    let endpoint_id = param.endpoint_id.unwrap_or_default();
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    match authenticate(&state.store, &state.store, &endpoint_id, authorization).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Err(err) => {
            state.logger.log(Level::Error, Category::Auth, err.detail(), None);
            Err(err.into())
        }
    }
}

/// Admin-plane authentication guard: a single bearer token distinct from
/// any tenant's SCIM credentials (spec §6.1).
pub async fn admin_auth<S, L>(
    State(state): State<AppState<S, L>>,
    headers: HeaderMap,
    req: Request,
    next: Next,
) -> Result<Response, HttpScimError>
where
    S: Clone,
{
    use crate::error::ScimError;
    use subtle::ConstantTimeEq;

    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(ScimError::unauthorized("admin plane is not configured").into());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    let Some(presented) = presented else {
        return Err(ScimError::unauthorized("missing bearer token").into());
    };
    let matches = expected.len() == presented.len() && expected.as_bytes().ct_eq(presented.as_bytes()).into();
    if matches {
        Ok(next.run(req).await)
    } else {
        Err(ScimError::unauthorized("invalid admin token").into())
    }
}
