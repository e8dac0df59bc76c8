//! Admin-plane handlers (spec §4.9, §6.1): endpoint lifecycle, per-endpoint
//! credentials, and the log-config surface (level overrides, recent-entry
//! query, SSE tail, NDJSON/JSON download) backed by [`Logger`].

use crate::core::admin::empty_config;
use crate::http::error::HttpScimError;
use crate::http::state::AppState;
use crate::observability::{Category, Level, LogQuery};
use crate::store::ports::{
    CredentialStore, EndpointInput, EndpointPatch, MembershipStore, ResourceStore, SchemaStore, TenantStore,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;

type Result<T> = std::result::Result<T, HttpScimError>;

#[derive(Debug, Deserialize)]
pub struct CreateEndpointBody {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub config: Option<serde_json::Map<String, Value>>,
}

fn default_true() -> bool {
    true
}

pub async fn create_endpoint<S, L>(
    State(state): State<AppState<S, L>>,
    Json(body): Json<CreateEndpointBody>,
) -> Result<impl IntoResponse>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let endpoint = state
        .admin
        .create_endpoint(EndpointInput {
            name: body.name,
            display_name: body.display_name,
            description: body.description,
            active: body.active,
            config: body.config.unwrap_or_else(empty_config),
        })
        .await
        .map_err(HttpScimError)?;
    Ok((StatusCode::CREATED, Json(endpoint_wire(&endpoint))))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListEndpointsQuery {
    pub active: Option<bool>,
}

pub async fn list_endpoints<S, L>(
    State(state): State<AppState<S, L>>,
    Query(query): Query<ListEndpointsQuery>,
) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let endpoints = state.admin.list_endpoints(query.active).await.map_err(HttpScimError)?;
    Ok(Json(serde_json::json!({
        "Resources": endpoints.iter().map(endpoint_wire).collect::<Vec<_>>()
    })))
}

pub async fn get_endpoint<S, L>(State(state): State<AppState<S, L>>, Path(id): Path<String>) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let endpoint = state.admin.get_endpoint(&id).await.map_err(HttpScimError)?;
    Ok(Json(endpoint_wire(&endpoint)))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateEndpointBody {
    #[serde(default)]
    pub display_name: Option<Option<String>>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub config: Option<serde_json::Map<String, Value>>,
}

pub async fn update_endpoint<S, L>(
    State(state): State<AppState<S, L>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateEndpointBody>,
) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let endpoint = state
        .admin
        .update_endpoint(
            &id,
            EndpointPatch {
                display_name: body.display_name,
                description: body.description,
                active: body.active,
                config: body.config,
            },
        )
        .await
        .map_err(HttpScimError)?;
    Ok(Json(endpoint_wire(&endpoint)))
}

pub async fn delete_endpoint<S, L>(State(state): State<AppState<S, L>>, Path(id): Path<String>) -> Result<StatusCode>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    state.admin.delete_endpoint(&id).await.map_err(HttpScimError)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetConfigFlagBody {
    pub value: Value,
}

pub async fn set_config_flag<S, L>(
    State(state): State<AppState<S, L>>,
    Path((id, flag)): Path<(String, String)>,
    Json(body): Json<SetConfigFlagBody>,
) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let endpoint = state.admin.set_config_flag(&id, &flag, body.value).await.map_err(HttpScimError)?;
    Ok(Json(endpoint_wire(&endpoint)))
}

fn endpoint_wire(endpoint: &crate::store::ports::EndpointRecord) -> Value {
    serde_json::json!({
        "id": endpoint.id,
        "name": endpoint.name,
        "displayName": endpoint.display_name,
        "description": endpoint.description,
        "active": endpoint.active,
        "config": endpoint.config,
        "createdAt": endpoint.created_at,
        "updatedAt": endpoint.updated_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialBody {
    #[serde(rename = "type", default = "default_credential_type")]
    pub credential_type: String,
    pub token: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_credential_type() -> String {
    "bearer".to_string()
}

pub async fn create_credential<S, L>(
    State(state): State<AppState<S, L>>,
    Path(endpoint_id): Path<String>,
    Json(body): Json<CreateCredentialBody>,
) -> Result<impl IntoResponse>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let credential = state
        .admin
        .create_credential(&endpoint_id, body.credential_type, &body.token, body.metadata, body.expires_at)
        .await
        .map_err(HttpScimError)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": credential.id,
            "tenantId": credential.tenant_id,
            "type": credential.credential_type,
            "active": credential.active,
            "expiresAt": credential.expires_at,
            "createdAt": credential.created_at,
            // Returned exactly once: the store only ever keeps the salted hash.
            "token": body.token,
        })),
    ))
}

pub async fn list_credentials<S, L>(
    State(state): State<AppState<S, L>>,
    Path(endpoint_id): Path<String>,
) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    let credentials = state.admin.list_credentials(&endpoint_id).await.map_err(HttpScimError)?;
    Ok(Json(serde_json::json!({
        "Resources": credentials
            .iter()
            .map(|c| serde_json::json!({
                "id": c.id,
                "tenantId": c.tenant_id,
                "type": c.credential_type,
                "active": c.active,
                "expiresAt": c.expires_at,
                "createdAt": c.created_at,
            }))
            .collect::<Vec<_>>()
    })))
}

pub async fn delete_credential<S, L>(
    State(state): State<AppState<S, L>>,
    Path((endpoint_id, credential_id)): Path<(String, String)>,
) -> Result<StatusCode>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
{
    state.admin.delete_credential(&endpoint_id, &credential_id).await.map_err(HttpScimError)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetLevelBody {
    pub level: Level,
}

pub async fn set_global_level<S, L>(State(state): State<AppState<S, L>>, Json(body): Json<SetLevelBody>) -> StatusCode {
    state.logger.set_global_level(body.level);
    StatusCode::NO_CONTENT
}

pub async fn set_category_level<S, L>(
    State(state): State<AppState<S, L>>,
    Path(category): Path<String>,
    Json(body): Json<SetLevelBody>,
) -> Result<StatusCode> {
    let category: Category = category
        .parse()
        .map_err(|_| HttpScimError(crate::error::ScimError::invalid_value(format!("unknown log category '{category}'"))))?;
    state.logger.set_category_level(category, body.level);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_endpoint_level<S, L>(
    State(state): State<AppState<S, L>>,
    Path(endpoint_id): Path<String>,
    Json(body): Json<SetLevelBody>,
) -> StatusCode {
    state.logger.set_endpoint_level(&endpoint_id, body.level);
    StatusCode::NO_CONTENT
}

pub async fn clear_endpoint_level<S, L>(State(state): State<AppState<S, L>>, Path(endpoint_id): Path<String>) -> StatusCode {
    state.logger.clear_endpoint_level(&endpoint_id);
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentLogQuery {
    pub level: Option<Level>,
    pub category: Option<String>,
    pub request_id: Option<String>,
    pub endpoint_id: Option<String>,
}

fn to_log_query(q: RecentLogQuery) -> Result<LogQuery> {
    let category = q
        .category
        .as_deref()
        .map(|c| {
            c.parse::<Category>()
                .map_err(|_| HttpScimError(crate::error::ScimError::invalid_value(format!("unknown log category '{c}'"))))
        })
        .transpose()?;
    Ok(LogQuery { level: q.level, category, request_id: q.request_id, endpoint_id: q.endpoint_id })
}

pub async fn recent_logs<S, L>(State(state): State<AppState<S, L>>, Query(query): Query<RecentLogQuery>) -> Result<Json<Value>> {
    let filter = to_log_query(query)?;
    let entries = state.logger.query_recent(&filter);
    Ok(Json(serde_json::json!({ "Resources": entries })))
}

pub async fn clear_recent_logs<S, L>(State(state): State<AppState<S, L>>) -> StatusCode {
    state.logger.clear_recent();
    StatusCode::NO_CONTENT
}

pub async fn download_logs_ndjson<S, L>(
    State(state): State<AppState<S, L>>,
    Query(query): Query<RecentLogQuery>,
) -> Result<impl IntoResponse> {
    let filter = to_log_query(query)?;
    let body = state
        .logger
        .query_recent(&filter)
        .iter()
        .filter_map(|e| serde_json::to_string(e).ok())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(([(axum::http::header::CONTENT_TYPE, "application/x-ndjson")], body))
}

/// Live tail of new log entries as they're appended, independent of the
/// bounded `recent` query (spec §4.9 "stream").
pub async fn stream_logs<S, L>(
    State(state): State<AppState<S, L>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.logger.ring().subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(entry) => {
                    let event = Event::default().json_data(&entry).unwrap_or_else(|_| Event::default().data("{}"));
                    return Some((Ok(event), rx));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)))
}
