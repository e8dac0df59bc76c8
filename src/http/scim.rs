//! SCIM-plane handlers: Users/Groups CRUD and discovery (spec §6.1).

use crate::core::discovery;
use crate::core::orchestrator::ListParams;
use crate::core::{AuthContext, patch_config_from_endpoint};
use crate::http::error::HttpScimError;
use crate::http::state::AppState;
use crate::observability::{Category, Level, RequestLogSink};
use crate::protocol::patch::PatchOperationInput;
use crate::resource::ResourceKind;
use crate::store::ports::{CredentialStore, MembershipStore, ResourceStore, SchemaStore, TenantStore};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

type Result<T> = std::result::Result<T, HttpScimError>;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
    #[serde(rename = "startIndex", default = "default_start_index")]
    pub start_index: usize,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_start_index() -> usize {
    1
}

fn default_count() -> usize {
    100
}

fn parse_if_match(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.trim_matches('"').strip_prefix("W/\"v").or_else(|| raw.strip_prefix("v")))
        .and_then(|s| s.trim_end_matches('"').parse::<i64>().ok())
}

fn if_none_match_equals(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|raw| raw == etag || raw == "*")
}

async fn load_endpoint_config<S>(state: &AppState<S, impl RequestLogSink>, endpoint_id: &str) -> Result<serde_json::Map<String, Value>>
where
    S: TenantStore + Clone,
{
    Ok(state
        .admin
        .get_endpoint(endpoint_id)
        .await
        .map_err(HttpScimError)?
        .config)
}

pub async fn create_resource<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, kind)): Path<(String, ResourceKindParam)>,
    Json(payload): Json<Value>,
) -> Result<Response>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let record = state.orchestrator.create(&endpoint_id, kind.0, payload).await.map_err(HttpScimError)?;
    state.logger.log(Level::Info, category_for(kind.0), format!("created {}", record.scim_id), None);
    let wire = state.orchestrator.to_wire(&record);
    let location = wire.get("meta").and_then(|m| m.get("location")).and_then(|l| l.as_str()).map(String::from);
    let mut response = (StatusCode::CREATED, Json(wire)).into_response();
    if let Ok(v) = header::HeaderValue::from_str(&record.etag()) {
        response.headers_mut().insert(header::ETAG, v);
    }
    if let Some(location) = location {
        if let Ok(v) = header::HeaderValue::from_str(&location) {
            response.headers_mut().insert(header::LOCATION, v);
        }
    }
    Ok(response)
}

pub async fn get_resource<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, _kind, resource_id)): Path<(String, ResourceKindParam, String)>,
    headers: HeaderMap,
) -> Result<Response>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let record = state.orchestrator.get(&endpoint_id, &resource_id).await.map_err(HttpScimError)?;
    let etag = record.etag();
    if if_none_match_equals(&headers, &etag) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(v) = header::HeaderValue::from_str(&etag) {
            response.headers_mut().insert(header::ETAG, v);
        }
        return Ok(response);
    }
    let wire = state.orchestrator.to_wire(&record);
    let mut response = (StatusCode::OK, Json(wire)).into_response();
    if let Ok(v) = header::HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, v);
    }
    Ok(response)
}

pub async fn list_resources<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, kind)): Path<(String, ResourceKindParam)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let outcome = state
        .orchestrator
        .list(
            &endpoint_id,
            kind.0,
            ListParams { filter: query.filter, start_index: query.start_index, count: query.count },
        )
        .await
        .map_err(HttpScimError)?;
    Ok(Json(state.orchestrator.list_response_json(&outcome)))
}

pub async fn replace_resource<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, kind, resource_id)): Path<(String, ResourceKindParam, String)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Response>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let if_match = parse_if_match(&headers);
    let record = state
        .orchestrator
        .replace(&endpoint_id, &resource_id, kind.0, payload, if_match)
        .await
        .map_err(HttpScimError)?;
    let wire = state.orchestrator.to_wire(&record);
    let mut response = (StatusCode::OK, Json(wire)).into_response();
    if let Ok(v) = header::HeaderValue::from_str(&record.etag()) {
        response.headers_mut().insert(header::ETAG, v);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct PatchRequestBody {
    #[serde(rename = "Operations")]
    pub operations: Vec<Value>,
}

pub async fn patch_resource<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, kind, resource_id)): Path<(String, ResourceKindParam, String)>,
    headers: HeaderMap,
    Json(body): Json<PatchRequestBody>,
) -> Result<Response>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let if_match = parse_if_match(&headers);
    let config = load_endpoint_config(&state, &endpoint_id).await?;
    let patch_config = patch_config_from_endpoint(&config);
    let operations = body
        .operations
        .iter()
        .map(PatchOperationInput::from_json)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(HttpScimError)?;

    let record = state
        .orchestrator
        .patch(&endpoint_id, &resource_id, kind.0, &operations, &patch_config, if_match)
        .await
        .map_err(HttpScimError)?;
    let wire = state.orchestrator.to_wire(&record);
    let mut response = (StatusCode::OK, Json(wire)).into_response();
    if let Ok(v) = header::HeaderValue::from_str(&record.etag()) {
        response.headers_mut().insert(header::ETAG, v);
    }
    Ok(response)
}

pub async fn delete_resource<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path((endpoint_id, kind, resource_id)): Path<(String, ResourceKindParam, String)>,
) -> Result<StatusCode>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    state.orchestrator.delete(&endpoint_id, &resource_id, kind.0).await.map_err(HttpScimError)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_schemas<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path(endpoint_id): Path<String>,
) -> Result<Json<Value>>
where
    S: TenantStore + SchemaStore + Clone,
    L: RequestLogSink,
{
    let schemas = state.store.list_schemas(&endpoint_id).await.map_err(HttpScimError)?;
    Ok(Json(serde_json::json!({ "schemas": schemas.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), "Resources": schemas })))
}

pub async fn list_resource_types(Extension(_auth): Extension<AuthContext>) -> Json<Value> {
    Json(serde_json::json!({ "Resources": discovery::resource_types() }))
}

pub async fn service_provider_config<S, L>(
    State(state): State<AppState<S, L>>,
    Extension(_auth): Extension<AuthContext>,
    Path(endpoint_id): Path<String>,
) -> Result<Json<Value>>
where
    S: TenantStore + Clone,
    L: RequestLogSink,
{
    let endpoint = state.admin.get_endpoint(&endpoint_id).await.map_err(HttpScimError)?;
    Ok(Json(discovery::service_provider_config(&endpoint)))
}

fn category_for(kind: ResourceKind) -> Category {
    match kind {
        ResourceKind::User => Category::ScimUser,
        ResourceKind::Group => Category::ScimGroup,
    }
}

/// Wraps [`ResourceKind`] so it can be parsed out of a `:kind` path segment
/// (`Users` / `Groups`) as an axum `Path` extractor component.
#[derive(Debug, Clone, Copy)]
pub struct ResourceKindParam(pub ResourceKind);

impl<'de> Deserialize<'de> for ResourceKindParam {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ResourceKind::from_path_segment(&raw)
            .map(ResourceKindParam)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown resource type '{raw}'")))
    }
}
