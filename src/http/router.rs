//! Builds the axum [`Router`] over an [`AppState`], wiring the SCIM and
//! admin planes each through their own auth guard. The correlation layer
//! wraps both planes; content-type enforcement wraps the SCIM plane only
//! so the admin plane's observability endpoints keep their own media types
//! (spec §4.6, §6).

use crate::http::state::AppState;
use crate::http::{admin, middleware as mw, scim};
use crate::observability::RequestLogSink;
use crate::store::ports::{CredentialStore, MembershipStore, ResourceStore, SchemaStore, TenantStore};
use axum::routing::{delete, get, post, put};
use axum::Router;

pub fn build<S, L>(state: AppState<S, L>) -> Router
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore + Clone + Send + Sync + 'static,
    L: RequestLogSink,
{
    let scim_routes = Router::new()
        .route(
            "/endpoints/:endpoint_id/:kind",
            post(scim::create_resource::<S, L>).get(scim::list_resources::<S, L>),
        )
        .route(
            "/endpoints/:endpoint_id/:kind/:resource_id",
            get(scim::get_resource::<S, L>)
                .put(scim::replace_resource::<S, L>)
                .patch(scim::patch_resource::<S, L>)
                .delete(scim::delete_resource::<S, L>),
        )
        .route("/endpoints/:endpoint_id/Schemas", get(scim::list_schemas::<S, L>))
        .route("/endpoints/:endpoint_id/ResourceTypes", get(scim::list_resource_types))
        .route(
            "/endpoints/:endpoint_id/ServiceProviderConfig",
            get(scim::service_provider_config::<S, L>),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), mw::scim_auth::<S, L>))
        .layer(axum::middleware::from_fn(mw::enforce_scim_content_type));

    let admin_endpoints = Router::new()
        .route("/endpoints", post(admin::create_endpoint::<S, L>).get(admin::list_endpoints::<S, L>))
        .route(
            "/endpoints/:id",
            get(admin::get_endpoint::<S, L>).put(admin::update_endpoint::<S, L>).delete(admin::delete_endpoint::<S, L>),
        )
        .route("/endpoints/:id/config/:flag", put(admin::set_config_flag::<S, L>))
        .route(
            "/endpoints/:endpoint_id/credentials",
            post(admin::create_credential::<S, L>).get(admin::list_credentials::<S, L>),
        )
        .route(
            "/endpoints/:endpoint_id/credentials/:credential_id",
            delete(admin::delete_credential::<S, L>),
        );

    let admin_logs = Router::new()
        .route("/log-config/level", put(admin::set_global_level::<S, L>))
        .route("/log-config/category/:category", put(admin::set_category_level::<S, L>))
        .route(
            "/log-config/endpoint/:endpoint_id",
            put(admin::set_endpoint_level::<S, L>).delete(admin::clear_endpoint_level::<S, L>),
        )
        .route(
            "/log-config/recent",
            get(admin::recent_logs::<S, L>).delete(admin::clear_recent_logs::<S, L>),
        )
        .route("/log-config/recent/download", get(admin::download_logs_ndjson::<S, L>))
        .route("/log-config/stream", get(admin::stream_logs::<S, L>));

    let admin_routes = Router::new()
        .merge(admin_endpoints)
        .merge(admin_logs)
        .layer(axum::middleware::from_fn_with_state(state.clone(), mw::admin_auth::<S, L>));

    Router::new()
        .merge(scim_routes)
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), mw::correlation::<S, L>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
