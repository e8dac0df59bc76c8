//! Repository port traits (spec §4.2–§4.9).
//!
//! Each trait is implemented twice in this crate ([`super::InMemoryStore`]
//! and [`super::SqliteStore`]); the orchestrator and admin layer depend only
//! on these traits, never on a concrete backend.

use crate::error::ScimResult;
use crate::protocol::patch::MemberSnapshot;
use crate::resource::{ResourceKind, ResourceRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::future::Future;

/// Fields supplied when creating a resource. `scim_id` is generated by the
/// caller (the orchestrator), not the store, so both implementations treat
/// it identically.
#[derive(Debug, Clone)]
pub struct ResourceInput {
    pub scim_id: String,
    pub external_id: Option<String>,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub active: Option<bool>,
    pub payload: Value,
}

/// Fields supplied when replacing or patching a resource. `None` leaves the
/// corresponding projected column untouched (a PUT always supplies every
/// field; a PATCH supplies only what the evaluator changed).
#[derive(Debug, Clone, Default)]
pub struct ResourceUpdate {
    pub external_id: Option<Option<String>>,
    pub user_name: Option<Option<String>>,
    pub display_name: Option<Option<String>>,
    pub active: Option<Option<bool>>,
    pub payload: Value,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub pushed: Option<crate::protocol::filter::PushedPredicate>,
    pub residual: Option<crate::protocol::filter::FilterNode>,
    pub start_index: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub items: Vec<ResourceRecord>,
    pub total_count: usize,
}

/// The resource repository contract (spec §4.2).
pub trait ResourceStore: Send + Sync {
    fn create(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        input: ResourceInput,
    ) -> impl Future<Output = ScimResult<ResourceRecord>> + Send;

    fn find_by_id(
        &self,
        tenant_id: &str,
        scim_id: &str,
    ) -> impl Future<Output = ScimResult<Option<ResourceRecord>>> + Send;

    fn find_by_user_name(
        &self,
        tenant_id: &str,
        user_name: &str,
    ) -> impl Future<Output = ScimResult<Option<ResourceRecord>>> + Send;

    fn find_by_external_id(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        external_id: &str,
    ) -> impl Future<Output = ScimResult<Option<ResourceRecord>>> + Send;

    fn query(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        options: QueryOptions,
    ) -> impl Future<Output = ScimResult<QueryResult>> + Send;

    /// Atomically apply `update`, bumping `version` by one. If
    /// `expected_version` is `Some` and does not match the stored version,
    /// fails with [`crate::error::ScimError::Mutability`] — the orchestrator
    /// relies on this for the CAS half of If-Match enforcement (spec §5).
    fn update(
        &self,
        tenant_id: &str,
        scim_id: &str,
        update: ResourceUpdate,
        expected_version: Option<i64>,
    ) -> impl Future<Output = ScimResult<ResourceRecord>> + Send;

    /// Removes the resource and, transitively, its memberships (as member or
    /// as group) — see [`MembershipStore`].
    fn delete(
        &self,
        tenant_id: &str,
        scim_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Fails with `uniqueness` if any of the non-null fields collide with an
    /// existing resource other than `exclude_scim_id`.
    fn assert_unique(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        user_name: Option<&str>,
        display_name: Option<&str>,
        external_id: Option<&str>,
        exclude_scim_id: Option<&str>,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Remove every resource, and by extension every membership touching
    /// them, for a tenant being deleted (spec §3.2 cascade).
    fn delete_all_for_tenant(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;
}

/// Group membership (spec §3.1 Membership entity).
pub trait MembershipStore: Send + Sync {
    fn add_members(
        &self,
        tenant_id: &str,
        group_scim_id: &str,
        members: &[MemberSnapshot],
    ) -> impl Future<Output = ScimResult<()>> + Send;

    fn remove_members(
        &self,
        tenant_id: &str,
        group_scim_id: &str,
        member_scim_ids: &[String],
    ) -> impl Future<Output = ScimResult<()>> + Send;

    fn replace_members(
        &self,
        tenant_id: &str,
        group_scim_id: &str,
        members: Vec<MemberSnapshot>,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    fn list_members(
        &self,
        tenant_id: &str,
        group_scim_id: &str,
    ) -> impl Future<Output = ScimResult<Vec<MemberSnapshot>>> + Send;

    /// Removes a deleted user from every group's membership set in its
    /// tenant.
    fn remove_member_everywhere(
        &self,
        tenant_id: &str,
        member_scim_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Removes all memberships for a deleted group.
    fn remove_group(
        &self,
        tenant_id: &str,
        group_scim_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    fn delete_all_for_tenant(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub active: bool,
    pub config: serde_json::Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointInput {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub active: bool,
    pub config: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointPatch {
    pub display_name: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
    pub config: Option<serde_json::Map<String, Value>>,
}

/// Tenant (endpoint) lifecycle (spec §3.2, §4.9).
pub trait TenantStore: Send + Sync {
    fn create_endpoint(
        &self,
        input: EndpointInput,
    ) -> impl Future<Output = ScimResult<EndpointRecord>> + Send;

    fn get_endpoint(
        &self,
        id: &str,
    ) -> impl Future<Output = ScimResult<Option<EndpointRecord>>> + Send;

    fn get_endpoint_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = ScimResult<Option<EndpointRecord>>> + Send;

    fn list_endpoints(
        &self,
        active_filter: Option<bool>,
    ) -> impl Future<Output = ScimResult<Vec<EndpointRecord>>> + Send;

    fn update_endpoint(
        &self,
        id: &str,
        patch: EndpointPatch,
    ) -> impl Future<Output = ScimResult<EndpointRecord>> + Send;

    /// Removes the endpoint row itself. Cascading deletes across resources,
    /// memberships, credentials, logs, and schemas is the admin layer's
    /// responsibility (it calls `delete_all_for_tenant` on every other
    /// store) so that no single port needs to know about the others.
    fn delete_endpoint(&self, id: &str) -> impl Future<Output = ScimResult<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: String,
    pub tenant_id: String,
    pub credential_type: String,
    pub salted_hash: String,
    pub salt: String,
    pub metadata: Option<Value>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CredentialInput {
    pub credential_type: String,
    pub salted_hash: String,
    pub salt: String,
    pub metadata: Option<Value>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-endpoint bearer authenticator storage (spec §3.1 Credential).
pub trait CredentialStore: Send + Sync {
    fn create_credential(
        &self,
        tenant_id: &str,
        input: CredentialInput,
    ) -> impl Future<Output = ScimResult<CredentialRecord>> + Send;

    fn list_credentials(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<Vec<CredentialRecord>>> + Send;

    fn delete_credential(
        &self,
        tenant_id: &str,
        credential_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Active, unexpired credentials for the guard to compare against (spec
    /// §4.5 step 5).
    fn find_active_unexpired(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = ScimResult<Vec<CredentialRecord>>> + Send;

    fn delete_all_for_tenant(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct SchemaRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub attributes: Value,
}

/// Per-tenant discovery metadata (spec §3.1 Schema/ResourceType, §4.4).
pub trait SchemaStore: Send + Sync {
    /// Populate the default core User/Group schemas for a newly created
    /// tenant (spec §3.1: "sourced from a seeded default set at endpoint
    /// creation").
    fn seed_defaults(&self, tenant_id: &str) -> impl Future<Output = ScimResult<()>> + Send;

    fn list_schemas(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<Vec<SchemaRecord>>> + Send;

    fn delete_all_for_tenant(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;
}
