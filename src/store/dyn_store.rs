//! Runtime-selected store backend: the binary picks in-memory or SQLite from
//! config at startup, but the router is built once, generic over a single
//! store type — so that one choice is wrapped here instead of duplicating
//! the whole server bring-up per backend.

use super::in_memory::InMemoryStore;
use super::ports::{
    CredentialInput, CredentialRecord, CredentialStore, EndpointInput, EndpointPatch,
    EndpointRecord, MembershipStore, QueryOptions, QueryResult, ResourceInput, ResourceStore,
    ResourceUpdate, SchemaRecord, SchemaStore, TenantStore,
};
use super::sqlite::SqliteStore;
use crate::error::ScimResult;
use crate::protocol::patch::MemberSnapshot;
use crate::resource::{ResourceKind, ResourceRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Clone)]
pub enum DynStore {
    InMemory(InMemoryStore),
    Sqlite(SqliteStore),
}

macro_rules! dispatch {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            DynStore::InMemory(s) => s.$method($($arg),*).await,
            DynStore::Sqlite(s) => s.$method($($arg),*).await,
        }
    };
}

impl ResourceStore for DynStore {
    async fn create(&self, tenant_id: &str, kind: ResourceKind, input: ResourceInput) -> ScimResult<ResourceRecord> {
        dispatch!(self, create(tenant_id, kind, input))
    }

    async fn find_by_id(&self, tenant_id: &str, scim_id: &str) -> ScimResult<Option<ResourceRecord>> {
        dispatch!(self, find_by_id(tenant_id, scim_id))
    }

    async fn find_by_user_name(&self, tenant_id: &str, user_name: &str) -> ScimResult<Option<ResourceRecord>> {
        dispatch!(self, find_by_user_name(tenant_id, user_name))
    }

    async fn find_by_external_id(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        external_id: &str,
    ) -> ScimResult<Option<ResourceRecord>> {
        dispatch!(self, find_by_external_id(tenant_id, kind, external_id))
    }

    async fn query(&self, tenant_id: &str, kind: ResourceKind, options: QueryOptions) -> ScimResult<QueryResult> {
        dispatch!(self, query(tenant_id, kind, options))
    }

    async fn update(
        &self,
        tenant_id: &str,
        scim_id: &str,
        update: ResourceUpdate,
        expected_version: Option<i64>,
    ) -> ScimResult<ResourceRecord> {
        dispatch!(self, update(tenant_id, scim_id, update, expected_version))
    }

    async fn delete(&self, tenant_id: &str, scim_id: &str) -> ScimResult<()> {
        dispatch!(self, delete(tenant_id, scim_id))
    }

    async fn assert_unique(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        user_name: Option<&str>,
        display_name: Option<&str>,
        external_id: Option<&str>,
        exclude_scim_id: Option<&str>,
    ) -> ScimResult<()> {
        dispatch!(self, assert_unique(tenant_id, kind, user_name, display_name, external_id, exclude_scim_id))
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        match self {
            DynStore::InMemory(s) => ResourceStore::delete_all_for_tenant(s, tenant_id).await,
            DynStore::Sqlite(s) => ResourceStore::delete_all_for_tenant(s, tenant_id).await,
        }
    }
}

impl MembershipStore for DynStore {
    async fn add_members(&self, tenant_id: &str, group_scim_id: &str, members: &[MemberSnapshot]) -> ScimResult<()> {
        dispatch!(self, add_members(tenant_id, group_scim_id, members))
    }

    async fn remove_members(&self, tenant_id: &str, group_scim_id: &str, member_scim_ids: &[String]) -> ScimResult<()> {
        dispatch!(self, remove_members(tenant_id, group_scim_id, member_scim_ids))
    }

    async fn replace_members(&self, tenant_id: &str, group_scim_id: &str, members: Vec<MemberSnapshot>) -> ScimResult<()> {
        dispatch!(self, replace_members(tenant_id, group_scim_id, members))
    }

    async fn list_members(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<Vec<MemberSnapshot>> {
        dispatch!(self, list_members(tenant_id, group_scim_id))
    }

    async fn remove_member_everywhere(&self, tenant_id: &str, member_scim_id: &str) -> ScimResult<()> {
        dispatch!(self, remove_member_everywhere(tenant_id, member_scim_id))
    }

    async fn remove_group(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<()> {
        dispatch!(self, remove_group(tenant_id, group_scim_id))
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        match self {
            DynStore::InMemory(s) => MembershipStore::delete_all_for_tenant(s, tenant_id).await,
            DynStore::Sqlite(s) => MembershipStore::delete_all_for_tenant(s, tenant_id).await,
        }
    }
}

impl TenantStore for DynStore {
    async fn create_endpoint(&self, input: EndpointInput) -> ScimResult<EndpointRecord> {
        dispatch!(self, create_endpoint(input))
    }

    async fn get_endpoint(&self, id: &str) -> ScimResult<Option<EndpointRecord>> {
        dispatch!(self, get_endpoint(id))
    }

    async fn get_endpoint_by_name(&self, name: &str) -> ScimResult<Option<EndpointRecord>> {
        dispatch!(self, get_endpoint_by_name(name))
    }

    async fn list_endpoints(&self, active_filter: Option<bool>) -> ScimResult<Vec<EndpointRecord>> {
        dispatch!(self, list_endpoints(active_filter))
    }

    async fn update_endpoint(&self, id: &str, patch: EndpointPatch) -> ScimResult<EndpointRecord> {
        dispatch!(self, update_endpoint(id, patch))
    }

    async fn delete_endpoint(&self, id: &str) -> ScimResult<()> {
        dispatch!(self, delete_endpoint(id))
    }
}

impl CredentialStore for DynStore {
    async fn create_credential(&self, tenant_id: &str, input: CredentialInput) -> ScimResult<CredentialRecord> {
        dispatch!(self, create_credential(tenant_id, input))
    }

    async fn list_credentials(&self, tenant_id: &str) -> ScimResult<Vec<CredentialRecord>> {
        dispatch!(self, list_credentials(tenant_id))
    }

    async fn delete_credential(&self, tenant_id: &str, credential_id: &str) -> ScimResult<()> {
        dispatch!(self, delete_credential(tenant_id, credential_id))
    }

    async fn find_active_unexpired(&self, tenant_id: &str, now: DateTime<Utc>) -> ScimResult<Vec<CredentialRecord>> {
        dispatch!(self, find_active_unexpired(tenant_id, now))
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        match self {
            DynStore::InMemory(s) => CredentialStore::delete_all_for_tenant(s, tenant_id).await,
            DynStore::Sqlite(s) => CredentialStore::delete_all_for_tenant(s, tenant_id).await,
        }
    }
}

impl SchemaStore for DynStore {
    async fn seed_defaults(&self, tenant_id: &str) -> ScimResult<()> {
        dispatch!(self, seed_defaults(tenant_id))
    }

    async fn list_schemas(&self, tenant_id: &str) -> ScimResult<Vec<SchemaRecord>> {
        dispatch!(self, list_schemas(tenant_id))
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        match self {
            DynStore::InMemory(s) => SchemaStore::delete_all_for_tenant(s, tenant_id).await,
            DynStore::Sqlite(s) => SchemaStore::delete_all_for_tenant(s, tenant_id).await,
        }
    }
}
