//! In-memory repository implementation (spec §4.2, teacher's
//! `multi_tenant/database.rs` in-memory harness generalized to a real
//! backend rather than a test double).
//!
//! All state lives behind `tokio::sync::RwLock`-guarded `HashMap`s keyed by
//! tenant id, then by resource kind where relevant. Case-insensitive
//! uniqueness is enforced by maintaining a lower-cased shadow key alongside
//! the primary index, per spec §4.2's instruction to implementations that
//! "cannot offer native case-insensitive uniqueness."

use super::ports::{
    CredentialInput, CredentialRecord, CredentialStore, EndpointInput, EndpointPatch,
    EndpointRecord, MembershipStore, QueryOptions, QueryResult, ResourceInput, ResourceStore,
    ResourceUpdate, SchemaRecord, SchemaStore, TenantStore,
};
use crate::error::{ScimError, ScimResult};
use crate::protocol::filter::evaluate_pushed;
use crate::protocol::patch::MemberSnapshot;
use crate::resource::{ResourceKind, ResourceRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct TenantResources {
    by_scim_id: HashMap<String, ResourceRecord>,
}

#[derive(Default)]
struct TenantMemberships {
    // group_scim_id -> members, insertion order preserved for deterministic listing.
    groups: HashMap<String, Vec<MemberSnapshot>>,
}

/// In-memory implementation of every repository port. Suitable for tests and
/// for deployments that accept losing state on restart (spec §1: physical
/// storage is pluggable).
#[derive(Default, Clone)]
pub struct InMemoryStore {
    resources: Arc<RwLock<HashMap<String, TenantResources>>>,
    memberships: Arc<RwLock<HashMap<String, TenantMemberships>>>,
    endpoints: Arc<RwLock<HashMap<String, EndpointRecord>>>,
    credentials: Arc<RwLock<HashMap<String, Vec<CredentialRecord>>>>,
    schemas: Arc<RwLock<HashMap<String, Vec<SchemaRecord>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_kind(record: &ResourceRecord, kind: ResourceKind) -> bool {
    record.kind == kind
}

fn collides(
    record: &ResourceRecord,
    kind: ResourceKind,
    user_name: Option<&str>,
    display_name: Option<&str>,
    external_id: Option<&str>,
    exclude_scim_id: Option<&str>,
) -> bool {
    if exclude_scim_id == Some(record.scim_id.as_str()) {
        return false;
    }
    if let Some(un) = user_name {
        if matches_kind(record, kind)
            && record
                .user_name
                .as_deref()
                .is_some_and(|existing| existing.eq_ignore_ascii_case(un))
        {
            return true;
        }
    }
    if let Some(dn) = display_name {
        if kind == ResourceKind::Group
            && matches_kind(record, kind)
            && record
                .display_name
                .as_deref()
                .is_some_and(|existing| existing.eq_ignore_ascii_case(dn))
        {
            return true;
        }
    }
    if let Some(ext) = external_id {
        if matches_kind(record, kind) && record.external_id.as_deref() == Some(ext) {
            return true;
        }
    }
    false
}

impl ResourceStore for InMemoryStore {
    async fn create(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        input: ResourceInput,
    ) -> ScimResult<ResourceRecord> {
        let mut guard = self.resources.write().await;
        let tenant = guard.entry(tenant_id.to_string()).or_default();
        if tenant.by_scim_id.contains_key(&input.scim_id) {
            return Err(ScimError::uniqueness(format!(
                "scimId '{}' already exists in this endpoint",
                input.scim_id
            )));
        }
        for existing in tenant.by_scim_id.values() {
            if collides(
                existing,
                kind,
                input.user_name.as_deref(),
                input.display_name.as_deref(),
                input.external_id.as_deref(),
                None,
            ) {
                return Err(ScimError::uniqueness(
                    "userName, displayName, or externalId already in use in this endpoint",
                ));
            }
        }
        let now = Utc::now();
        let record = ResourceRecord {
            endpoint_id: tenant_id.to_string(),
            scim_id: input.scim_id.clone(),
            kind,
            external_id: input.external_id,
            user_name: input.user_name,
            display_name: input.display_name,
            active: input.active,
            payload: input.payload,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tenant.by_scim_id.insert(input.scim_id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, tenant_id: &str, scim_id: &str) -> ScimResult<Option<ResourceRecord>> {
        let guard = self.resources.read().await;
        Ok(guard
            .get(tenant_id)
            .and_then(|t| t.by_scim_id.get(scim_id))
            .cloned())
    }

    async fn find_by_user_name(
        &self,
        tenant_id: &str,
        user_name: &str,
    ) -> ScimResult<Option<ResourceRecord>> {
        let guard = self.resources.read().await;
        Ok(guard.get(tenant_id).and_then(|t| {
            t.by_scim_id
                .values()
                .find(|r| r.user_name.as_deref().is_some_and(|u| u.eq_ignore_ascii_case(user_name)))
                .cloned()
        }))
    }

    async fn find_by_external_id(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        external_id: &str,
    ) -> ScimResult<Option<ResourceRecord>> {
        let guard = self.resources.read().await;
        Ok(guard.get(tenant_id).and_then(|t| {
            t.by_scim_id
                .values()
                .find(|r| r.kind == kind && r.external_id.as_deref() == Some(external_id))
                .cloned()
        }))
    }

    async fn query(&self, tenant_id: &str, kind: ResourceKind, options: QueryOptions) -> ScimResult<QueryResult> {
        let guard = self.resources.read().await;
        let mut matched: Vec<ResourceRecord> = guard
            .get(tenant_id)
            .map(|t| t.by_scim_id.values().filter(|r| r.kind == kind).cloned().collect())
            .unwrap_or_default();

        if let Some(pushed) = &options.pushed {
            matched.retain(|r| evaluate_pushed(pushed, r));
        }
        if let Some(residual) = &options.residual {
            matched.retain(|r| crate::protocol::filter::evaluate(residual, &r.payload));
        }
        matched.sort_by(|a, b| a.scim_id.cmp(&b.scim_id));

        let total_count = matched.len();
        let count = if options.count == 0 { total_count } else { options.count };
        let items = matched.into_iter().skip(options.start_index).take(count).collect();
        Ok(QueryResult { items, total_count })
    }

    async fn update(
        &self,
        tenant_id: &str,
        scim_id: &str,
        update: ResourceUpdate,
        expected_version: Option<i64>,
    ) -> ScimResult<ResourceRecord> {
        let mut guard = self.resources.write().await;
        let tenant = guard.get_mut(tenant_id).ok_or(ScimError::NotFound)?;
        let record = tenant.by_scim_id.get_mut(scim_id).ok_or(ScimError::NotFound)?;
        if let Some(expected) = expected_version {
            if record.version != expected {
                return Err(ScimError::mutability(format!(
                    "expected version {expected}, found {}",
                    record.version
                )));
            }
        }
        if let Some(v) = update.external_id {
            record.external_id = v;
        }
        if let Some(v) = update.user_name {
            record.user_name = v;
        }
        if let Some(v) = update.display_name {
            record.display_name = v;
        }
        if let Some(v) = update.active {
            record.active = v;
        }
        record.payload = update.payload;
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, tenant_id: &str, scim_id: &str) -> ScimResult<()> {
        let mut guard = self.resources.write().await;
        let tenant = guard.get_mut(tenant_id).ok_or(ScimError::NotFound)?;
        tenant.by_scim_id.remove(scim_id).ok_or(ScimError::NotFound)?;
        Ok(())
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
        let guard = self.resources.read().await;
        if let Some(tenant) = guard.get(tenant_id) {
            for existing in tenant.by_scim_id.values() {
                if collides(existing, kind, user_name, display_name, external_id, exclude_scim_id) {
                    return Err(ScimError::uniqueness(
                        "userName, displayName, or externalId already in use in this endpoint",
                    ));
                }
            }
        }
        Ok(())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        self.resources.write().await.remove(tenant_id);
        Ok(())
    }
}

impl MembershipStore for InMemoryStore {
    async fn add_members(&self, tenant_id: &str, group_scim_id: &str, members: &[MemberSnapshot]) -> ScimResult<()> {
        let mut guard = self.memberships.write().await;
        let tenant = guard.entry(tenant_id.to_string()).or_default();
        let existing = tenant.groups.entry(group_scim_id.to_string()).or_default();
        for m in members {
            if !existing.iter().any(|e| e.member_scim_id == m.member_scim_id) {
                existing.push(m.clone());
            }
        }
        Ok(())
    }

    async fn remove_members(&self, tenant_id: &str, group_scim_id: &str, member_scim_ids: &[String]) -> ScimResult<()> {
        let mut guard = self.memberships.write().await;
        if let Some(tenant) = guard.get_mut(tenant_id) {
            if let Some(existing) = tenant.groups.get_mut(group_scim_id) {
                existing.retain(|m| !member_scim_ids.contains(&m.member_scim_id));
            }
        }
        Ok(())
    }

    async fn replace_members(&self, tenant_id: &str, group_scim_id: &str, members: Vec<MemberSnapshot>) -> ScimResult<()> {
        let mut guard = self.memberships.write().await;
        let tenant = guard.entry(tenant_id.to_string()).or_default();
        tenant.groups.insert(group_scim_id.to_string(), members);
        Ok(())
    }

    async fn list_members(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<Vec<MemberSnapshot>> {
        let guard = self.memberships.read().await;
        Ok(guard
            .get(tenant_id)
            .and_then(|t| t.groups.get(group_scim_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_member_everywhere(&self, tenant_id: &str, member_scim_id: &str) -> ScimResult<()> {
        let mut guard = self.memberships.write().await;
        if let Some(tenant) = guard.get_mut(tenant_id) {
            for members in tenant.groups.values_mut() {
                members.retain(|m| m.member_scim_id != member_scim_id);
            }
        }
        Ok(())
    }

    async fn remove_group(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<()> {
        let mut guard = self.memberships.write().await;
        if let Some(tenant) = guard.get_mut(tenant_id) {
            tenant.groups.remove(group_scim_id);
        }
        Ok(())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        self.memberships.write().await.remove(tenant_id);
        Ok(())
    }
}

impl TenantStore for InMemoryStore {
    async fn create_endpoint(&self, input: EndpointInput) -> ScimResult<EndpointRecord> {
        let mut guard = self.endpoints.write().await;
        if guard.values().any(|e| e.name == input.name) {
            return Err(ScimError::uniqueness(format!("endpoint name '{}' already exists", input.name)));
        }
        let now = Utc::now();
        let record = EndpointRecord {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            active: input.active,
            config: input.config,
            created_at: now,
            updated_at: now,
        };
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_endpoint(&self, id: &str) -> ScimResult<Option<EndpointRecord>> {
        Ok(self.endpoints.read().await.get(id).cloned())
    }

    async fn get_endpoint_by_name(&self, name: &str) -> ScimResult<Option<EndpointRecord>> {
        Ok(self.endpoints.read().await.values().find(|e| e.name == name).cloned())
    }

    async fn list_endpoints(&self, active_filter: Option<bool>) -> ScimResult<Vec<EndpointRecord>> {
        let guard = self.endpoints.read().await;
        let mut items: Vec<EndpointRecord> = guard
            .values()
            .filter(|e| active_filter.is_none_or(|f| e.active == f))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn update_endpoint(&self, id: &str, patch: EndpointPatch) -> ScimResult<EndpointRecord> {
        let mut guard = self.endpoints.write().await;
        let record = guard.get_mut(id).ok_or(ScimError::NotFound)?;
        if let Some(v) = patch.display_name {
            record.display_name = v;
        }
        if let Some(v) = patch.description {
            record.description = v;
        }
        if let Some(v) = patch.active {
            record.active = v;
        }
        if let Some(v) = patch.config {
            record.config = v;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_endpoint(&self, id: &str) -> ScimResult<()> {
        self.endpoints.write().await.remove(id).ok_or(ScimError::NotFound)?;
        Ok(())
    }
}

impl CredentialStore for InMemoryStore {
    async fn create_credential(&self, tenant_id: &str, input: CredentialInput) -> ScimResult<CredentialRecord> {
        let mut guard = self.credentials.write().await;
        let record = CredentialRecord {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            credential_type: input.credential_type,
            salted_hash: input.salted_hash,
            salt: input.salt,
            metadata: input.metadata,
            active: input.active,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        guard.entry(tenant_id.to_string()).or_default().push(record.clone());
        Ok(record)
    }

    async fn list_credentials(&self, tenant_id: &str) -> ScimResult<Vec<CredentialRecord>> {
        Ok(self.credentials.read().await.get(tenant_id).cloned().unwrap_or_default())
    }

    async fn delete_credential(&self, tenant_id: &str, credential_id: &str) -> ScimResult<()> {
        let mut guard = self.credentials.write().await;
        if let Some(list) = guard.get_mut(tenant_id) {
            let before = list.len();
            list.retain(|c| c.id != credential_id);
            if list.len() == before {
                return Err(ScimError::NotFound);
            }
        }
        Ok(())
    }

    async fn find_active_unexpired(
        &self,
        tenant_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> ScimResult<Vec<CredentialRecord>> {
        Ok(self
            .credentials
            .read()
            .await
            .get(tenant_id)
            .map(|list| {
                list.iter()
                    .filter(|c| c.active && c.expires_at.is_none_or(|exp| exp > now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        self.credentials.write().await.remove(tenant_id);
        Ok(())
    }
}

impl SchemaStore for InMemoryStore {
    async fn seed_defaults(&self, tenant_id: &str) -> ScimResult<()> {
        let mut guard = self.schemas.write().await;
        guard.insert(tenant_id.to_string(), crate::core::discovery::default_schemas());
        Ok(())
    }

    async fn list_schemas(&self, tenant_id: &str) -> ScimResult<Vec<SchemaRecord>> {
        Ok(self.schemas.read().await.get(tenant_id).cloned().unwrap_or_default())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        self.schemas.write().await.remove(tenant_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(scim_id: &str, user_name: &str) -> ResourceInput {
        ResourceInput {
            scim_id: scim_id.to_string(),
            external_id: None,
            user_name: Some(user_name.to_string()),
            display_name: None,
            active: Some(true),
            payload: json!({"userName": user_name}),
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = InMemoryStore::new();
        let created = store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        assert_eq!(created.version, 1);
        let found = store.find_by_id("t1", "u1").await.unwrap().unwrap();
        assert_eq!(found.scim_id, "u1");
    }

    #[tokio::test]
    async fn case_insensitive_username_uniqueness() {
        let store = InMemoryStore::new();
        store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        let err = store.create("t1", ResourceKind::User, input("u2", "BJensen")).await.unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn tenant_isolation_allows_same_username() {
        let store = InMemoryStore::new();
        store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        let created = store.create("t2", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        assert_eq!(created.scim_id, "u1");
    }

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let store = InMemoryStore::new();
        store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        let update = ResourceUpdate {
            payload: json!({"userName": "bjensen"}),
            ..Default::default()
        };
        let err = store.update("t1", "u1", update, Some(99)).await.unwrap_err();
        assert_eq!(err.http_status(), 412);
    }

    #[tokio::test]
    async fn update_increments_version() {
        let store = InMemoryStore::new();
        store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        let update = ResourceUpdate {
            active: Some(Some(false)),
            payload: json!({"userName": "bjensen", "active": false}),
            ..Default::default()
        };
        let updated = store.update("t1", "u1", update, Some(1)).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.active, Some(false));
    }

    #[tokio::test]
    async fn delete_cascades_memberships() {
        let store = InMemoryStore::new();
        store
            .add_members(
                "t1",
                "g1",
                &[MemberSnapshot {
                    member_scim_id: "u1".into(),
                    display: None,
                    member_type: None,
                }],
            )
            .await
            .unwrap();
        store.remove_member_everywhere("t1", "u1").await.unwrap();
        let members = store.list_members("t1", "g1").await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn tenant_delete_removes_all_resources() {
        let store = InMemoryStore::new();
        store.create("t1", ResourceKind::User, input("u1", "bjensen")).await.unwrap();
        store.delete_all_for_tenant("t1").await.unwrap();
        assert!(store.find_by_id("t1", "u1").await.unwrap().is_none());
    }
}
