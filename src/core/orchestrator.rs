//! The resource orchestrator (spec §4.3): create / get / list / replace /
//! patch / delete, one code path parameterized by resource-type descriptor
//! rather than one service per resource type (teacher's "dispatch over
//! resource type" design note, already the shape of teacher's
//! `resource_handlers` module).

use crate::error::{ScimError, ScimResult};
use crate::protocol::extract;
use crate::protocol::filter::{self, PlannerCapabilities};
use crate::protocol::meta;
use crate::protocol::patch::{self, MemberSnapshot, MembershipOp, PatchConfig, PatchOperationInput};
use crate::resource::{ResourceKind, ResourceRecord, descriptor};
use crate::store::ports::{MembershipStore, QueryOptions, ResourceInput, ResourceStore, ResourceUpdate};
use serde_json::{Map, Value, json};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filter: Option<String>,
    /// 1-based, per RFC 7644 §3.4.2.4.
    pub start_index: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub items: Vec<ResourceRecord>,
    pub total_count: usize,
    pub start_index: usize,
}

/// Orchestrates the six SCIM resource operations over a store that
/// implements every port this layer needs. Generic rather than boxed/dyn —
/// there are exactly two store implementations, both known at compile time.
pub struct Orchestrator<S> {
    store: S,
    base_url: String,
}

impl<S> Orchestrator<S>
where
    S: ResourceStore + MembershipStore,
{
    pub fn new(store: S, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn validate_required_fields(&self, kind: ResourceKind, payload: &Value) -> ScimResult<()> {
        let d = descriptor(kind);
        for field in d.required_fields {
            let present = payload
                .get(*field)
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(ScimError::invalid_value(format!(
                    "'{field}' is required for {}",
                    d.type_name
                )));
            }
        }
        Ok(())
    }

    /// Render a stored record into the SCIM wire representation: the
    /// payload's top-level keys plus `id`, `schemas`, and `meta`.
    pub fn to_wire(&self, record: &ResourceRecord) -> Value {
        let d = descriptor(record.kind);
        let mut obj: Map<String, Value> = record
            .payload
            .as_object()
            .cloned()
            .unwrap_or_default();

        let mut schemas = vec![Value::String(d.default_schema_urn.to_string())];
        for key in obj.keys() {
            if key.starts_with("urn:") && !schemas.iter().any(|s| s == key) {
                schemas.push(Value::String(key.clone()));
            }
        }

        obj.insert("id".to_string(), Value::String(record.scim_id.clone()));
        obj.insert("schemas".to_string(), Value::Array(schemas));
        obj.insert(
            "meta".to_string(),
            serde_json::to_value(meta::build(record, &self.base_url)).unwrap_or(Value::Null),
        );
        Value::Object(obj)
    }

    pub async fn create(&self, tenant_id: &str, kind: ResourceKind, payload: Value) -> ScimResult<ResourceRecord> {
        self.validate_required_fields(kind, &payload)?;
        let extracted = extract::extract(&payload, kind);

        let scim_id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.store
            .assert_unique(
                tenant_id,
                kind,
                extracted.user_name.as_deref(),
                extracted.display_name.as_deref(),
                extracted.external_id.as_deref(),
                None,
            )
            .await?;

        self.store
            .create(
                tenant_id,
                kind,
                ResourceInput {
                    scim_id,
                    external_id: extracted.external_id,
                    user_name: extracted.user_name,
                    display_name: extracted.display_name,
                    active: extracted.active,
                    payload,
                },
            )
            .await
    }

    pub async fn get(&self, tenant_id: &str, scim_id: &str) -> ScimResult<ResourceRecord> {
        self.store.find_by_id(tenant_id, scim_id).await?.ok_or(ScimError::NotFound)
    }

    pub async fn list(&self, tenant_id: &str, kind: ResourceKind, params: ListParams) -> ScimResult<ListOutcome> {
        let (pushed, residual) = match &params.filter {
            Some(src) => {
                let node = filter::parse(src)?;
                let plan = filter::plan(&node, PlannerCapabilities::default());
                (plan.pushed, plan.residual)
            }
            None => (None, None),
        };
        let start_index = params.start_index.max(1);
        let result = self
            .store
            .query(
                tenant_id,
                kind,
                QueryOptions {
                    pushed,
                    residual,
                    start_index: start_index - 1,
                    count: params.count,
                },
            )
            .await?;
        Ok(ListOutcome {
            items: result.items,
            total_count: result.total_count,
            start_index,
        })
    }

    pub fn list_response_json(&self, outcome: &ListOutcome) -> Value {
        json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
            "totalResults": outcome.total_count,
            "startIndex": outcome.start_index,
            "itemsPerPage": outcome.items.len(),
            "Resources": outcome.items.iter().map(|r| self.to_wire(r)).collect::<Vec<_>>(),
        })
    }

    pub async fn replace(
        &self,
        tenant_id: &str,
        scim_id: &str,
        kind: ResourceKind,
        payload: Value,
        if_match_version: Option<i64>,
    ) -> ScimResult<ResourceRecord> {
        let current = self.get(tenant_id, scim_id).await?;
        if let Some(expected) = if_match_version {
            if current.version != expected {
                return Err(ScimError::mutability("If-Match precondition failed"));
            }
        }
        self.validate_required_fields(kind, &payload)?;
        let extracted = extract::extract(&payload, kind);
        self.store
            .assert_unique(
                tenant_id,
                kind,
                extracted.user_name.as_deref(),
                extracted.display_name.as_deref(),
                extracted.external_id.as_deref(),
                Some(scim_id),
            )
            .await?;
        self.store
            .update(
                tenant_id,
                scim_id,
                ResourceUpdate {
                    external_id: Some(extracted.external_id),
                    user_name: Some(extracted.user_name),
                    display_name: Some(extracted.display_name),
                    active: Some(extracted.active),
                    payload,
                },
                Some(current.version),
            )
            .await
    }

    /// Resolve a membership op's member ids into snapshots, failing if any
    /// referenced resource does not exist in this tenant — the
    /// "pre-resolve any external references" step of spec §4.3.3, performed
    /// before the write section.
    async fn resolve_members(&self, tenant_id: &str, ids: &[String]) -> ScimResult<Vec<MemberSnapshot>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let member = self
                .store
                .find_by_id(tenant_id, id)
                .await?
                .ok_or_else(|| ScimError::invalid_value(format!("member '{id}' does not exist in this endpoint")))?;
            out.push(MemberSnapshot {
                member_scim_id: member.scim_id,
                display: member.display_name.or(member.user_name),
                member_type: Some(member.kind.as_str().to_string()),
            });
        }
        Ok(out)
    }

    pub async fn patch(
        &self,
        tenant_id: &str,
        scim_id: &str,
        kind: ResourceKind,
        operations: &[PatchOperationInput],
        patch_config: &PatchConfig,
        if_match_version: Option<i64>,
    ) -> ScimResult<ResourceRecord> {
        let current = self.get(tenant_id, scim_id).await?;
        if let Some(expected) = if_match_version {
            if current.version != expected {
                return Err(ScimError::mutability("If-Match precondition failed"));
            }
        }

        let current_members = if kind == ResourceKind::Group {
            self.store.list_members(tenant_id, scim_id).await?
        } else {
            Vec::new()
        };

        let outcome = patch::apply_patch(&current.payload, operations, patch_config, kind, &current_members)?;

        // Pre-resolve any add targets before the write section (spec §5
        // pre-resolution discipline).
        let mut resolved_ops = Vec::with_capacity(outcome.membership_ops.len());
        for op in &outcome.membership_ops {
            resolved_ops.push(match op {
                MembershipOp::Add(ids) => ResolvedMembershipOp::Add(self.resolve_members(tenant_id, ids).await?),
                MembershipOp::Remove(ids) => ResolvedMembershipOp::Remove(ids.clone()),
                MembershipOp::ReplaceAll(ids) => {
                    ResolvedMembershipOp::ReplaceAll(self.resolve_members(tenant_id, ids).await?)
                }
            });
        }

        self.store
            .assert_unique(
                tenant_id,
                kind,
                outcome.extracted.user_name.as_deref(),
                outcome.extracted.display_name.as_deref(),
                outcome.extracted.external_id.as_deref(),
                Some(scim_id),
            )
            .await?;

        let updated = self
            .store
            .update(
                tenant_id,
                scim_id,
                ResourceUpdate {
                    external_id: Some(outcome.extracted.external_id),
                    user_name: Some(outcome.extracted.user_name),
                    display_name: Some(outcome.extracted.display_name),
                    active: Some(outcome.extracted.active),
                    payload: outcome.payload,
                },
                Some(current.version),
            )
            .await?;

        for op in resolved_ops {
            match op {
                ResolvedMembershipOp::Add(snapshots) => self.store.add_members(tenant_id, scim_id, &snapshots).await?,
                ResolvedMembershipOp::Remove(ids) => self.store.remove_members(tenant_id, scim_id, &ids).await?,
                ResolvedMembershipOp::ReplaceAll(snapshots) => {
                    self.store.replace_members(tenant_id, scim_id, snapshots).await?
                }
            }
        }

        Ok(updated)
    }

    pub async fn delete(&self, tenant_id: &str, scim_id: &str, kind: ResourceKind) -> ScimResult<()> {
        self.get(tenant_id, scim_id).await?;
        self.store.delete(tenant_id, scim_id).await?;
        match kind {
            ResourceKind::User => self.store.remove_member_everywhere(tenant_id, scim_id).await?,
            ResourceKind::Group => self.store.remove_group(tenant_id, scim_id).await?,
        }
        Ok(())
    }
}

enum ResolvedMembershipOp {
    Add(Vec<MemberSnapshot>),
    Remove(Vec<String>),
    ReplaceAll(Vec<MemberSnapshot>),
}
