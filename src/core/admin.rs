//! Admin-plane operations (spec §4.9, §6.1): endpoint lifecycle and
//! per-endpoint credential management. Everything under `/admin/*` goes
//! through this service rather than touching store ports directly, so
//! cascade-delete stays in one place instead of being re-derived by every
//! HTTP handler.

use crate::core::auth::hash_for_storage;
use crate::core::config_flags;
use crate::error::{ScimError, ScimResult};
use crate::observability::Logger;
use crate::store::ports::{
    CredentialInput, CredentialRecord, CredentialStore, EndpointInput, EndpointPatch,
    EndpointRecord, MembershipStore, ResourceStore, SchemaStore, TenantStore,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct AdminService<S> {
    store: S,
    logger: Arc<Logger>,
}

impl<S> AdminService<S>
where
    S: ResourceStore + MembershipStore + TenantStore + CredentialStore + SchemaStore,
{
    pub fn new(store: S, logger: Arc<Logger>) -> Self {
        Self { store, logger }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an endpoint and seeds its default schema set (spec §3.1: "a
    /// new endpoint is seeded with the default schema set at creation").
    /// `config.logLevel`, if present, is synchronized into the logger's
    /// endpoint-override map immediately (spec line 226).
    pub async fn create_endpoint(&self, input: EndpointInput) -> ScimResult<EndpointRecord> {
        config_flags::validate_config_write(&input.config)?;
        let endpoint = self.store.create_endpoint(input).await?;
        self.store.seed_defaults(&endpoint.id).await?;
        self.sync_log_level_override(&endpoint);
        Ok(endpoint)
    }

    pub async fn get_endpoint(&self, id: &str) -> ScimResult<EndpointRecord> {
        self.store.get_endpoint(id).await?.ok_or(ScimError::NotFound)
    }

    pub async fn list_endpoints(&self, active_filter: Option<bool>) -> ScimResult<Vec<EndpointRecord>> {
        self.store.list_endpoints(active_filter).await
    }

    pub async fn update_endpoint(&self, id: &str, patch: EndpointPatch) -> ScimResult<EndpointRecord> {
        if let Some(config) = &patch.config {
            config_flags::validate_config_write(config)?;
        }
        let endpoint = self.store.update_endpoint(id, patch).await?;
        self.sync_log_level_override(&endpoint);
        Ok(endpoint)
    }

    /// Pushes `config.logLevel` into the logger's endpoint-override map, or
    /// clears the override when the flag is absent.
    fn sync_log_level_override(&self, endpoint: &EndpointRecord) {
        match config_flags::log_level_override(&endpoint.config).and_then(|level| level.parse::<crate::observability::Level>().ok()) {
            Some(level) => self.logger.set_endpoint_level(&endpoint.id, level),
            None => self.logger.clear_endpoint_level(&endpoint.id),
        }
    }

    /// Deletes an endpoint and every row scoped to it, across every store
    /// port — the cascade spec §3.2 and §8.1 property 10 require, kept out
    /// of the individual port traits so none of them needs to know about
    /// its siblings.
    pub async fn delete_endpoint(&self, id: &str) -> ScimResult<()> {
        self.get_endpoint(id).await?;
        ResourceStore::delete_all_for_tenant(&self.store, id).await?;
        MembershipStore::delete_all_for_tenant(&self.store, id).await?;
        CredentialStore::delete_all_for_tenant(&self.store, id).await?;
        SchemaStore::delete_all_for_tenant(&self.store, id).await?;
        self.store.delete_endpoint(id).await
    }

    /// Mints a new credential: a random salt, a salted hash of the
    /// caller-supplied bearer token, and the plaintext token returned to the
    /// caller exactly once (it is never retrievable again — only the hash is
    /// stored, spec §3.1 Credential).
    pub async fn create_credential(
        &self,
        tenant_id: &str,
        credential_type: impl Into<String>,
        token: &str,
        metadata: Option<Value>,
        expires_at: Option<DateTime<Utc>>,
    ) -> ScimResult<CredentialRecord> {
        self.get_endpoint(tenant_id).await?;
        let salt = generate_salt();
        let salted_hash = hash_for_storage(&salt, token);
        self.store
            .create_credential(
                tenant_id,
                CredentialInput {
                    credential_type: credential_type.into(),
                    salted_hash,
                    salt,
                    metadata,
                    active: true,
                    expires_at,
                },
            )
            .await
    }

    pub async fn list_credentials(&self, tenant_id: &str) -> ScimResult<Vec<CredentialRecord>> {
        self.store.list_credentials(tenant_id).await
    }

    pub async fn delete_credential(&self, tenant_id: &str, credential_id: &str) -> ScimResult<()> {
        self.store.delete_credential(tenant_id, credential_id).await
    }

    pub async fn set_config_flag(&self, tenant_id: &str, flag: &str, value: Value) -> ScimResult<EndpointRecord> {
        if flag == config_flags::LOG_LEVEL {
            config_flags::validate_log_level_write(&value)?;
        } else {
            config_flags::validate_bool_flag_write(flag, &value)?;
        }
        let endpoint = self.get_endpoint(tenant_id).await?;
        let mut config = endpoint.config;
        config.insert(flag.to_string(), value);
        self.update_endpoint(
            tenant_id,
            EndpointPatch {
                config: Some(config),
                ..Default::default()
            },
        )
        .await
    }
}

/// 16 random bytes from a v4 UUID, base64-encoded — avoids pulling in a
/// dedicated RNG crate just for a salt when `uuid` already carries one.
fn generate_salt() -> String {
    use base64::Engine as _;
    let bytes = *uuid::Uuid::new_v4().as_bytes();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Re-exported so HTTP handlers can build a bare config map without reaching
/// into `serde_json` directly.
pub fn empty_config() -> Map<String, Value> {
    Map::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogConfig;
    use crate::store::InMemoryStore;

    fn admin() -> AdminService<InMemoryStore> {
        AdminService::new(InMemoryStore::new(), Arc::new(Logger::new(LogConfig::default(), 50)))
    }

    #[tokio::test]
    async fn create_endpoint_seeds_default_schemas() {
        let a = admin();
        let endpoint = a
            .create_endpoint(EndpointInput {
                name: "acme".into(),
                active: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let schemas = a.store().list_schemas(&endpoint.id).await.unwrap();
        assert_eq!(schemas.len(), 2);
    }

    #[tokio::test]
    async fn create_endpoint_rejects_garbage_flag() {
        let a = admin();
        let mut config = Map::new();
        config.insert("VerbosePatchSupported".into(), serde_json::json!("maybe"));
        let err = a
            .create_endpoint(EndpointInput {
                name: "acme".into(),
                active: true,
                config,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn create_endpoint_rejects_garbage_log_level() {
        let a = admin();
        let mut config = Map::new();
        config.insert("logLevel".into(), serde_json::json!("louder"));
        let err = a
            .create_endpoint(EndpointInput {
                name: "acme".into(),
                active: true,
                config,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn set_config_flag_log_level_is_pushed_into_the_logger_override_map() {
        use crate::observability::Level;

        let a = admin();
        let endpoint = a
            .create_endpoint(EndpointInput { name: "acme".into(), active: true, ..Default::default() })
            .await
            .unwrap();

        a.set_config_flag(&endpoint.id, "logLevel", serde_json::json!("error")).await.unwrap();
        assert_eq!(a.logger.config().endpoint_overrides.get(&endpoint.id), Some(&Level::Error));

        // clearing the flag drops the override entirely.
        a.update_endpoint(&endpoint.id, EndpointPatch { config: Some(Map::new()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(a.logger.config().endpoint_overrides.get(&endpoint.id), None);
    }

    #[tokio::test]
    async fn delete_endpoint_cascades_credentials() {
        let a = admin();
        let endpoint = a
            .create_endpoint(EndpointInput {
                name: "acme".into(),
                active: true,
                ..Default::default()
            })
            .await
            .unwrap();
        a.create_credential(&endpoint.id, "bearer", "tok123", None, None).await.unwrap();
        a.delete_endpoint(&endpoint.id).await.unwrap();
        assert!(a.get_endpoint(&endpoint.id).await.is_err());
    }

    #[tokio::test]
    async fn credential_round_trips_through_constant_time_auth() {
        let a = admin();
        let endpoint = a
            .create_endpoint(EndpointInput {
                name: "acme".into(),
                active: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let cred = a.create_credential(&endpoint.id, "bearer", "s3cr3t", None, None).await.unwrap();
        let ctx = crate::core::auth::authenticate(
            a.store(),
            a.store(),
            &endpoint.id,
            Some("Bearer s3cr3t"),
        )
        .await
        .unwrap();
        assert_eq!(ctx.credential_id, cred.id);
    }
}
