//! SQLite-backed repository implementation (spec §1, §4.2).
//!
//! Payloads are stored as a JSON text column; projected fields get their own
//! indexed columns so `query()` can push simple predicates down to SQL
//! (grounded on the ambient pack's `loom-server-db` repository style —
//! `sqlx::SqlitePool` plus hand-written `CREATE TABLE` DDL rather than a
//! migration framework, since this crate has no build-time database to
//! point a migrator at).

use super::ports::{
    CredentialInput, CredentialRecord, CredentialStore, EndpointInput, EndpointPatch,
    EndpointRecord, MembershipStore, QueryOptions, QueryResult, ResourceInput, ResourceStore,
    ResourceUpdate, SchemaRecord, SchemaStore, TenantStore,
};
use crate::error::{ScimError, ScimResult};
use crate::protocol::filter::evaluate_pushed;
use crate::protocol::patch::MemberSnapshot;
use crate::resource::{ResourceKind, ResourceRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, sqlite::SqlitePool};

/// SQLite-backed store. Holds a single shared `SqlitePool`; all five
/// repository ports are implemented on this one type, matching the
/// in-memory store's shape so the orchestrator can be generic over either.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn store_err(e: sqlx::Error) -> ScimError {
    ScimError::Store(Box::new(e))
}

impl SqliteStore {
    pub async fn connect(dsn: &str) -> ScimResult<Self> {
        let pool = SqlitePool::connect(dsn).await.map_err(store_err)?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> ScimResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                tenant_id TEXT NOT NULL,
                scim_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                external_id TEXT,
                user_name TEXT,
                user_name_lower TEXT,
                display_name TEXT,
                display_name_lower TEXT,
                active INTEGER,
                payload TEXT NOT NULL,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, scim_id)
            );
            CREATE TABLE IF NOT EXISTS memberships (
                tenant_id TEXT NOT NULL,
                group_scim_id TEXT NOT NULL,
                member_scim_id TEXT NOT NULL,
                display TEXT,
                member_type TEXT,
                PRIMARY KEY (tenant_id, group_scim_id, member_scim_id)
            );
            CREATE TABLE IF NOT EXISTS endpoints (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT,
                description TEXT,
                active INTEGER NOT NULL,
                config TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS credentials (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                credential_type TEXT NOT NULL,
                salted_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                metadata TEXT,
                active INTEGER NOT NULL,
                expires_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS schemas (
                tenant_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                attributes TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> ScimResult<ResourceRecord> {
        let kind_str: String = row.try_get("kind").map_err(store_err)?;
        let kind = if kind_str == "User" {
            ResourceKind::User
        } else {
            ResourceKind::Group
        };
        let payload_str: String = row.try_get("payload").map_err(store_err)?;
        let payload: Value = serde_json::from_str(&payload_str)?;
        Ok(ResourceRecord {
            endpoint_id: row.try_get("tenant_id").map_err(store_err)?,
            scim_id: row.try_get("scim_id").map_err(store_err)?,
            kind,
            external_id: row.try_get("external_id").map_err(store_err)?,
            user_name: row.try_get("user_name").map_err(store_err)?,
            display_name: row.try_get("display_name").map_err(store_err)?,
            active: row
                .try_get::<Option<i64>, _>("active")
                .map_err(store_err)?
                .map(|v| v != 0),
            payload,
            version: row.try_get("version").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
            updated_at: row.try_get("updated_at").map_err(store_err)?,
        })
    }
}

impl ResourceStore for SqliteStore {
    async fn create(&self, tenant_id: &str, kind: ResourceKind, input: ResourceInput) -> ScimResult<ResourceRecord> {
        self.assert_unique(
            tenant_id,
            kind,
            input.user_name.as_deref(),
            input.display_name.as_deref(),
            input.external_id.as_deref(),
            None,
        )
        .await?;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO resources (tenant_id, scim_id, kind, external_id, user_name, user_name_lower, \
             display_name, display_name_lower, active, payload, version, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(tenant_id)
        .bind(&input.scim_id)
        .bind(kind.as_str())
        .bind(&input.external_id)
        .bind(&input.user_name)
        .bind(input.user_name.as_ref().map(|s| s.to_ascii_lowercase()))
        .bind(&input.display_name)
        .bind(input.display_name.as_ref().map(|s| s.to_ascii_lowercase()))
        .bind(input.active.map(|b| b as i64))
        .bind(serde_json::to_string(&input.payload)?)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ScimError::uniqueness(format!("scimId '{}' already exists in this endpoint", input.scim_id))
            }
            other => store_err(other),
        })?;
        self.find_by_id(tenant_id, &input.scim_id)
            .await?
            .ok_or_else(|| ScimError::Internal("row vanished immediately after insert".into()))
    }

    async fn find_by_id(&self, tenant_id: &str, scim_id: &str) -> ScimResult<Option<ResourceRecord>> {
        let row = sqlx::query("SELECT * FROM resources WHERE tenant_id = ? AND scim_id = ?")
            .bind(tenant_id)
            .bind(scim_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_by_user_name(&self, tenant_id: &str, user_name: &str) -> ScimResult<Option<ResourceRecord>> {
        let row = sqlx::query("SELECT * FROM resources WHERE tenant_id = ? AND user_name_lower = ?")
            .bind(tenant_id)
            .bind(user_name.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_by_external_id(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        external_id: &str,
    ) -> ScimResult<Option<ResourceRecord>> {
        let row = sqlx::query("SELECT * FROM resources WHERE tenant_id = ? AND kind = ? AND external_id = ?")
            .bind(tenant_id)
            .bind(kind.as_str())
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    /// The SQLite backend does not advertise structured-payload query
    /// support (spec §4.1.2), so dotted/URN filters always arrive here as a
    /// full-scan residual rather than a pushed predicate; only the
    /// projected-column comparisons in `options.pushed` are ever present.
    async fn query(&self, tenant_id: &str, kind: ResourceKind, options: QueryOptions) -> ScimResult<QueryResult> {
        let rows = sqlx::query("SELECT * FROM resources WHERE tenant_id = ? AND kind = ? ORDER BY scim_id")
            .bind(tenant_id)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        let mut matched = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<ScimResult<Vec<_>>>()?;
        if let Some(pushed) = &options.pushed {
            matched.retain(|r| evaluate_pushed(pushed, r));
        }
        if let Some(residual) = &options.residual {
            matched.retain(|r| crate::protocol::filter::evaluate(residual, &r.payload));
        }
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
        let current = self
            .find_by_id(tenant_id, scim_id)
            .await?
            .ok_or(ScimError::NotFound)?;
        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(ScimError::mutability(format!(
                    "expected version {expected}, found {}",
                    current.version
                )));
            }
        }
        let external_id = update.external_id.unwrap_or(current.external_id);
        let user_name = update.user_name.unwrap_or(current.user_name);
        let display_name = update.display_name.unwrap_or(current.display_name);
        let active = update.active.unwrap_or(current.active);
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE resources SET external_id = ?, user_name = ?, user_name_lower = ?, display_name = ?, \
             display_name_lower = ?, active = ?, payload = ?, version = version + 1, updated_at = ? \
             WHERE tenant_id = ? AND scim_id = ? AND version = ?",
        )
        .bind(&external_id)
        .bind(&user_name)
        .bind(user_name.as_ref().map(|s| s.to_ascii_lowercase()))
        .bind(&display_name)
        .bind(display_name.as_ref().map(|s| s.to_ascii_lowercase()))
        .bind(active.map(|b| b as i64))
        .bind(serde_json::to_string(&update.payload)?)
        .bind(now.to_rfc3339())
        .bind(tenant_id)
        .bind(scim_id)
        .bind(current.version)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(ScimError::mutability("resource was modified concurrently"));
        }
        self.find_by_id(tenant_id, scim_id)
            .await?
            .ok_or(ScimError::NotFound)
    }

    async fn delete(&self, tenant_id: &str, scim_id: &str) -> ScimResult<()> {
        let result = sqlx::query("DELETE FROM resources WHERE tenant_id = ? AND scim_id = ?")
            .bind(tenant_id)
            .bind(scim_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(ScimError::NotFound);
        }
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
        if let Some(un) = user_name {
            let row = sqlx::query(
                "SELECT scim_id FROM resources WHERE tenant_id = ? AND user_name_lower = ? AND scim_id != ?",
            )
            .bind(tenant_id)
            .bind(un.to_ascii_lowercase())
            .bind(exclude_scim_id.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
            if row.is_some() {
                return Err(ScimError::uniqueness("userName already in use in this endpoint"));
            }
        }
        if kind == ResourceKind::Group {
            if let Some(dn) = display_name {
                let row = sqlx::query(
                    "SELECT scim_id FROM resources WHERE tenant_id = ? AND kind = 'Group' AND display_name_lower = ? AND scim_id != ?",
                )
                .bind(tenant_id)
                .bind(dn.to_ascii_lowercase())
                .bind(exclude_scim_id.unwrap_or(""))
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
                if row.is_some() {
                    return Err(ScimError::uniqueness("displayName already in use in this endpoint"));
                }
            }
        }
        if let Some(ext) = external_id {
            let row = sqlx::query(
                "SELECT scim_id FROM resources WHERE tenant_id = ? AND kind = ? AND external_id = ? AND scim_id != ?",
            )
            .bind(tenant_id)
            .bind(kind.as_str())
            .bind(ext)
            .bind(exclude_scim_id.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
            if row.is_some() {
                return Err(ScimError::uniqueness("externalId already in use in this endpoint"));
            }
        }
        Ok(())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM resources WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

impl MembershipStore for SqliteStore {
    async fn add_members(&self, tenant_id: &str, group_scim_id: &str, members: &[MemberSnapshot]) -> ScimResult<()> {
        for m in members {
            sqlx::query(
                "INSERT OR IGNORE INTO memberships (tenant_id, group_scim_id, member_scim_id, display, member_type) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(tenant_id)
            .bind(group_scim_id)
            .bind(&m.member_scim_id)
            .bind(&m.display)
            .bind(&m.member_type)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        }
        Ok(())
    }

    async fn remove_members(&self, tenant_id: &str, group_scim_id: &str, member_scim_ids: &[String]) -> ScimResult<()> {
        for id in member_scim_ids {
            sqlx::query("DELETE FROM memberships WHERE tenant_id = ? AND group_scim_id = ? AND member_scim_id = ?")
                .bind(tenant_id)
                .bind(group_scim_id)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        }
        Ok(())
    }

    async fn replace_members(&self, tenant_id: &str, group_scim_id: &str, members: Vec<MemberSnapshot>) -> ScimResult<()> {
        sqlx::query("DELETE FROM memberships WHERE tenant_id = ? AND group_scim_id = ?")
            .bind(tenant_id)
            .bind(group_scim_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        self.add_members(tenant_id, group_scim_id, &members).await
    }

    async fn list_members(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<Vec<MemberSnapshot>> {
        let rows = sqlx::query(
            "SELECT member_scim_id, display, member_type FROM memberships WHERE tenant_id = ? AND group_scim_id = ?",
        )
        .bind(tenant_id)
        .bind(group_scim_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter()
            .map(|r| {
                Ok(MemberSnapshot {
                    member_scim_id: r.try_get("member_scim_id").map_err(store_err)?,
                    display: r.try_get("display").map_err(store_err)?,
                    member_type: r.try_get("member_type").map_err(store_err)?,
                })
            })
            .collect()
    }

    async fn remove_member_everywhere(&self, tenant_id: &str, member_scim_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM memberships WHERE tenant_id = ? AND member_scim_id = ?")
            .bind(tenant_id)
            .bind(member_scim_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn remove_group(&self, tenant_id: &str, group_scim_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM memberships WHERE tenant_id = ? AND group_scim_id = ?")
            .bind(tenant_id)
            .bind(group_scim_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM memberships WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn row_to_endpoint(row: &sqlx::sqlite::SqliteRow) -> ScimResult<EndpointRecord> {
    let config_str: String = row.try_get("config").map_err(store_err)?;
    Ok(EndpointRecord {
        id: row.try_get("id").map_err(store_err)?,
        name: row.try_get("name").map_err(store_err)?,
        display_name: row.try_get("display_name").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        active: row.try_get::<i64, _>("active").map_err(store_err)? != 0,
        config: serde_json::from_str(&config_str)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

impl TenantStore for SqliteStore {
    async fn create_endpoint(&self, input: EndpointInput) -> ScimResult<EndpointRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO endpoints (id, name, display_name, description, active, config, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(input.active as i64)
        .bind(serde_json::to_string(&Value::Object(input.config))?)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ScimError::uniqueness(format!("endpoint name '{}' already exists", input.name))
            }
            other => store_err(other),
        })?;
        self.get_endpoint(&id)
            .await?
            .ok_or_else(|| ScimError::Internal("row vanished immediately after insert".into()))
    }

    async fn get_endpoint(&self, id: &str) -> ScimResult<Option<EndpointRecord>> {
        let row = sqlx::query("SELECT * FROM endpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_endpoint).transpose()
    }

    async fn get_endpoint_by_name(&self, name: &str) -> ScimResult<Option<EndpointRecord>> {
        let row = sqlx::query("SELECT * FROM endpoints WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_endpoint).transpose()
    }

    async fn list_endpoints(&self, active_filter: Option<bool>) -> ScimResult<Vec<EndpointRecord>> {
        let rows = match active_filter {
            Some(active) => sqlx::query("SELECT * FROM endpoints WHERE active = ? ORDER BY created_at")
                .bind(active as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?,
            None => sqlx::query("SELECT * FROM endpoints ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?,
        };
        rows.iter().map(row_to_endpoint).collect()
    }

    async fn update_endpoint(&self, id: &str, patch: EndpointPatch) -> ScimResult<EndpointRecord> {
        let current = self.get_endpoint(id).await?.ok_or(ScimError::NotFound)?;
        let display_name = patch.display_name.unwrap_or(current.display_name);
        let description = patch.description.unwrap_or(current.description);
        let active = patch.active.unwrap_or(current.active);
        let config = patch.config.unwrap_or(current.config);
        sqlx::query(
            "UPDATE endpoints SET display_name = ?, description = ?, active = ?, config = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&display_name)
        .bind(&description)
        .bind(active as i64)
        .bind(serde_json::to_string(&Value::Object(config))?)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        self.get_endpoint(id).await?.ok_or(ScimError::NotFound)
    }

    async fn delete_endpoint(&self, id: &str) -> ScimResult<()> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(ScimError::NotFound);
        }
        Ok(())
    }
}

impl CredentialStore for SqliteStore {
    async fn create_credential(&self, tenant_id: &str, input: CredentialInput) -> ScimResult<CredentialRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO credentials (id, tenant_id, credential_type, salted_hash, salt, metadata, active, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(&input.credential_type)
        .bind(&input.salted_hash)
        .bind(&input.salt)
        .bind(input.metadata.as_ref().map(|v| v.to_string()))
        .bind(input.active as i64)
        .bind(input.expires_at.map(|d| d.to_rfc3339()))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(CredentialRecord {
            id,
            tenant_id: tenant_id.to_string(),
            credential_type: input.credential_type,
            salted_hash: input.salted_hash,
            salt: input.salt,
            metadata: input.metadata,
            active: input.active,
            expires_at: input.expires_at,
            created_at,
        })
    }

    async fn list_credentials(&self, tenant_id: &str) -> ScimResult<Vec<CredentialRecord>> {
        let rows = sqlx::query("SELECT * FROM credentials WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_credential).collect()
    }

    async fn delete_credential(&self, tenant_id: &str, credential_id: &str) -> ScimResult<()> {
        let result = sqlx::query("DELETE FROM credentials WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id)
            .bind(credential_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(ScimError::NotFound);
        }
        Ok(())
    }

    async fn find_active_unexpired(&self, tenant_id: &str, now: DateTime<Utc>) -> ScimResult<Vec<CredentialRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM credentials WHERE tenant_id = ? AND active = 1 AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(tenant_id)
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_credential).collect()
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM credentials WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn row_to_credential(row: &sqlx::sqlite::SqliteRow) -> ScimResult<CredentialRecord> {
    let metadata_str: Option<String> = row.try_get("metadata").map_err(store_err)?;
    Ok(CredentialRecord {
        id: row.try_get("id").map_err(store_err)?,
        tenant_id: row.try_get("tenant_id").map_err(store_err)?,
        credential_type: row.try_get("credential_type").map_err(store_err)?,
        salted_hash: row.try_get("salted_hash").map_err(store_err)?,
        salt: row.try_get("salt").map_err(store_err)?,
        metadata: metadata_str.map(|s| serde_json::from_str(&s)).transpose()?,
        active: row.try_get::<i64, _>("active").map_err(store_err)? != 0,
        expires_at: row.try_get("expires_at").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

impl SchemaStore for SqliteStore {
    async fn seed_defaults(&self, tenant_id: &str) -> ScimResult<()> {
        for schema in crate::core::discovery::default_schemas() {
            sqlx::query(
                "INSERT OR REPLACE INTO schemas (tenant_id, id, name, description, attributes) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(tenant_id)
            .bind(&schema.id)
            .bind(&schema.name)
            .bind(&schema.description)
            .bind(serde_json::to_string(&schema.attributes)?)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        }
        Ok(())
    }

    async fn list_schemas(&self, tenant_id: &str) -> ScimResult<Vec<SchemaRecord>> {
        let rows = sqlx::query("SELECT * FROM schemas WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter()
            .map(|r| {
                let attrs: String = r.try_get("attributes").map_err(store_err)?;
                Ok(SchemaRecord {
                    id: r.try_get("id").map_err(store_err)?,
                    name: r.try_get("name").map_err(store_err)?,
                    description: r.try_get("description").map_err(store_err)?,
                    attributes: serde_json::from_str(&attrs)?,
                })
            })
            .collect()
    }

    async fn delete_all_for_tenant(&self, tenant_id: &str) -> ScimResult<()> {
        sqlx::query("DELETE FROM schemas WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
