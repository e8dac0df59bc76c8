//! Discovery endpoints (spec §4.4): `/Schemas`, `/ResourceTypes`,
//! `/ServiceProviderConfig`, all derived per-tenant rather than served from
//! a single global constant.

use crate::store::ports::{EndpointRecord, SchemaRecord};
use serde::Serialize;
use serde_json::json;

const USER_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
const GROUP_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// The default schema set seeded for every new endpoint (spec §3.1: "sourced
/// from a seeded default set at endpoint creation").
pub fn default_schemas() -> Vec<SchemaRecord> {
    vec![
        SchemaRecord {
            id: USER_SCHEMA_URN.to_string(),
            name: "User".to_string(),
            description: Some("SCIM core schema for representing users".to_string()),
            attributes: json!([
                {"name": "userName", "type": "string", "multiValued": false, "required": true},
                {"name": "externalId", "type": "string", "multiValued": false, "required": false},
                {"name": "name", "type": "complex", "multiValued": false, "required": false},
                {"name": "displayName", "type": "string", "multiValued": false, "required": false},
                {"name": "emails", "type": "complex", "multiValued": true, "required": false},
                {"name": "active", "type": "boolean", "multiValued": false, "required": false},
            ]),
        },
        SchemaRecord {
            id: GROUP_SCHEMA_URN.to_string(),
            name: "Group".to_string(),
            description: Some("SCIM core schema for representing groups".to_string()),
            attributes: json!([
                {"name": "displayName", "type": "string", "multiValued": false, "required": true},
                {"name": "members", "type": "complex", "multiValued": true, "required": false},
            ]),
        },
    ]
}

#[derive(Debug, Serialize)]
pub struct ResourceTypeDoc {
    pub id: &'static str,
    pub name: &'static str,
    pub endpoint: &'static str,
    pub schema: &'static str,
    #[serde(rename = "schemaExtensions")]
    pub schema_extensions: Vec<serde_json::Value>,
}

pub fn resource_types() -> Vec<ResourceTypeDoc> {
    vec![
        ResourceTypeDoc {
            id: "User",
            name: "User",
            endpoint: "/Users",
            schema: USER_SCHEMA_URN,
            schema_extensions: vec![json!({
                "schema": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
                "required": false,
            })],
        },
        ResourceTypeDoc {
            id: "Group",
            name: "Group",
            endpoint: "/Groups",
            schema: GROUP_SCHEMA_URN,
            schema_extensions: vec![],
        },
    ]
}

/// Build the `/ServiceProviderConfig` document, reflecting the owning
/// tenant's capabilities rather than a process-wide constant (spec §4.4).
pub fn service_provider_config(endpoint: &EndpointRecord) -> serde_json::Value {
    let verbose_patch = crate::core::config_flags::verbose_patch_supported(&endpoint.config);
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
        "patch": {"supported": true},
        "filter": {"supported": true, "maxResults": 200},
        "bulk": {"supported": false, "maxOperations": 0, "maxPayloadSize": 0},
        "sort": {"supported": false},
        "etag": {"supported": true},
        "changePassword": {"supported": false},
        "authenticationSchemes": [
            {
                "type": "oauthbearertoken",
                "name": "OAuth Bearer Token",
                "description": "Authentication using a bearer token issued to the client",
            }
        ],
        "meta": {"resourceType": "ServiceProviderConfig", "location": format!("/endpoints/{}/ServiceProviderConfig", endpoint.id)},
        "verbosePatchSupported": verbose_patch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    fn sample_endpoint() -> EndpointRecord {
        let now = Utc::now();
        EndpointRecord {
            id: "ep1".into(),
            name: "acme".into(),
            display_name: None,
            description: None,
            active: true,
            config: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn default_schemas_include_core_user_and_group() {
        let schemas = default_schemas();
        assert!(schemas.iter().any(|s| s.id == USER_SCHEMA_URN));
        assert!(schemas.iter().any(|s| s.id == GROUP_SCHEMA_URN));
    }

    #[test]
    fn service_provider_config_reflects_tenant_not_global_constant() {
        let mut endpoint = sample_endpoint();
        let without_flag = service_provider_config(&endpoint);
        endpoint.config.insert("VerbosePatchSupported".into(), serde_json::json!(true));
        let with_flag = service_provider_config(&endpoint);
        assert_eq!(without_flag["verbosePatchSupported"], false);
        assert_eq!(with_flag["verbosePatchSupported"], true);
    }
}
