//! Meta block and ETag construction (spec §4.1.4).
//!
//! `meta.version` and the `ETag` response header must always agree
//! character-for-character (spec §8.1 property 5) — both are derived from
//! `ResourceRecord::etag` so there is exactly one place that formats a
//! version as a weak ETag literal.

use crate::resource::{ResourceRecord, descriptor};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str,
    pub created: DateTime<Utc>,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
    pub location: String,
    pub version: String,
}

/// Build the `meta` block for a record, given the server's externally
/// visible base URL (spec §4.10 `AppConfig::public_base_url`).
pub fn build(record: &ResourceRecord, base_url: &str) -> Meta {
    let descriptor = descriptor(record.kind);
    let location = format!(
        "{}/endpoints/{}/{}/{}",
        base_url.trim_end_matches('/'),
        record.endpoint_id,
        descriptor.path_segment,
        record.scim_id
    );
    Meta {
        resource_type: descriptor.type_name,
        created: record.created_at,
        last_modified: record.updated_at,
        location,
        version: record.etag(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use serde_json::json;

    fn sample_record() -> ResourceRecord {
        let now = "2024-01-01T00:00:00Z".parse().unwrap();
        ResourceRecord {
            endpoint_id: "ep1".into(),
            scim_id: "abc-123".into(),
            kind: ResourceKind::User,
            external_id: None,
            user_name: Some("bjensen".into()),
            display_name: None,
            active: Some(true),
            payload: json!({}),
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn meta_version_matches_etag() {
        let record = sample_record();
        let meta = build(&record, "https://scim.example.com");
        assert_eq!(meta.version, record.etag());
        assert_eq!(meta.version, "W/\"v3\"");
    }

    #[test]
    fn location_is_well_formed() {
        let record = sample_record();
        let meta = build(&record, "https://scim.example.com/");
        assert_eq!(meta.location, "https://scim.example.com/endpoints/ep1/Users/abc-123");
    }
}
