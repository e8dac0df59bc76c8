use chrono::{DateTime, Utc};
use serde_json::Value;

/// The two resource kinds this server provisions. `resourceType` is
/// immutable after create (spec invariant), so this is a plain enum rather
/// than a free-form string anywhere past the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    Group,
}

impl ResourceKind {
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "Users" => Some(ResourceKind::User),
            "Groups" => Some(ResourceKind::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "User",
            ResourceKind::Group => "Group",
        }
    }
}

/// Static shape a resource kind needs for dispatch: the orchestrator is
/// parameterized by this rather than branching on resource type everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ResourceTypeDescriptor {
    pub kind: ResourceKind,
    pub type_name: &'static str,
    pub path_segment: &'static str,
    pub default_schema_urn: &'static str,
    pub required_fields: &'static [&'static str],
}

/// The unified resource record as persisted by a store implementation.
///
/// Projected attributes (`external_id`, `user_name`, `display_name`,
/// `active`) are always kept in sync with the equivalent top-level keys in
/// `payload` — the store ports are responsible for this invariant on every
/// write (see `crate::protocol::extract`).
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub endpoint_id: String,
    pub scim_id: String,
    pub kind: ResourceKind,
    pub external_id: Option<String>,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub active: Option<bool>,
    pub payload: Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// The weak ETag literal used for both the `ETag` header and
    /// `meta.version`; these must always agree character-for-character.
    pub fn etag(&self) -> String {
        format!("W/\"v{}\"", self.version)
    }
}
