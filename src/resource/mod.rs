//! Core resource types shared by the protocol engine, the store ports, and
//! the orchestrator.

mod context;
mod types;

pub use context::RequestContext;
pub use types::{ResourceKind, ResourceRecord, ResourceTypeDescriptor};

/// Descriptors for the two resource kinds this server supports, used to
/// dispatch uniqueness/extraction rules from a single orchestrator instead
/// of one hand-written service per kind (see design note "dispatch over
/// resource type").
pub fn descriptor(kind: ResourceKind) -> ResourceTypeDescriptor {
    match kind {
        ResourceKind::User => ResourceTypeDescriptor {
            kind: ResourceKind::User,
            type_name: "User",
            path_segment: "Users",
            default_schema_urn: "urn:ietf:params:scim:schemas:core:2.0:User",
            required_fields: &["userName"],
        },
        ResourceKind::Group => ResourceTypeDescriptor {
            kind: ResourceKind::Group,
            type_name: "Group",
            path_segment: "Groups",
            default_schema_urn: "urn:ietf:params:scim:schemas:core:2.0:Group",
            required_fields: &["displayName"],
        },
    }
}
