//! Projected-field extraction shared by create, replace, and patch paths
//! (spec §4.3 step 5, §8.1 property 1: projected columns must always agree
//! with the equivalent top-level payload keys).

use crate::resource::ResourceKind;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub user_name: Option<String>,
    pub active: Option<bool>,
    pub external_id: Option<String>,
    pub display_name: Option<String>,
}

/// Pull the projected columns back out of a full resource payload. Used on
/// create/replace where there is no prior patch outcome to reuse.
pub fn extract(payload: &Value, kind: ResourceKind) -> ExtractedFields {
    ExtractedFields {
        user_name: payload.get("userName").and_then(|v| v.as_str()).map(String::from),
        active: payload.get("active").and_then(|v| v.as_bool()),
        external_id: payload.get("externalId").and_then(|v| v.as_str()).map(String::from),
        display_name: if kind == ResourceKind::Group {
            payload.get("displayName").and_then(|v| v.as_str()).map(String::from)
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_user_fields() {
        let payload = json!({"userName": "bjensen", "active": true});
        let fields = extract(&payload, ResourceKind::User);
        assert_eq!(fields.user_name.as_deref(), Some("bjensen"));
        assert_eq!(fields.active, Some(true));
    }

    #[test]
    fn group_display_name_only_for_groups() {
        let payload = json!({"displayName": "Engineers"});
        assert_eq!(extract(&payload, ResourceKind::User).display_name, None);
        assert_eq!(
            extract(&payload, ResourceKind::Group).display_name.as_deref(),
            Some("Engineers")
        );
    }
}
