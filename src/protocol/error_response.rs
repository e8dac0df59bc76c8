//! SCIM error body encoder (RFC 7644 §3.12).
//!
//! `status` is a string per the RFC, not a number — a detail easy to get
//! wrong when translating from an HTTP status code.

use crate::error::ScimError;
use serde::Serialize;

const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub schemas: [&'static str; 1],
    pub status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<&'static str>,
    pub detail: String,
}

impl ErrorBody {
    pub fn from_error(err: &ScimError) -> Self {
        ErrorBody {
            schemas: [ERROR_SCHEMA],
            status: err.http_status().to_string(),
            scim_type: err.scim_type().map(|t| t.as_str()),
            detail: err.detail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_serialized_as_string() {
        let err = ScimError::uniqueness("userName already in use");
        let body = ErrorBody::from_error(&err);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "409");
        assert!(value["status"].is_string());
        assert_eq!(value["scimType"], "uniqueness");
    }

    #[test]
    fn scim_type_omitted_when_absent() {
        let err = ScimError::Internal("boom".into());
        let body = ErrorBody::from_error(&err);
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("scimType").is_none());
    }
}
