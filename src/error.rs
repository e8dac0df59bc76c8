//! Error taxonomy for SCIM server operations.
//!
//! Every error that can reach the HTTP boundary carries an HTTP status, an
//! optional RFC 7644 `scimType`, and a human-readable detail string. The
//! error encoder (`crate::protocol::error_response`) renders these into the
//! SCIM error body shape; nothing downstream of this type needs to know the
//! wire format.

use serde::Serialize;

/// RFC 7644 §3.12 `scimType` values this server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimType {
    Uniqueness,
    NoTarget,
    InvalidValue,
    InvalidFilter,
    InvalidSyntax,
    InvalidPath,
    Mutability,
}

impl ScimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScimType::Uniqueness => "uniqueness",
            ScimType::NoTarget => "noTarget",
            ScimType::InvalidValue => "invalidValue",
            ScimType::InvalidFilter => "invalidFilter",
            ScimType::InvalidSyntax => "invalidSyntax",
            ScimType::InvalidPath => "invalidPath",
            ScimType::Mutability => "mutability",
        }
    }
}

/// Main error type threaded through the protocol engine, store ports, and
/// orchestrator. Carries everything the HTTP boundary needs to render a
/// compliant SCIM error body without re-deriving status/scimType from a
/// string message.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    #[error("{detail}")]
    Scim {
        status: u16,
        scim_type: Option<ScimType>,
        detail: String,
    },

    #[error("resource not found")]
    NotFound,

    #[error("precondition failed: {detail}")]
    Mutability { detail: String },

    #[error("uniqueness violation: {detail}")]
    Uniqueness { detail: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ScimResult<T> = Result<T, ScimError>;

impl ScimError {
    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 400,
            scim_type: Some(ScimType::InvalidFilter),
            detail: detail.into(),
        }
    }

    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 400,
            scim_type: Some(ScimType::InvalidSyntax),
            detail: detail.into(),
        }
    }

    pub fn invalid_value(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 400,
            scim_type: Some(ScimType::InvalidValue),
            detail: detail.into(),
        }
    }

    pub fn invalid_path(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 400,
            scim_type: Some(ScimType::InvalidPath),
            detail: detail.into(),
        }
    }

    pub fn no_target(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 404,
            scim_type: Some(ScimType::NoTarget),
            detail: detail.into(),
        }
    }

    pub fn uniqueness(detail: impl Into<String>) -> Self {
        ScimError::Uniqueness {
            detail: detail.into(),
        }
    }

    pub fn mutability(detail: impl Into<String>) -> Self {
        ScimError::Mutability {
            detail: detail.into(),
        }
    }

    /// Missing endpoint, missing bearer token, or no credential match (spec
    /// §4.5). Not an RFC 7644 `scimType` — the body carries no `scimType`.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 401,
            scim_type: None,
            detail: detail.into(),
        }
    }

    /// An inactive endpoint rejects every request uniformly, before any
    /// credential check (spec §4.5 step 3).
    pub fn forbidden(detail: impl Into<String>) -> Self {
        ScimError::Scim {
            status: 403,
            scim_type: None,
            detail: detail.into(),
        }
    }

    /// HTTP status this error should render as.
    pub fn http_status(&self) -> u16 {
        match self {
            ScimError::Scim { status, .. } => *status,
            ScimError::NotFound => 404,
            ScimError::Mutability { .. } => 412,
            ScimError::Uniqueness { .. } => 409,
            ScimError::Json(_) => 400,
            ScimError::Store(_) | ScimError::Internal(_) => 500,
        }
    }

    pub fn scim_type(&self) -> Option<ScimType> {
        match self {
            ScimError::Scim { scim_type, .. } => *scim_type,
            ScimError::NotFound => Some(ScimType::NoTarget),
            ScimError::Mutability { .. } => Some(ScimType::Mutability),
            ScimError::Uniqueness { .. } => Some(ScimType::Uniqueness),
            _ => None,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ScimError::Scim { detail, .. } => detail.clone(),
            ScimError::NotFound => "Resource not found".to_string(),
            ScimError::Mutability { detail } => detail.clone(),
            ScimError::Uniqueness { detail } => detail.clone(),
            ScimError::Json(e) => e.to_string(),
            ScimError::Store(e) => e.to_string(),
            ScimError::Internal(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniqueness_maps_to_409() {
        let err = ScimError::uniqueness("dup");
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.scim_type(), Some(ScimType::Uniqueness));
    }

    #[test]
    fn mutability_maps_to_412() {
        let err = ScimError::mutability("stale etag");
        assert_eq!(err.http_status(), 412);
        assert_eq!(err.scim_type(), Some(ScimType::Mutability));
    }

    #[test]
    fn not_found_maps_to_no_target() {
        let err = ScimError::NotFound;
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.scim_type(), Some(ScimType::NoTarget));
    }

    #[test]
    fn unauthorized_and_forbidden_carry_no_scim_type() {
        assert_eq!(ScimError::unauthorized("no match").http_status(), 401);
        assert_eq!(ScimError::unauthorized("no match").scim_type(), None);
        assert_eq!(ScimError::forbidden("inactive").http_status(), 403);
        assert_eq!(ScimError::forbidden("inactive").scim_type(), None);
    }
}
