//! Authentication guard (spec §4.5).
//!
//! Every SCIM request is matched to exactly one endpoint by URL, then to a
//! credential by bearer token. Token comparison is constant-time (teacher's
//! `auth` module already reaches for `sha2`; `subtle` supplies the
//! constant-time half, following the same dependency the ambient pack's
//! `loom-server-scim` carries for the identical purpose).

use crate::error::{ScimError, ScimResult};
use crate::store::ports::{CredentialStore, TenantStore};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Authentication context attached to a request once the guard succeeds,
/// consumed by downstream logging (spec §4.7 correlation context).
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub tenant_id: String,
    pub credential_id: String,
}

/// Hash a presented token with a credential's salt the same way
/// [`hash_for_storage`] does, so the two can be compared byte-for-byte.
fn hash_with_salt(salt: &str, token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Produce the salted hash stored on a [`crate::store::CredentialRecord`]
/// when a credential is created (admin API, spec §4.9).
pub fn hash_for_storage(salt: &str, token: &str) -> String {
    BASE64.encode(hash_with_salt(salt, token))
}

fn constant_time_matches(salt: &str, salted_hash_b64: &str, presented: &str) -> bool {
    let Ok(stored) = BASE64.decode(salted_hash_b64) else {
        return false;
    };
    let candidate = hash_with_salt(salt, presented);
    stored.len() == candidate.len() && candidate.ct_eq(&stored).into()
}

fn extract_bearer(authorization: Option<&str>) -> ScimResult<&str> {
    authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ScimError::unauthorized("missing or malformed Authorization header"))
}

/// Run the full guard: resolve the endpoint, check it's active, extract the
/// bearer token, and match it against the endpoint's stored credentials.
pub async fn authenticate<T, C>(
    tenant_store: &T,
    credential_store: &C,
    endpoint_path_id: &str,
    authorization: Option<&str>,
) -> ScimResult<AuthContext>
where
    T: TenantStore,
    C: CredentialStore,
{
    let endpoint = tenant_store
        .get_endpoint(endpoint_path_id)
        .await?
        .ok_or_else(|| ScimError::unauthorized("unknown endpoint"))?;

    if !endpoint.active {
        return Err(ScimError::forbidden("endpoint is inactive"));
    }

    let token = extract_bearer(authorization)?;

    let candidates = credential_store.find_active_unexpired(&endpoint.id, Utc::now()).await?;
    candidates
        .into_iter()
        .find(|c| constant_time_matches(&c.salt, &c.salted_hash, token))
        .map(|c| AuthContext {
            tenant_id: endpoint.id.clone(),
            credential_id: c.id,
        })
        .ok_or_else(|| ScimError::unauthorized("no matching credential"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_through_constant_time_match() {
        let hash = hash_for_storage("pepper", "secret-token");
        assert!(constant_time_matches("pepper", &hash, "secret-token"));
        assert!(!constant_time_matches("pepper", &hash, "wrong-token"));
    }

    #[test]
    fn extract_bearer_requires_prefix() {
        assert!(extract_bearer(Some("Bearer abc")).is_ok());
        assert!(extract_bearer(Some("Basic abc")).is_err());
        assert!(extract_bearer(None).is_err());
        assert!(extract_bearer(Some("Bearer ")).is_err());
    }
}
