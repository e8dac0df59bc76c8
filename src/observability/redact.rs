//! Secret redaction and payload truncation (spec §4.7).

use serde_json::Value;

const SENSITIVE_MARKERS: &[&str] = &["secret", "password", "token", "authorization", "bearer", "jwt"];

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Replace any object value whose key looks like a secret with the literal
/// `"[REDACTED]"`, recursively, before the entry ever reaches the ring
/// buffer or a log sink.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if is_sensitive_key(k) {
                    out.insert(k.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    out.insert(k.clone(), redact(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Truncate any string value longer than `max_bytes`, recursively,
/// appending `[truncated N]` where `N` is the number of bytes dropped.
pub fn truncate(value: &Value, max_bytes: usize) -> Value {
    match value {
        Value::String(s) if s.len() > max_bytes => {
            let cut = floor_char_boundary(s, max_bytes);
            Value::String(format!("{}[truncated {}]", &s[..cut], s.len() - cut))
        }
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), truncate(v, max_bytes))).collect()),
        Value::Array(items) => Value::Array(items.iter().map(|v| truncate(v, max_bytes)).collect()),
        other => other.clone(),
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut idx = index.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_case_insensitive_secret_keys() {
        let input = json!({"Authorization": "Bearer abc", "bearerToken": "xyz", "userName": "bjensen"});
        let out = redact(&input);
        assert_eq!(out["Authorization"], "[REDACTED]");
        assert_eq!(out["bearerToken"], "[REDACTED]");
        assert_eq!(out["userName"], "bjensen");
    }

    #[test]
    fn redacts_nested_objects_and_arrays() {
        let input = json!({"data": [{"password": "hunter2"}]});
        let out = redact(&input);
        assert_eq!(out["data"][0]["password"], "[REDACTED]");
    }

    #[test]
    fn truncates_long_strings_with_suffix() {
        let input = json!({"blob": "x".repeat(20)});
        let out = truncate(&input, 10);
        assert_eq!(out["blob"], "xxxxxxxxxx[truncated 10]");
    }

    #[test]
    fn short_strings_are_untouched() {
        let input = json!({"blob": "short"});
        let out = truncate(&input, 10);
        assert_eq!(out["blob"], "short");
    }
}
