//! Per-endpoint config flag parsing (spec §6.5).

use crate::error::{ScimError, ScimResult};
use crate::protocol::patch::PatchConfig;
use serde_json::{Map, Value};

const MULTI_ADD: &str = "MultiOpPatchRequestAddMultipleMembersToGroup";
const MULTI_REMOVE: &str = "MultiOpPatchRequestRemoveMultipleMembersFromGroup";
const ALLOW_REMOVE_ALL: &str = "PatchOpAllowRemoveAllMembers";
const VERBOSE_PATCH: &str = "VerbosePatchSupported";
pub const LOG_LEVEL: &str = "logLevel";

/// Accepts `true|false|"True"|"False"|"1"|"0"` on read; anything else is a
/// write-time 400, so a malformed stored value is treated as absent rather
/// than erroring a read path.
fn parse_bool_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "True" | "1"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Validates a flag value being written through the admin API (spec §6.5:
/// "anything else on write is rejected with 400").
pub fn validate_bool_flag_write(flag: &str, value: &Value) -> ScimResult<()> {
    let ok = match value {
        Value::Bool(_) => true,
        Value::String(s) => matches!(s.as_str(), "true" | "false" | "True" | "False" | "1" | "0"),
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ScimError::invalid_value(format!("'{flag}' must be a recognized boolean form")))
    }
}

pub fn patch_config_from_endpoint(config: &Map<String, Value>) -> PatchConfig {
    PatchConfig {
        multi_member_add: parse_bool_flag(config.get(MULTI_ADD)),
        multi_member_remove: parse_bool_flag(config.get(MULTI_REMOVE)),
        allow_remove_all_members: parse_bool_flag(config.get(ALLOW_REMOVE_ALL)),
    }
}

pub fn verbose_patch_supported(config: &Map<String, Value>) -> bool {
    parse_bool_flag(config.get(VERBOSE_PATCH))
}

pub fn log_level_override(config: &Map<String, Value>) -> Option<String> {
    config.get(LOG_LEVEL).and_then(|v| v.as_str()).map(String::from)
}

/// Validates a `logLevel` value being written through the admin API: it
/// must parse as a [`crate::observability::Level`], not a boolean form —
/// `logLevel` is exempt from [`validate_bool_flag_write`].
pub fn validate_log_level_write(value: &Value) -> ScimResult<()> {
    let valid = value.as_str().is_some_and(|s| s.parse::<crate::observability::Level>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(ScimError::invalid_value("'logLevel' must be a recognized log level"))
    }
}

/// Validates every entry of a config map being written through the admin
/// API, routing `logLevel` to its own validator instead of the boolean one.
pub fn validate_config_write(config: &Map<String, Value>) -> ScimResult<()> {
    for (flag, value) in config {
        if flag == LOG_LEVEL {
            validate_log_level_write(value)?;
        } else {
            validate_bool_flag_write(flag, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_documented_truthy_forms() {
        for v in [json!(true), json!("true"), json!("True"), json!("1"), json!(1)] {
            let mut config = Map::new();
            config.insert(MULTI_ADD.to_string(), v);
            assert!(patch_config_from_endpoint(&config).multi_member_add);
        }
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let mut config = Map::new();
        config.insert("SomeUnknownFlag".to_string(), json!(true));
        let parsed = patch_config_from_endpoint(&config);
        assert!(!parsed.multi_member_add);
    }

    #[test]
    fn write_validation_rejects_garbage() {
        assert!(validate_bool_flag_write(MULTI_ADD, &json!("yes")).is_err());
        assert!(validate_bool_flag_write(MULTI_ADD, &json!(true)).is_ok());
    }

    #[test]
    fn log_level_is_validated_as_a_level_not_a_bool() {
        assert!(validate_log_level_write(&json!("debug")).is_ok());
        assert!(validate_log_level_write(&json!("DEBUG")).is_ok());
        assert!(validate_log_level_write(&json!(true)).is_err());
        assert!(validate_log_level_write(&json!("yes")).is_err());
    }

    #[test]
    fn config_write_routes_log_level_past_the_bool_validator() {
        let mut config = Map::new();
        config.insert(LOG_LEVEL.to_string(), json!("debug"));
        config.insert(MULTI_ADD.to_string(), json!(true));
        assert!(validate_config_write(&config).is_ok());

        config.insert(MULTI_ADD.to_string(), json!("garbage"));
        assert!(validate_config_write(&config).is_err());
    }

    #[test]
    fn log_level_override_reads_back_what_was_written() {
        let mut config = Map::new();
        config.insert(LOG_LEVEL.to_string(), json!("warn"));
        assert_eq!(log_level_override(&config), Some("warn".to_string()));
    }
}
