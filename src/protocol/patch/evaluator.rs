//! RFC 7644 §3.5.2 PATCH evaluator.
//!
//! A pure function of (current payload, operations, config, membership
//! snapshot): no I/O, fully unit-testable against a fixed corpus.

use super::path::{TargetPath, is_empty_form, remove_at, set_at};
use crate::error::ScimError;
use crate::protocol::extract::{self, ExtractedFields};
use crate::protocol::filter::evaluate as filter_evaluate;
use crate::resource::ResourceKind;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

impl PatchOpKind {
    fn parse(s: &str) -> Result<Self, ScimError> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOpKind::Add),
            "replace" => Ok(PatchOpKind::Replace),
            "remove" => Ok(PatchOpKind::Remove),
            other => Err(ScimError::invalid_syntax(format!("unknown PATCH op '{other}'"))),
        }
    }
}

/// One operation from the `Operations` array of a PATCH request body.
#[derive(Debug, Clone)]
pub struct PatchOperationInput {
    pub op: String,
    pub path: Option<String>,
    pub value: Option<Value>,
}

impl PatchOperationInput {
    pub fn from_json(value: &Value) -> Result<Self, ScimError> {
        let op = value
            .get("op")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScimError::invalid_syntax("PATCH operation missing 'op'"))?
            .to_string();
        let path = value.get("path").and_then(|v| v.as_str()).map(|s| s.to_string());
        let value = value.get("value").cloned();
        Ok(Self { op, path, value })
    }
}

/// Config flags the group-member rules consult (spec §4.1.3, §6.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchConfig {
    pub multi_member_add: bool,
    pub multi_member_remove: bool,
    pub allow_remove_all_members: bool,
}

/// A snapshot of a group's current members, pre-resolved by the
/// orchestrator before the write section begins (spec §4.3 step 3, §5
/// pre-resolution discipline) so the evaluator can match `members[...]`
/// value-path filters without doing I/O itself.
#[derive(Debug, Clone)]
pub struct MemberSnapshot {
    pub member_scim_id: String,
    pub display: Option<String>,
    pub member_type: Option<String>,
}

impl MemberSnapshot {
    fn as_json(&self) -> Value {
        serde_json::json!({
            "value": self.member_scim_id,
            "display": self.display,
            "type": self.member_type,
        })
    }
}

/// A membership mutation the orchestrator must apply to the membership
/// store; the evaluator never touches membership rows directly.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipOp {
    Add(Vec<String>),
    Remove(Vec<String>),
    ReplaceAll(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub payload: Value,
    pub extracted: ExtractedFields,
    pub membership_ops: Vec<MembershipOp>,
}

fn extract_member_ids(value: &Value) -> Result<Vec<String>, ScimError> {
    let arr = value
        .as_array()
        .ok_or_else(|| ScimError::invalid_value("'members' value must be an array"))?;
    let mut ids = Vec::new();
    for item in arr {
        let id = item
            .get("value")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScimError::invalid_value("each member must have a 'value'"))?;
        if !ids.contains(&id.to_string()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

fn handle_members_op(
    op: PatchOpKind,
    value: Option<&Value>,
    config: &PatchConfig,
) -> Result<MembershipOp, ScimError> {
    let Some(value) = value else {
        return Err(ScimError::invalid_value("'members' path requires an array value"));
    };
    match op {
        PatchOpKind::Add => {
            let ids = extract_member_ids(value)?;
            if ids.len() > 1 && !config.multi_member_add {
                return Err(ScimError::invalid_value(
                    "multiMemberAdd is not enabled for this endpoint",
                ));
            }
            Ok(MembershipOp::Add(ids))
        }
        PatchOpKind::Remove => {
            let ids = extract_member_ids(value)?;
            if ids.len() > 1 && !config.multi_member_remove {
                return Err(ScimError::invalid_value(
                    "multiMemberRemove is not enabled for this endpoint",
                ));
            }
            Ok(MembershipOp::Remove(ids))
        }
        PatchOpKind::Replace => {
            let ids = extract_member_ids(value)?;
            if ids.is_empty() && !config.allow_remove_all_members {
                return Err(ScimError::invalid_value(
                    "allowRemoveAllMembers is not enabled for this endpoint",
                ));
            }
            Ok(MembershipOp::ReplaceAll(ids))
        }
    }
}

/// Handle `members[<filter>]` — a filtered member remove, always allowed
/// regardless of the multi-member flags.
fn handle_filtered_members_op(
    op: PatchOpKind,
    path: &str,
    members: &[MemberSnapshot],
) -> Result<MembershipOp, ScimError> {
    if op != PatchOpKind::Remove {
        return Err(ScimError::invalid_path(
            "filtered 'members[...]' paths only support remove",
        ));
    }
    let inner = path
        .strip_prefix("members[")
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ScimError::invalid_path(format!("malformed path '{path}'")))?;
    let filter = crate::protocol::filter::parse(inner)?;
    let ids: Vec<String> = members
        .iter()
        .filter(|m| filter_evaluate(&filter, &m.as_json()))
        .map(|m| m.member_scim_id.clone())
        .collect();
    Ok(MembershipOp::Remove(ids))
}

fn merge_no_path(payload: &mut Value, value: &Value) -> Result<(), ScimError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ScimError::invalid_value("operation without a path requires an object value"))?;
    for (key, v) in obj {
        if key.starts_with("urn:") {
            let ext = payload
                .as_object_mut()
                .unwrap()
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Default::default()));
            if let (Some(ext_obj), Some(v_obj)) = (ext.as_object_mut(), v.as_object()) {
                for (k, vv) in v_obj {
                    ext_obj.insert(k.clone(), vv.clone());
                }
            }
        } else {
            payload.as_object_mut().unwrap().insert(key.clone(), v.clone());
        }
    }
    Ok(())
}

fn apply_value_path(
    payload: &mut Value,
    path_str: &str,
    op: PatchOpKind,
    value: Option<&Value>,
) -> Result<(), ScimError> {
    // "emails[type eq \"work\"].value" -> attr = "emails", filter = "type eq
    // \"work\"", sub_attr = Some("value")
    let bracket_start = path_str.find('[').unwrap();
    let bracket_end = path_str
        .find(']')
        .ok_or_else(|| ScimError::invalid_path(format!("malformed path '{path_str}'")))?;
    let attr = &path_str[..bracket_start];
    let filter_src = &path_str[bracket_start + 1..bracket_end];
    let sub_attr = path_str[bracket_end + 1..].strip_prefix('.');

    let filter = crate::protocol::filter::parse(filter_src)?;
    let obj = payload.as_object_mut().unwrap();
    let Some(Value::Array(items)) = obj.get_mut(attr) else {
        return Ok(());
    };
    for item in items.iter_mut() {
        if !filter_evaluate(&filter, item) {
            continue;
        }
        match (op, sub_attr, value) {
            (PatchOpKind::Remove, Some(sub), _) => {
                if let Some(map) = item.as_object_mut() {
                    map.remove(sub);
                }
            }
            (PatchOpKind::Remove, None, _) => {
                *item = Value::Null;
            }
            (_, Some(sub), Some(v)) if is_empty_form(v) => {
                if let Some(map) = item.as_object_mut() {
                    map.remove(sub);
                }
            }
            (_, Some(sub), Some(v)) => {
                if let Some(map) = item.as_object_mut() {
                    map.insert(sub.to_string(), v.clone());
                }
            }
            (_, None, Some(v)) => {
                *item = v.clone();
            }
            _ => {}
        }
    }
    items.retain(|v| !v.is_null());
    Ok(())
}

/// Apply a list of PATCH operations to `current_payload`, returning the new
/// payload, the re-extracted first-class fields, and any membership
/// mutations the orchestrator must apply separately.
pub fn apply_patch(
    current_payload: &Value,
    operations: &[PatchOperationInput],
    config: &PatchConfig,
    kind: ResourceKind,
    members: &[MemberSnapshot],
) -> Result<PatchOutcome, ScimError> {
    let mut payload = current_payload.clone();
    let mut membership_ops = Vec::new();

    for raw in operations {
        let op = PatchOpKind::parse(&raw.op)?;

        match &raw.path {
            None => match op {
                PatchOpKind::Remove => {
                    return Err(ScimError::no_target("remove requires a path"));
                }
                _ => {
                    let value = raw
                        .value
                        .as_ref()
                        .ok_or_else(|| ScimError::invalid_value("operation requires a value"))?;
                    merge_no_path(&mut payload, value)?;
                }
            },
            Some(path) if path.eq_ignore_ascii_case("members") && kind == ResourceKind::Group => {
                membership_ops.push(handle_members_op(op, raw.value.as_ref(), config)?);
            }
            Some(path) if path.starts_with("members[") && kind == ResourceKind::Group => {
                membership_ops.push(handle_filtered_members_op(op, path, members)?);
            }
            Some(path) if path.contains('[') => {
                apply_value_path(&mut payload, path, op, raw.value.as_ref())?;
            }
            Some(path) => {
                let target = TargetPath::parse(path);
                match op {
                    PatchOpKind::Remove => remove_at(&mut payload, target.urn, &target.segments),
                    PatchOpKind::Add | PatchOpKind::Replace => {
                        let value = raw
                            .value
                            .as_ref()
                            .ok_or_else(|| ScimError::invalid_value("operation requires a value"))?;
                        if is_empty_form(value) {
                            remove_at(&mut payload, target.urn, &target.segments);
                        } else {
                            set_at(&mut payload, target.urn, &target.segments, value.clone());
                        }
                    }
                }
            }
        }
    }

    let extracted = extract::extract(&payload, kind);
    Ok(PatchOutcome {
        payload,
        extracted,
        membership_ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(op: &str, path: Option<&str>, value: Option<Value>) -> PatchOperationInput {
        PatchOperationInput {
            op: op.to_string(),
            path: path.map(String::from),
            value,
        }
    }

    #[test]
    fn replace_dotted_path() {
        let payload = json!({"name": {"familyName": "Old"}});
        let ops = vec![op("replace", Some("name.familyName"), Some(json!("New")))];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap();
        assert_eq!(out.payload["name"]["familyName"], "New");
    }

    #[test]
    fn empty_value_collapses_to_remove() {
        let urn = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
        let payload = json!({urn: {"manager": {"value": "M1"}}});
        let ops = vec![op(
            "replace",
            Some(&format!("{urn}:manager")),
            Some(json!({"value": ""})),
        )];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap();
        assert!(out.payload[urn].get("manager").is_none());
    }

    #[test]
    fn remove_without_path_fails() {
        let payload = json!({});
        let ops = vec![op("remove", None, None)];
        let err = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn unknown_op_fails_invalid_syntax() {
        let payload = json!({});
        let ops = vec![op("frobnicate", Some("userName"), Some(json!("x")))];
        let err = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn multi_member_add_denied_without_flag() {
        let payload = json!({});
        let ops = vec![op(
            "add",
            Some("members"),
            Some(json!([{"value": "u1"}, {"value": "u2"}, {"value": "u3"}])),
        )];
        let err = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::Group, &[]).unwrap_err();
        assert_eq!(err.scim_type(), Some(crate::error::ScimType::InvalidValue));
    }

    #[test]
    fn multi_member_add_allowed_with_flag() {
        let payload = json!({});
        let config = PatchConfig {
            multi_member_add: true,
            ..Default::default()
        };
        let ops = vec![op(
            "add",
            Some("members"),
            Some(json!([{"value": "u1"}, {"value": "u2"}, {"value": "u3"}])),
        )];
        let out = apply_patch(&payload, &ops, &config, ResourceKind::Group, &[]).unwrap();
        assert_eq!(
            out.membership_ops[0],
            MembershipOp::Add(vec!["u1".into(), "u2".into(), "u3".into()])
        );
    }

    #[test]
    fn single_member_add_always_allowed() {
        let payload = json!({});
        let ops = vec![op("add", Some("members"), Some(json!([{"value": "u1"}])))];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::Group, &[]).unwrap();
        assert_eq!(out.membership_ops[0], MembershipOp::Add(vec!["u1".into()]));
    }

    #[test]
    fn empty_replace_members_denied_without_flag() {
        let payload = json!({});
        let ops = vec![op("replace", Some("members"), Some(json!([])))];
        let err = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::Group, &[]).unwrap_err();
        assert_eq!(err.scim_type(), Some(crate::error::ScimType::InvalidValue));
    }

    #[test]
    fn filtered_member_remove_always_allowed() {
        let payload = json!({});
        let members = vec![
            MemberSnapshot {
                member_scim_id: "u1".into(),
                display: None,
                member_type: None,
            },
            MemberSnapshot {
                member_scim_id: "u2".into(),
                display: None,
                member_type: None,
            },
        ];
        let ops = vec![op("remove", Some(r#"members[value eq "u1"]"#), None)];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::Group, &members).unwrap();
        assert_eq!(out.membership_ops[0], MembershipOp::Remove(vec!["u1".into()]));
    }

    #[test]
    fn idempotent_remove() {
        let payload = json!({"name": {"familyName": "Jensen"}});
        let ops = vec![op("remove", Some("name.familyName"), None)];
        let once = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[])
            .unwrap()
            .payload;
        let twice = apply_patch(&once, &ops, &PatchConfig::default(), ResourceKind::User, &[])
            .unwrap()
            .payload;
        assert_eq!(once, twice);
    }

    #[test]
    fn value_path_sub_attribute_replace() {
        let payload = json!({"emails": [{"type": "work", "value": "old@x.com"}, {"type": "home", "value": "h@x.com"}]});
        let ops = vec![op(
            "replace",
            Some(r#"emails[type eq "work"].value"#),
            Some(json!("new@x.com")),
        )];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap();
        assert_eq!(out.payload["emails"][0]["value"], "new@x.com");
    }

    #[test]
    fn extraction_reads_final_payload() {
        let payload = json!({});
        let ops = vec![
            op("add", Some("userName"), Some(json!("alice"))),
            op("add", Some("active"), Some(json!(true))),
        ];
        let out = apply_patch(&payload, &ops, &PatchConfig::default(), ResourceKind::User, &[]).unwrap();
        assert_eq!(out.extracted.user_name.as_deref(), Some("alice"));
        assert_eq!(out.extracted.active, Some(true));
    }
}
