//! Path navigation helpers for the PATCH evaluator (RFC 7644 §3.5.2).

use serde_json::{Map, Value};

/// One of the four empty forms that collapse a `replace` into a `remove`
/// (spec §4.1.3, §8.1 property 3).
pub fn is_empty_form(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => {
            map.is_empty()
                || (map.len() == 1
                    && map.get("value").is_some_and(|v| matches!(v, Value::Null) || matches!(v, Value::String(s) if s.is_empty())))
        }
        _ => false,
    }
}

/// A parsed simple/dotted/URN-prefixed path, split into the target object
/// (root payload or an extension object keyed by URN) and the dotted
/// segments within it.
pub struct TargetPath<'a> {
    pub urn: Option<&'a str>,
    pub segments: Vec<&'a str>,
}

impl<'a> TargetPath<'a> {
    pub fn parse(path: &'a str) -> Self {
        if let Some(idx) = path.rfind(':') {
            if path.starts_with("urn:") {
                return TargetPath {
                    urn: Some(&path[..idx]),
                    segments: path[idx + 1..].split('.').collect(),
                };
            }
        }
        TargetPath {
            urn: None,
            segments: path.split('.').collect(),
        }
    }
}

fn target_object<'v>(payload: &'v mut Value, urn: Option<&str>) -> &'v mut Map<String, Value> {
    let root = payload.as_object_mut().expect("payload must be a JSON object");
    match urn {
        Some(urn) => root
            .entry(urn.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("extension value must be an object"),
        None => root,
    }
}

/// Set a value at `segments` within the target object, creating
/// intermediate complex-attribute objects as needed.
pub fn set_at(payload: &mut Value, urn: Option<&str>, segments: &[&str], value: Value) {
    let mut obj = target_object(payload, urn);
    for seg in &segments[..segments.len() - 1] {
        obj = obj
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("intermediate attribute must be an object");
    }
    obj.insert(segments[segments.len() - 1].to_string(), value);
}

/// Remove the leaf at `segments`, pruning any parent object left empty.
pub fn remove_at(payload: &mut Value, urn: Option<&str>, segments: &[&str]) {
    let Some(root) = payload.as_object_mut() else {
        return;
    };
    let Some(top) = (match urn {
        Some(u) => root.get_mut(u),
        None => Some(payload_as_mut(payload)),
    }) else {
        return;
    };
    remove_recursive(top, segments);
}

fn payload_as_mut(payload: &mut Value) -> &mut Value {
    payload
}

fn remove_recursive(value: &mut Value, segments: &[&str]) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    if segments.len() == 1 {
        map.remove(segments[0]);
    } else if let Some(child) = map.get_mut(segments[0]) {
        if remove_recursive(child, &segments[1..]) {
            map.remove(segments[0]);
        }
    }
    map.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_forms_detected() {
        assert!(is_empty_form(&Value::Null));
        assert!(is_empty_form(&json!("")));
        assert!(is_empty_form(&json!({})));
        assert!(is_empty_form(&json!({"value": ""})));
        assert!(is_empty_form(&json!({"value": null})));
        assert!(!is_empty_form(&json!({"value": "x"})));
        assert!(!is_empty_form(&json!("x")));
    }

    #[test]
    fn set_and_remove_dotted_path() {
        let mut payload = json!({});
        set_at(&mut payload, None, &["name", "familyName"], json!("Jensen"));
        assert_eq!(payload["name"]["familyName"], "Jensen");
        remove_at(&mut payload, None, &["name", "familyName"]);
        assert!(payload.get("name").is_none(), "empty parent should be pruned");
    }

    #[test]
    fn set_urn_extension_path() {
        let mut payload = json!({});
        let urn = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
        set_at(&mut payload, Some(urn), &["department"], json!("eng"));
        assert_eq!(payload[urn]["department"], "eng");
    }
}
