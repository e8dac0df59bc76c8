//! In-memory filter evaluator: interprets a `FilterNode` against a
//! materialized resource payload. Used both as the full-scan fallback and
//! as the reference implementation the push-down planner must agree with
//! (spec §8.1 property 9).

use super::ast::{AttrPath, CompareOp, FilterNode, FilterValue};
use serde_json::Value;

/// Resolve an attribute path against a resource payload, honoring URN
/// extension prefixes and dotted complex-attribute navigation. Returns all
/// matching values — for a multi-valued parent, every element's sub-value.
fn resolve<'a>(payload: &'a Value, path: &AttrPath) -> Vec<&'a Value> {
    let root = match &path.urn {
        Some(urn) => match payload.get(urn) {
            Some(v) => v,
            None => return vec![],
        },
        None => payload,
    };
    let mut current = vec![root];
    for segment in &path.segments {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(_) => {
                    if let Some(v) = value.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.get(segment) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn compare_scalar(value: &Value, op: CompareOp, target: &FilterValue) -> bool {
    match (value, target) {
        (Value::String(s), FilterValue::Str(t)) => {
            let (s, t) = (s.to_ascii_lowercase(), t.to_ascii_lowercase());
            match op {
                CompareOp::Eq => s == t,
                CompareOp::Ne => s != t,
                CompareOp::Co => s.contains(&t),
                CompareOp::Sw => s.starts_with(&t),
                CompareOp::Ew => s.ends_with(&t),
                CompareOp::Gt => s > t,
                CompareOp::Ge => s >= t,
                CompareOp::Lt => s < t,
                CompareOp::Le => s <= t,
                CompareOp::Pr => true,
            }
        }
        (Value::Number(n), FilterValue::Int(t)) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            let t = *t as f64;
            numeric_cmp(op, n, t)
        }
        (Value::Number(n), FilterValue::Decimal(t)) => {
            numeric_cmp(op, n.as_f64().unwrap_or(f64::NAN), *t)
        }
        (Value::Bool(b), FilterValue::Bool(t)) => match op {
            CompareOp::Eq => b == t,
            CompareOp::Ne => b != t,
            _ => false,
        },
        (Value::Null, FilterValue::Null) => matches!(op, CompareOp::Eq),
        _ => false,
    }
}

fn numeric_cmp(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
        CompareOp::Pr => true,
    }
}

/// Evaluate a filter AST against a resource payload. An array matches a
/// scalar comparison if any element matches (multi-valued semantics).
pub fn evaluate(node: &FilterNode, payload: &Value) -> bool {
    match node {
        FilterNode::Compare { path, op, value } => {
            let candidates = resolve(payload, path);
            if *op == CompareOp::Pr {
                return candidates.iter().any(|v| !v.is_null());
            }
            let Some(target) = value else { return false };
            candidates.iter().any(|v| match v {
                Value::Array(items) => items.iter().any(|item| compare_scalar(item, *op, target)),
                other => compare_scalar(other, *op, target),
            })
        }
        FilterNode::And(l, r) => evaluate(l, payload) && evaluate(r, payload),
        FilterNode::Or(l, r) => evaluate(l, payload) || evaluate(r, payload),
        FilterNode::Not(inner) => !evaluate(inner, payload),
        FilterNode::ValuePath { path, filter } => {
            let root = match &path.urn {
                Some(urn) => payload.get(urn).cloned().unwrap_or(Value::Null),
                None => payload.get(path.head()).cloned().unwrap_or(Value::Null),
            };
            // Navigate any remaining dotted segments before the multi-valued
            // array itself (path.segments[0] is the array attribute).
            let rest = &path.segments[1..];
            let array_value = if path.urn.is_some() {
                resolve(payload, path).into_iter().next().cloned().unwrap_or(Value::Null)
            } else {
                root
            };
            let array_value = if rest.is_empty() {
                array_value
            } else {
                rest.iter().fold(array_value, |acc, seg| acc.get(seg).cloned().unwrap_or(Value::Null))
            };
            match array_value {
                Value::Array(items) => items.iter().any(|item| evaluate(filter, item)),
                other => evaluate(filter, &other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::filter::parser::parse;
    use serde_json::json;

    #[test]
    fn case_insensitive_eq() {
        let node = parse(r#"userName eq "ALICE@x""#).unwrap();
        let payload = json!({"userName": "alice@X"});
        assert!(evaluate(&node, &payload));
    }

    #[test]
    fn multi_valued_value_path() {
        let node = parse(r#"emails[type eq "work"]"#).unwrap();
        let payload = json!({"emails": [{"type": "home"}, {"type": "work", "value": "a@b.com"}]});
        assert!(evaluate(&node, &payload));
    }

    #[test]
    fn dotted_path() {
        let node = parse(r#"name.familyName eq "Jensen""#).unwrap();
        let payload = json!({"name": {"familyName": "Jensen"}});
        assert!(evaluate(&node, &payload));
    }

    #[test]
    fn presence_on_missing_attribute_is_false() {
        let node = parse("externalId pr").unwrap();
        assert!(!evaluate(&node, &json!({})));
        assert!(evaluate(&node, &json!({"externalId": "x"})));
    }
}
