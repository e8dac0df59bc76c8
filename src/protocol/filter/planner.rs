//! Filter push-down planner (spec §4.1.2).
//!
//! Given an AST and the projected-column map for a resource type, decides
//! which parts of the filter a store can evaluate directly and which must
//! fall back to the in-memory evaluator as a post-filter.

use super::ast::{CompareOp, FilterNode, FilterValue};

/// A projected column a store can filter on directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectedField {
    Id,
    UserName,
    DisplayName,
    ExternalId,
    Active,
}

impl ProjectedField {
    fn from_attr_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(ProjectedField::Id),
            "userName" => Some(ProjectedField::UserName),
            "displayName" => Some(ProjectedField::DisplayName),
            "externalId" => Some(ProjectedField::ExternalId),
            "active" => Some(ProjectedField::Active),
            _ => None,
        }
    }

    /// Whether equality on this field is case-insensitive at the store
    /// layer (spec §4.2 — `userName`/`displayName` case-folded lookups).
    pub fn case_insensitive(&self) -> bool {
        matches!(self, ProjectedField::UserName | ProjectedField::DisplayName)
    }
}

/// A predicate a store implementation can evaluate without materializing
/// every row.
#[derive(Debug, Clone)]
pub enum PushedPredicate {
    Compare {
        field: ProjectedField,
        op: CompareOp,
        value: Option<FilterValue>,
    },
    And(Box<PushedPredicate>, Box<PushedPredicate>),
    Or(Box<PushedPredicate>, Box<PushedPredicate>),
}

/// Planner output: what can be pushed to the store, and what must still be
/// evaluated in memory against each candidate row.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub pushed: Option<PushedPredicate>,
    pub residual: Option<FilterNode>,
}

/// Whether the store backing a query advertises structured-payload query
/// support (dotted/URN-prefixed paths). The in-memory store does not; a
/// hypothetical JSON-capable SQL store could.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerCapabilities {
    pub structured_payload_queries: bool,
}

fn try_push(node: &FilterNode, caps: PlannerCapabilities) -> Option<PushedPredicate> {
    match node {
        FilterNode::Compare { path, op, value } => {
            if path.urn.is_some() || path.is_dotted() {
                if !caps.structured_payload_queries {
                    return None;
                }
            }
            let field = ProjectedField::from_attr_name(path.head())?;
            Some(PushedPredicate::Compare {
                field,
                op: *op,
                value: value.clone(),
            })
        }
        FilterNode::And(l, r) => {
            // AND pushes whatever each side can push; if neither side can be
            // pushed the caller falls back to a full residual for this node.
            match (try_push(l, caps), try_push(r, caps)) {
                (Some(a), Some(b)) => Some(PushedPredicate::And(Box::new(a), Box::new(b))),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            }
        }
        FilterNode::Or(l, r) => {
            // OR only pushes if BOTH sides push; a partially-pushed OR would
            // silently drop rows that only matched the unpushed side.
            match (try_push(l, caps), try_push(r, caps)) {
                (Some(a), Some(b)) => Some(PushedPredicate::Or(Box::new(a), Box::new(b))),
                _ => None,
            }
        }
        FilterNode::Not(_) | FilterNode::ValuePath { .. } => None,
    }
}

/// Whether `node`, given what was already pushed from an AND sibling, still
/// needs a residual in-memory check. Conservative: if a node wasn't fully
/// absorbed by the pushed predicate, keep the whole node as residual so
/// nothing is silently dropped.
fn needs_residual(node: &FilterNode, caps: PlannerCapabilities) -> bool {
    match node {
        FilterNode::And(l, r) => needs_residual(l, caps) || needs_residual(r, caps),
        _ => try_push(node, caps).is_none(),
    }
}

/// Plan a filter expression against a resource type's projected columns.
pub fn plan(node: &FilterNode, caps: PlannerCapabilities) -> Plan {
    let pushed = try_push(node, caps);
    let residual = if needs_residual(node, caps) {
        Some(node.clone())
    } else {
        None
    };
    Plan { pushed, residual }
}

/// Evaluate a pushed predicate against a stored resource's projected
/// columns. This is what an in-memory store uses in place of a real SQL
/// WHERE clause; the two must agree with `evaluate::evaluate` for any node
/// the planner decided to push (spec §8.1 property 9).
pub fn evaluate_pushed(pred: &PushedPredicate, record: &crate::resource::ResourceRecord) -> bool {
    match pred {
        PushedPredicate::Compare { field, op, value } => {
            let field_value: Option<String> = match field {
                ProjectedField::Id => Some(record.scim_id.clone()),
                ProjectedField::UserName => record.user_name.clone(),
                ProjectedField::DisplayName => record.display_name.clone(),
                ProjectedField::ExternalId => record.external_id.clone(),
                ProjectedField::Active => record.active.map(|b| b.to_string()),
            };
            if *op == CompareOp::Pr {
                return field_value.is_some();
            }
            let (Some(fv), Some(target)) = (field_value, value) else {
                return false;
            };
            match (field, target) {
                (ProjectedField::Active, FilterValue::Bool(b)) => {
                    let actual = fv == "true";
                    match op {
                        CompareOp::Eq => actual == *b,
                        CompareOp::Ne => actual != *b,
                        _ => false,
                    }
                }
                (_, FilterValue::Str(s)) if field.case_insensitive() => {
                    let (fv, s) = (fv.to_ascii_lowercase(), s.to_ascii_lowercase());
                    match op {
                        CompareOp::Eq => fv == s,
                        CompareOp::Ne => fv != s,
                        CompareOp::Co => fv.contains(&s),
                        CompareOp::Sw => fv.starts_with(&s),
                        CompareOp::Ew => fv.ends_with(&s),
                        CompareOp::Gt => fv > s,
                        CompareOp::Ge => fv >= s,
                        CompareOp::Lt => fv < s,
                        CompareOp::Le => fv <= s,
                        CompareOp::Pr => true,
                    }
                }
                (_, FilterValue::Str(s)) => match op {
                    CompareOp::Eq => fv == *s,
                    CompareOp::Ne => fv != *s,
                    CompareOp::Co => fv.contains(s.as_str()),
                    CompareOp::Sw => fv.starts_with(s.as_str()),
                    CompareOp::Ew => fv.ends_with(s.as_str()),
                    CompareOp::Gt => fv > *s,
                    CompareOp::Ge => fv >= *s,
                    CompareOp::Lt => fv < *s,
                    CompareOp::Le => fv <= *s,
                    CompareOp::Pr => true,
                },
                _ => false,
            }
        }
        PushedPredicate::And(l, r) => evaluate_pushed(l, record) && evaluate_pushed(r, record),
        PushedPredicate::Or(l, r) => evaluate_pushed(l, record) || evaluate_pushed(r, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::filter::parser::parse;

    #[test]
    fn projected_field_pushes_fully() {
        let node = parse(r#"userName eq "bjensen""#).unwrap();
        let plan = plan(&node, PlannerCapabilities::default());
        assert!(plan.pushed.is_some());
        assert!(plan.residual.is_none());
    }

    #[test]
    fn dotted_path_without_structured_support_is_full_scan() {
        let node = parse(r#"name.familyName eq "Jensen""#).unwrap();
        let plan = plan(&node, PlannerCapabilities::default());
        assert!(plan.pushed.is_none());
        assert!(plan.residual.is_some());
    }

    #[test]
    fn and_pushes_partial_and_keeps_residual_for_unpushable_side() {
        let node = parse(r#"userName eq "bjensen" and name.familyName eq "Jensen""#).unwrap();
        let plan = plan(&node, PlannerCapabilities::default());
        assert!(plan.pushed.is_some());
        assert!(plan.residual.is_some());
    }

    #[test]
    fn or_requires_both_sides_pushable() {
        let node = parse(r#"userName eq "a" or name.familyName eq "b""#).unwrap();
        let plan = plan(&node, PlannerCapabilities::default());
        assert!(plan.pushed.is_none());
        assert!(plan.residual.is_some());
    }

    #[test]
    fn or_of_two_projected_fields_pushes() {
        let node = parse(r#"userName eq "a" or displayName eq "b""#).unwrap();
        let plan = plan(&node, PlannerCapabilities::default());
        assert!(plan.pushed.is_some());
        assert!(plan.residual.is_none());
    }
}
