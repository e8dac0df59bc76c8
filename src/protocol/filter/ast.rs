//! Filter AST node kinds (RFC 7644 §3.4.2.2).

use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    Pr,
}

impl CompareOp {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            "pr" => Some(CompareOp::Pr),
            _ => None,
        }
    }
}

/// An attribute path: optional URN prefix plus one or more dot-separated
/// segments (`name.familyName`, or `department` under an extension URN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    pub urn: Option<String>,
    pub segments: Vec<String>,
}

impl AttrPath {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            urn: None,
            segments: vec![name.into()],
        }
    }

    /// The first path segment, case-insensitively compared against the
    /// projected-field set by the planner.
    pub fn head(&self) -> &str {
        self.segments.first().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn is_dotted(&self) -> bool {
        self.segments.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Decimal(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    pub fn as_json(&self) -> JsonValue {
        match self {
            FilterValue::Str(s) => JsonValue::String(s.clone()),
            FilterValue::Int(i) => JsonValue::from(*i),
            FilterValue::Decimal(d) => {
                serde_json::Number::from_f64(*d).map(JsonValue::Number).unwrap_or(JsonValue::Null)
            }
            FilterValue::Bool(b) => JsonValue::Bool(*b),
            FilterValue::Null => JsonValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Compare {
        path: AttrPath,
        op: CompareOp,
        value: Option<FilterValue>,
    },
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
    Not(Box<FilterNode>),
    ValuePath {
        path: AttrPath,
        filter: Box<FilterNode>,
    },
}
