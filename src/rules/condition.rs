//! Condition evaluation against a flat answer record
//!
//! A condition is a closed `(field, operator, value)` triple. Values on both
//! sides are [`AnswerValue`]s and coercion between variants happens only here,
//! at the point of comparison:
//!
//! - numbers compare numerically; text that parses as a number joins in
//! - booleans support equality only; `"true"`/`"false"` text coerces
//! - a list on either side turns `==` into membership (list vs scalar) or set
//!   equality (list vs list); ordering against a list never matches
//! - anything else is incomparable: `==` false, `!=` true, ordering false

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One answer value from an assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// Question identifier -> answer
pub type AnswerRecord = HashMap<String, AnswerValue>;

impl AnswerValue {
    /// Convert an arbitrary JSON value (e.g. a routine attribute).
    ///
    /// `null` and objects have no answer form and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::List(
                items
                    .iter()
                    .filter_map(|item| Self::from_json(item).and_then(|v| v.scalar_text()))
                    .collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Text form of a scalar, used for list membership
    fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::List(_) => None,
        }
    }
}

/// Comparison operator of a condition
///
/// Operator names outside the supported set are kept as `Unsupported` so a
/// bad rule can be rejected on evaluation without failing the whole rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Unsupported(name) => name,
        }
    }

    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Self::Ne, None) => true,
            (_, None) => false,
            (Self::Eq, Some(o)) => o == Ordering::Equal,
            (Self::Ne, Some(o)) => o != Ordering::Equal,
            (Self::Gt, Some(o)) => o == Ordering::Greater,
            (Self::Lt, Some(o)) => o == Ordering::Less,
            (Self::Ge, Some(o)) => o != Ordering::Less,
            (Self::Le, Some(o)) => o != Ordering::Greater,
            (Self::Unsupported(_), Some(_)) => false,
        }
    }

    /// Outcome for operand pairs that only support equality
    fn holds_equality(&self, equal: bool) -> bool {
        match self {
            Self::Eq => equal,
            Self::Ne => !equal,
            _ => false,
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.trim() {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            _ => Self::Unsupported(name),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Operator::from)
    }
}

/// Malformed rule configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRuleError {
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
}

/// `record[field] OP value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: AnswerValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: AnswerValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Evaluate one condition against an answer record.
///
/// A missing field is a non-match, never an error.
pub fn evaluate(condition: &Condition, record: &AnswerRecord) -> Result<bool, InvalidRuleError> {
    if let Operator::Unsupported(name) = &condition.operator {
        return Err(InvalidRuleError::UnsupportedOperator(name.clone()));
    }

    match record.get(&condition.field) {
        Some(actual) => Ok(compare(actual, &condition.operator, &condition.value)),
        None => Ok(false),
    }
}

/// Apply `actual OP expected` with the coercion rules from the module docs
pub fn compare(actual: &AnswerValue, op: &Operator, expected: &AnswerValue) -> bool {
    match (actual, expected) {
        (AnswerValue::List(left), AnswerValue::List(right)) => {
            let left: HashSet<&str> = left.iter().map(String::as_str).collect();
            let right: HashSet<&str> = right.iter().map(String::as_str).collect();
            op.holds_equality(left == right)
        }
        (AnswerValue::List(items), scalar) | (scalar, AnswerValue::List(items)) => {
            let contained = scalar
                .scalar_text()
                .map(|text| items.iter().any(|item| *item == text))
                .unwrap_or(false);
            op.holds_equality(contained)
        }
        _ => compare_scalars(actual, op, expected),
    }
}

fn compare_scalars(actual: &AnswerValue, op: &Operator, expected: &AnswerValue) -> bool {
    // Text equality is exact; only ordering falls back to numbers
    if let (AnswerValue::Text(a), AnswerValue::Text(b)) = (actual, expected) {
        if matches!(op, Operator::Eq | Operator::Ne) {
            return op.holds_equality(a == b);
        }
    }
    if let (Some(a), Some(b)) = (actual.as_number(), expected.as_number()) {
        return op.holds(a.partial_cmp(&b));
    }
    if let (Some(a), Some(b)) = (actual.as_bool(), expected.as_bool()) {
        return op.holds_equality(a == b);
    }
    if let (AnswerValue::Text(a), AnswerValue::Text(b)) = (actual, expected) {
        return op.holds_equality(a == b);
    }
    op.holds_equality(false)
}
