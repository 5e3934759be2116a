//! Step conditions: `field <op> value` expressions.
//!
//! A condition is parsed once, when its workflow is defined, into a small
//! typed AST and then evaluated against every trigger payload:
//!
//! ```text
//! lead_score > 70
//! customer.plan = enterprise
//! payment_status != "paid"
//! ```
//!
//! Fields are dotted paths into the JSON payload. A numeric right-hand side
//! compares numerically; anything else compares as a string and supports only
//! `=` and `!=`. Evaluation fails closed: a missing field, or a value that
//! cannot be compared with the literal, makes the condition false.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '!'];

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "!=",
        }
    }

    /// `<`, `>`, `<=` and `>=` need a numeric literal.
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    fn holds<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

/// Dotted path into the payload, e.g. `customer.plan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    fn parse(raw: &str) -> Result<Self, ConditionError> {
        let segments: Vec<String> = raw.split('.').map(str::to_owned).collect();
        let valid = segments.iter().all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        });
        if !valid {
            return Err(ConditionError::InvalidField(raw.to_owned()));
        }
        Ok(Self(segments))
    }

    /// Walk the payload. Numeric segments index into arrays.
    pub fn lookup<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(payload, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Why a condition string was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,

    #[error("no comparison operator (expected one of >, <, >=, <=, =, !=)")]
    MissingOperator,

    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("missing field name before the operator")]
    MissingField,

    #[error("invalid field path '{0}'")]
    InvalidField(String),

    #[error("missing value after the operator")]
    MissingValue,

    #[error("operator '{op}' needs a numeric value, got '{value}'")]
    OrderingOnText { op: &'static str, value: String },
}

/// A parsed `field <op> value` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FieldPath,
    pub op: Comparator,
    pub literal: Literal,
}

impl Condition {
    /// Evaluate against a trigger payload.
    ///
    /// A missing or `null` field makes every comparison false, `!=`
    /// included: `status != done` does not hold when `status` is absent.
    pub fn evaluate(&self, payload: &Value) -> bool {
        let Some(value) = self.field.lookup(payload) else {
            return false;
        };

        match &self.literal {
            Literal::Number(rhs) => match numeric(value) {
                Some(lhs) => self.op.holds(&lhs, rhs),
                None => false,
            },
            Literal::Text(rhs) => match textual(value) {
                Some(lhs) => self.op.holds(lhs.as_str(), rhs.as_str()),
                None => false,
            },
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn textual(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unquote(raw: &str) -> Option<&str> {
    ['"', '\''].iter().find_map(|&q| {
        raw.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConditionError::Empty);
        }

        let start = s.find(OPERATOR_CHARS).ok_or(ConditionError::MissingOperator)?;
        let rest = &s[start..];
        let (op, op_len) = if rest.starts_with(">=") {
            (Comparator::Ge, 2)
        } else if rest.starts_with("<=") {
            (Comparator::Le, 2)
        } else if rest.starts_with("!=") {
            (Comparator::Ne, 2)
        } else if rest.starts_with('>') {
            (Comparator::Gt, 1)
        } else if rest.starts_with('<') {
            (Comparator::Lt, 1)
        } else if rest.starts_with('=') {
            (Comparator::Eq, 1)
        } else {
            let bad: String = rest.chars().take_while(|c| OPERATOR_CHARS.contains(c)).collect();
            return Err(ConditionError::UnsupportedOperator(bad));
        };

        let field = s[..start].trim();
        let value = rest[op_len..].trim();

        if value.starts_with(OPERATOR_CHARS) {
            let bad: String = rest.chars().take_while(|c| OPERATOR_CHARS.contains(c)).collect();
            return Err(ConditionError::UnsupportedOperator(bad));
        }
        if field.is_empty() {
            return Err(ConditionError::MissingField);
        }
        let field = FieldPath::parse(field)?;

        let literal = match unquote(value) {
            Some(inner) => Literal::Text(inner.to_owned()),
            None if value.is_empty() => return Err(ConditionError::MissingValue),
            None => match value.parse::<f64>() {
                Ok(n) if n.is_finite() => Literal::Number(n),
                _ => Literal::Text(value.to_owned()),
            },
        };

        if let (true, Literal::Text(text)) = (op.is_ordering(), &literal) {
            return Err(ConditionError::OrderingOnText {
                op: op.symbol(),
                value: text.clone(),
            });
        }

        Ok(Self { field, op, literal })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.field, self.op.symbol())?;
        match &self.literal {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Text(t) if t.parse::<f64>().is_ok() || t.trim() != t || t.is_empty() => {
                write!(f, "\"{t}\"")
            }
            Literal::Text(t) => f.write_str(t),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(s: &str) -> Condition {
        s.parse().unwrap_or_else(|e| panic!("'{s}' should parse: {e}"))
    }

    #[test]
    fn parses_every_operator() {
        assert_eq!(cond("a > 1").op, Comparator::Gt);
        assert_eq!(cond("a < 1").op, Comparator::Lt);
        assert_eq!(cond("a >= 1").op, Comparator::Ge);
        assert_eq!(cond("a <= 1").op, Comparator::Le);
        assert_eq!(cond("a = x").op, Comparator::Eq);
        assert_eq!(cond("a != x").op, Comparator::Ne);
        assert_eq!(cond("a>=1").op, Comparator::Ge);
    }

    #[test]
    fn numeric_comparison() {
        let c = cond("lead_score > 70");
        assert!(c.evaluate(&json!({ "lead_score": 80 })));
        assert!(!c.evaluate(&json!({ "lead_score": 50 })));
        assert!(!c.evaluate(&json!({ "lead_score": 70 })));
        // numeric strings are coerced
        assert!(c.evaluate(&json!({ "lead_score": "75.5" })));
        assert!(cond("lead_score >= 70").evaluate(&json!({ "lead_score": 70 })));
        assert!(cond("n = 3").evaluate(&json!({ "n": 3.0 })));
    }

    #[test]
    fn string_equality() {
        let c = cond("payment_status = pending");
        assert!(c.evaluate(&json!({ "payment_status": "pending" })));
        assert!(!c.evaluate(&json!({ "payment_status": "paid" })));

        let c = cond("churn_risk != 'high'");
        assert!(c.evaluate(&json!({ "churn_risk": "low" })));
        assert!(!c.evaluate(&json!({ "churn_risk": "high" })));

        assert!(cond("responded = false").evaluate(&json!({ "responded": false })));
    }

    #[test]
    fn dotted_paths_reach_nested_values() {
        let c = cond("customer.plan = enterprise");
        assert!(c.evaluate(&json!({ "customer": { "plan": "enterprise" } })));
        assert!(!c.evaluate(&json!({ "customer": "enterprise" })));
        assert!(cond("items.0.qty > 1").evaluate(&json!({ "items": [{ "qty": 2 }] })));
    }

    #[test]
    fn evaluation_fails_closed() {
        // missing field, even for inequality
        assert!(!cond("score > 1").evaluate(&json!({})));
        assert!(!cond("status != done").evaluate(&json!({})));
        assert!(!cond("status != done").evaluate(&json!({ "status": null })));
        // null and non-numeric values
        assert!(!cond("score > 1").evaluate(&json!({ "score": null })));
        assert!(!cond("score > 1").evaluate(&json!({ "score": "high" })));
        assert!(!cond("tags = a").evaluate(&json!({ "tags": ["a"] })));
    }

    #[test]
    fn malformed_conditions_are_rejected() {
        assert_eq!("".parse::<Condition>(), Err(ConditionError::Empty));
        assert_eq!("no_response".parse::<Condition>(), Err(ConditionError::MissingOperator));
        assert_eq!("> 5".parse::<Condition>(), Err(ConditionError::MissingField));
        assert_eq!("score >".parse::<Condition>(), Err(ConditionError::MissingValue));
        assert!(matches!(
            "score == 5".parse::<Condition>(),
            Err(ConditionError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            "a..b = 1".parse::<Condition>(),
            Err(ConditionError::InvalidField(_))
        ));
        assert!(matches!(
            "tier > gold".parse::<Condition>(),
            Err(ConditionError::OrderingOnText { op: ">", .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        for raw in ["lead_score > 70", "payment_status = pending", "a.b != \"42\"", "x <= 0.5"] {
            let parsed = cond(raw);
            assert_eq!(parsed.to_string(), raw);
            assert_eq!(cond(&parsed.to_string()), parsed);
        }
    }

    #[test]
    fn serializes_as_a_string() {
        let c = cond("health_score < 50");
        assert_eq!(serde_json::to_value(&c).unwrap(), json!("health_score < 50"));
        let back: Condition = serde_json::from_value(json!("health_score < 50")).unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_value::<Condition>(json!("nonsense")).is_err());
    }
}
