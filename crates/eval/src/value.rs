//! Runtime values and their cross-type rules.

use arbiter_core::{Operator, ValueType};
use regex::Regex;
use std::fmt;

use crate::error::EvalError;

/// Reduced REST parameters, in declaration order.
pub type Params = Vec<(String, Value)>;

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// The value a term reduces to.
///
/// Numbers are fixed-width `i64`. Strings that parse as integers take part
/// in numeric equality, ordering and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Number(i64),
    Boolean(bool),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
        }
    }

    /// Cross-type equality. Never fails: incomparable pairs are unequal.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                parse_integer(s) == Some(*n)
            }
            _ => false,
        }
    }

    /// Cross-type ordering: `self > other`.
    pub fn greater(&self, other: &Value) -> Result<bool, EvalError> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a > b),
            (Value::Number(a), Value::String(s)) => Ok(*a > numeric_string(s)?),
            (Value::String(s), Value::Number(b)) => Ok(numeric_string(s)? > *b),
            (Value::String(a), Value::String(b)) => match (parse_integer(a), parse_integer(b)) {
                (Some(x), Some(y)) => Ok(x > y),
                _ => Ok(a > b),
            },
            _ => Err(EvalError::coercion(format!(
                "cannot order {} against {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Apply a binary operator. Arithmetic is checked; `regex` matches.
    pub fn apply(&self, op: Operator, other: &Value) -> Result<Value, EvalError> {
        let checked: fn(i64, i64) -> Option<i64> = match op {
            Operator::Regex => return self.regex_match(other),
            Operator::Plus => i64::checked_add,
            Operator::Minus => i64::checked_sub,
            Operator::Multiply => i64::checked_mul,
            Operator::Divide => i64::checked_div,
        };
        let a = self.to_number()?;
        let b = other.to_number()?;
        if op == Operator::Divide && b == 0 {
            return Err(EvalError::DivisionByZero);
        }
        checked(a, b).map(Value::Number).ok_or_else(|| EvalError::Overflow {
            message: format!("{} {} {}", a, op.symbol(), b),
        })
    }

    /// Whether the string rendering of `self` is matched in full by `pattern`.
    pub fn regex_match(&self, pattern: &Value) -> Result<Value, EvalError> {
        let subject = self.render();
        let pattern = pattern.render();
        let re = Regex::new(&format!(r"\A(?:{})\z", pattern)).map_err(|e| {
            EvalError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Value::Boolean(re.is_match(&subject)))
    }

    /// Convert to `to`. Same-type coercion is the identity.
    pub fn coerce(&self, to: ValueType) -> Result<Value, EvalError> {
        match (self, to) {
            (Value::String(_), ValueType::String) | (Value::Number(_), ValueType::Number) => {
                Ok(self.clone())
            }
            (Value::Number(_) | Value::Boolean(_), ValueType::String) => {
                Ok(Value::String(self.render()))
            }
            (Value::String(_) | Value::Boolean(_), ValueType::Number) => {
                self.to_number().map(Value::Number)
            }
        }
    }

    fn to_number(&self) -> Result<i64, EvalError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::String(s) => numeric_string(s),
            Value::Boolean(_) => Err(EvalError::coercion("cannot use Boolean as a number")),
        }
    }

    /// Plain rendering: strings unquoted, numbers in decimal.
    pub(crate) fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => serde_json::Value::from(*n),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok()
}

fn numeric_string(s: &str) -> Result<i64, EvalError> {
    parse_integer(s).ok_or_else(|| EvalError::coercion(format!("'{}' is not a number", s)))
}
