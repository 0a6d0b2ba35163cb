//! JSON → by-name AST.
//!
//! Every error names the JSON path of the offending node, e.g.
//! `$.rules[1].condition.lhs`.

use arbiter_core::{
    Attribute, Condition, Decision, Operator, RestMethod, Rule, RuleSet, Term, ValueType,
};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// A required field is absent.
    MissingField { path: String, field: String },
    /// A field is present with the wrong JSON type.
    InvalidType { path: String, expected: String },
    /// A `"type"` discriminator names no known node kind.
    UnknownType { path: String, kind: String },
    /// A field has the right JSON type but a value outside its domain.
    InvalidValue { path: String, message: String },
    /// The input is not JSON at all.
    Json(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::MissingField { path, field } => {
                write!(f, "{}: missing required field '{}'", path, field)
            }
            InterchangeError::InvalidType { path, expected } => {
                write!(f, "{}: expected {}", path, expected)
            }
            InterchangeError::UnknownType { path, kind } => {
                write!(f, "{}: unknown node type '{}'", path, kind)
            }
            InterchangeError::InvalidValue { path, message } => write!(f, "{}: {}", path, message),
            InterchangeError::Json(msg) => write!(f, "invalid JSON: {}", msg),
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Parse JSON text and decode it as a rule set.
pub fn from_json_str(src: &str) -> Result<RuleSet<String>, InterchangeError> {
    let value: Value =
        serde_json::from_str(src).map_err(|e| InterchangeError::Json(e.to_string()))?;
    decode_rule_set(&value)
}

/// Decode `{"attributes": [...], "rules": [...]}`.
pub fn decode_rule_set(doc: &Value) -> Result<RuleSet<String>, InterchangeError> {
    let path = "$";
    let attributes = required_array(doc, "attributes", path)?
        .iter()
        .enumerate()
        .map(|(i, obj)| decode_attribute(obj, &format!("{}.attributes[{}]", path, i)))
        .collect::<Result<Vec<_>, _>>()?;
    let rules = decode_rules(doc, path)?;
    Ok(RuleSet::new(attributes, rules))
}

fn decode_attribute(obj: &Value, path: &str) -> Result<Attribute<String>, InterchangeError> {
    let name = required_str(obj, "name", path)?;
    let value = decode_term(required(obj, "value", path)?, &format!("{}.value", path))?;
    Ok(Attribute::new(name, value))
}

// ── Terms ───────────────────────────────────────────────────────────

pub fn decode_term(obj: &Value, path: &str) -> Result<Term<String>, InterchangeError> {
    let kind = node_type(obj, path)?;
    match kind {
        "string" => Ok(Term::String(required_str(obj, "value", path)?)),
        "number" => {
            let value = required(obj, "value", path)?;
            value.as_i64().map(Term::Number).ok_or_else(|| InterchangeError::InvalidType {
                path: format!("{}.value", path),
                expected: "a 64-bit integer".to_string(),
            })
        }
        "attribute" => Ok(Term::Attribute(required_str(obj, "name", path)?)),
        "request" => Ok(Term::Request(required_str(obj, "key", path)?)),
        "rest" => {
            let url = required_str(obj, "url", path)?;
            let method = required_str(obj, "method", path)?;
            let method = RestMethod::from_name(&method).ok_or_else(|| {
                InterchangeError::InvalidValue {
                    path: format!("{}.method", path),
                    message: format!("unknown REST method '{}'", method),
                }
            })?;
            let params_path = format!("{}.params", path);
            let params = required(obj, "params", path)?
                .as_object()
                .ok_or_else(|| InterchangeError::InvalidType {
                    path: params_path.clone(),
                    expected: "an object".to_string(),
                })?
                .iter()
                .map(|(name, attr)| {
                    attr.as_str()
                        .map(|a| (name.clone(), a.to_string()))
                        .ok_or_else(|| InterchangeError::InvalidType {
                            path: format!("{}.{}", params_path, name),
                            expected: "an attribute name".to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Term::Rest {
                url,
                method,
                params,
            })
        }
        "coerce" => {
            let from = decode_term(required(obj, "from", path)?, &format!("{}.from", path))?;
            let to = required_str(obj, "to", path)?;
            let to = ValueType::from_name(&to).ok_or_else(|| InterchangeError::InvalidValue {
                path: format!("{}.to", path),
                message: format!("unknown value type '{}'", to),
            })?;
            Ok(Term::coerce(from, to))
        }
        other => match Operator::from_name(other) {
            Some(op) => {
                let lhs = decode_term(required(obj, "lhs", path)?, &format!("{}.lhs", path))?;
                let rhs = decode_term(required(obj, "rhs", path)?, &format!("{}.rhs", path))?;
                Ok(Term::expr(lhs, op, rhs))
            }
            None => Err(unknown_type(path, other)),
        },
    }
}

// ── Conditions ──────────────────────────────────────────────────────

pub fn decode_condition(obj: &Value, path: &str) -> Result<Condition<String>, InterchangeError> {
    let kind = node_type(obj, path)?;
    match kind {
        "not" => {
            let inner = required(obj, "condition", path)?;
            Ok(Condition::not(decode_condition(
                inner,
                &format!("{}.condition", path),
            )?))
        }
        "and" | "or" => {
            let lhs = decode_condition(required(obj, "lhs", path)?, &format!("{}.lhs", path))?;
            let rhs = decode_condition(required(obj, "rhs", path)?, &format!("{}.rhs", path))?;
            Ok(if kind == "and" {
                Condition::and(lhs, rhs)
            } else {
                Condition::or(lhs, rhs)
            })
        }
        "equal" | "greater" => {
            let lhs = decode_term(required(obj, "lhs", path)?, &format!("{}.lhs", path))?;
            let rhs = decode_term(required(obj, "rhs", path)?, &format!("{}.rhs", path))?;
            Ok(if kind == "equal" {
                Condition::Equal(lhs, rhs)
            } else {
                Condition::Greater(lhs, rhs)
            })
        }
        other => Err(unknown_type(path, other)),
    }
}

// ── Rules ───────────────────────────────────────────────────────────

pub fn decode_rule(obj: &Value, path: &str) -> Result<Rule<String>, InterchangeError> {
    let kind = node_type(obj, path)?;
    match kind {
        "always" => Ok(Rule::Always(decision(obj, path)?)),
        "never" => {
            // The field must be present and valid; its value is not used.
            decision(obj, path)?;
            Ok(Rule::Never)
        }
        "when" => {
            let condition = decode_condition(
                required(obj, "condition", path)?,
                &format!("{}.condition", path),
            )?;
            Ok(Rule::when(condition, decision(obj, path)?))
        }
        "branch" => {
            let condition = decode_condition(
                required(obj, "condition", path)?,
                &format!("{}.condition", path),
            )?;
            let on_true = decode_rule(required(obj, "true", path)?, &format!("{}.true", path))?;
            let on_false = decode_rule(required(obj, "false", path)?, &format!("{}.false", path))?;
            Ok(Rule::branch(condition, on_true, on_false))
        }
        "majority" | "all" | "any" => {
            let decision = decision(obj, path)?;
            let rules = decode_rules(obj, path)?;
            Ok(match kind {
                "majority" => Rule::Majority { decision, rules },
                "all" => Rule::All { decision, rules },
                _ => Rule::Any { decision, rules },
            })
        }
        "one-of" => Ok(Rule::OneOf(decode_rules(obj, path)?)),
        other => Err(unknown_type(path, other)),
    }
}

fn decode_rules(obj: &Value, path: &str) -> Result<Vec<Rule<String>>, InterchangeError> {
    required_array(obj, "rules", path)?
        .iter()
        .enumerate()
        .map(|(i, r)| decode_rule(r, &format!("{}.rules[{}]", path, i)))
        .collect()
}

fn decision(obj: &Value, path: &str) -> Result<Decision, InterchangeError> {
    let name = required_str(obj, "decision", path)?;
    Decision::from_name(&name).ok_or_else(|| InterchangeError::InvalidValue {
        path: format!("{}.decision", path),
        message: format!("unknown decision '{}'", name),
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn required<'v>(obj: &'v Value, field: &str, path: &str) -> Result<&'v Value, InterchangeError> {
    if !obj.is_object() {
        return Err(InterchangeError::InvalidType {
            path: path.to_string(),
            expected: "an object".to_string(),
        });
    }
    obj.get(field).ok_or_else(|| InterchangeError::MissingField {
        path: path.to_string(),
        field: field.to_string(),
    })
}

fn required_str(obj: &Value, field: &str, path: &str) -> Result<String, InterchangeError> {
    required(obj, field, path)?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| InterchangeError::InvalidType {
            path: format!("{}.{}", path, field),
            expected: "a string".to_string(),
        })
}

fn required_array<'v>(
    obj: &'v Value,
    field: &str,
    path: &str,
) -> Result<&'v Vec<Value>, InterchangeError> {
    required(obj, field, path)?
        .as_array()
        .ok_or_else(|| InterchangeError::InvalidType {
            path: format!("{}.{}", path, field),
            expected: "an array".to_string(),
        })
}

fn node_type<'v>(obj: &'v Value, path: &str) -> Result<&'v str, InterchangeError> {
    required(obj, "type", path)?
        .as_str()
        .ok_or_else(|| InterchangeError::InvalidType {
            path: format!("{}.type", path),
            expected: "a string".to_string(),
        })
}

fn unknown_type(path: &str, kind: &str) -> InterchangeError {
    InterchangeError::UnknownType {
        path: path.to_string(),
        kind: kind.to_string(),
    }
}
