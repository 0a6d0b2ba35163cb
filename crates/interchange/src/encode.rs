//! By-name AST → JSON.
//!
//! The output decodes back to an equal rule set.

use arbiter_core::{AttrId, Condition, Rule, RuleSet, Term};
use serde_json::{json, Map, Value};

/// Encode an unresolved rule set.
pub fn encode_rule_set(rule_set: &RuleSet<String>) -> Value {
    json!({
        "attributes": rule_set.attributes.iter().map(|a| json!({
            "name": a.name,
            "value": encode_term(&a.value),
        })).collect::<Vec<_>>(),
        "rules": rule_set.rules.iter().map(encode_rule).collect::<Vec<_>>(),
    })
}

/// Encode a resolved rule set, rendering each reference by the name of the
/// attribute it points at.
pub fn encode_resolved(rule_set: &RuleSet<AttrId>) -> Value {
    encode_rule_set(&rule_set.unresolve())
}

pub fn encode_term(term: &Term<String>) -> Value {
    match term {
        Term::String(s) => json!({"type": "string", "value": s}),
        Term::Number(n) => json!({"type": "number", "value": n}),
        Term::Attribute(name) => json!({"type": "attribute", "name": name}),
        Term::Request(key) => json!({"type": "request", "key": key}),
        Term::Coerce { from, to } => json!({
            "type": "coerce",
            "from": encode_term(from),
            "to": to.name(),
        }),
        Term::Expr { lhs, op, rhs } => json!({
            "type": op.name(),
            "lhs": encode_term(lhs),
            "rhs": encode_term(rhs),
        }),
        Term::Rest {
            url,
            method,
            params,
        } => {
            let mut map = Map::new();
            for (name, attr) in params {
                map.insert(name.clone(), Value::String(attr.clone()));
            }
            json!({
                "type": "rest",
                "url": url,
                "method": method.name(),
                "params": Value::Object(map),
            })
        }
    }
}

pub fn encode_condition(condition: &Condition<String>) -> Value {
    match condition {
        Condition::Not(c) => json!({"type": "not", "condition": encode_condition(c)}),
        Condition::And(l, r) => binary("and", encode_condition(l), encode_condition(r)),
        Condition::Or(l, r) => binary("or", encode_condition(l), encode_condition(r)),
        Condition::Equal(l, r) => binary("equal", encode_term(l), encode_term(r)),
        Condition::Greater(l, r) => binary("greater", encode_term(l), encode_term(r)),
    }
}

pub fn encode_rule(rule: &Rule<String>) -> Value {
    match rule {
        Rule::Always(d) => json!({"type": "always", "decision": d.name()}),
        Rule::Never => json!({"type": "never", "decision": "Undecided"}),
        Rule::When {
            condition,
            decision,
        } => json!({
            "type": "when",
            "condition": encode_condition(condition),
            "decision": decision.name(),
        }),
        Rule::Branch {
            condition,
            on_true,
            on_false,
        } => json!({
            "type": "branch",
            "condition": encode_condition(condition),
            "true": encode_rule(on_true),
            "false": encode_rule(on_false),
        }),
        Rule::Majority { decision, rules } => combinator("majority", Some(decision.name()), rules),
        Rule::All { decision, rules } => combinator("all", Some(decision.name()), rules),
        Rule::Any { decision, rules } => combinator("any", Some(decision.name()), rules),
        Rule::OneOf(rules) => combinator("one-of", None, rules),
    }
}

fn binary(kind: &str, lhs: Value, rhs: Value) -> Value {
    json!({"type": kind, "lhs": lhs, "rhs": rhs})
}

fn combinator(kind: &str, decision: Option<&str>, rules: &[Rule<String>]) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    if let Some(d) = decision {
        obj.insert("decision".to_string(), json!(d));
    }
    obj.insert(
        "rules".to_string(),
        Value::Array(rules.iter().map(encode_rule).collect()),
    );
    Value::Object(obj)
}
