//! Name resolution: relink a by-name rule set into a by-reference one.
//!
//! The lookup table is fully built before any body is rewritten, so an
//! attribute may reference attributes defined before or after it. Reference
//! cycles are not detected here.

use crate::ast::{AttrId, Attribute, RuleSet};
use crate::error::CompileError;
use std::collections::HashMap;

/// Replace every attribute name in `rule_set` with the id of its definition.
pub fn resolve(rule_set: &RuleSet<String>) -> Result<RuleSet<AttrId>, CompileError> {
    let mut index: HashMap<&str, AttrId> = HashMap::with_capacity(rule_set.attributes.len());
    for (i, attribute) in rule_set.attributes.iter().enumerate() {
        if index.insert(attribute.name.as_str(), AttrId(i)).is_some() {
            return Err(CompileError::DuplicateAttribute {
                name: attribute.name.clone(),
            });
        }
    }

    let mut attributes = Vec::with_capacity(rule_set.attributes.len());
    for attribute in &rule_set.attributes {
        let context = format!("attribute '{}'", attribute.name);
        let value = attribute.value.map_refs(&mut |name: &String| lookup(&index, name, &context))?;
        attributes.push(Attribute::new(attribute.name.clone(), value));
    }

    let mut rules = Vec::with_capacity(rule_set.rules.len());
    for (i, rule) in rule_set.rules.iter().enumerate() {
        let context = format!("rule {}", i + 1);
        rules.push(rule.map_refs(&mut |name: &String| lookup(&index, name, &context))?);
    }

    tracing::debug!(
        attributes = attributes.len(),
        rules = rules.len(),
        "resolved attribute references"
    );
    Ok(RuleSet::new(attributes, rules))
}

fn lookup(index: &HashMap<&str, AttrId>, name: &str, context: &str) -> Result<AttrId, CompileError> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| CompileError::unresolved(name, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Decision, RestMethod, Rule, Term};

    #[test]
    fn forward_references_resolve() {
        let set = RuleSet::new(
            vec![
                Attribute::new("bar", Term::Attribute("foo".to_string())),
                Attribute::new("foo", Term::Number(1)),
            ],
            vec![Rule::Always(Decision::Permit)],
        );
        let resolved = resolve(&set).unwrap();
        assert_eq!(resolved.attributes[0].value, Term::Attribute(AttrId(1)));
    }

    #[test]
    fn shared_references_point_at_one_node() {
        let set = RuleSet::new(
            vec![Attribute::new("foo", Term::String("x".into()))],
            vec![Rule::when(
                Condition::Equal(
                    Term::Attribute("foo".to_string()),
                    Term::Attribute("foo".to_string()),
                ),
                Decision::Deny,
            )],
        );
        let resolved = resolve(&set).unwrap();
        assert_eq!(
            resolved.rules[0],
            Rule::when(
                Condition::Equal(Term::Attribute(AttrId(0)), Term::Attribute(AttrId(0))),
                Decision::Deny,
            )
        );
    }

    #[test]
    fn unknown_rule_reference_is_reported() {
        let set: RuleSet<String> = RuleSet::new(
            vec![],
            vec![
                Rule::Always(Decision::Permit),
                Rule::when(
                    Condition::Greater(Term::Attribute("ghost".into()), Term::Number(1)),
                    Decision::Permit,
                ),
            ],
        );
        assert_eq!(
            resolve(&set).unwrap_err(),
            CompileError::UnresolvedReference {
                name: "ghost".into(),
                context: "rule 2".into(),
            }
        );
    }

    #[test]
    fn unknown_rest_parameter_is_reported() {
        let set = RuleSet::new(
            vec![Attribute::new(
                "lookup",
                Term::Rest {
                    url: "http://svc".into(),
                    method: RestMethod::Post,
                    params: vec![("user".into(), "UserName".into())],
                },
            )],
            vec![Rule::Never],
        );
        let err = resolve(&set).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unresolved reference to attribute 'UserName' in attribute 'lookup'"
        );
    }

    #[test]
    fn duplicate_attributes_are_rejected() {
        let set: RuleSet<String> = RuleSet::new(
            vec![
                Attribute::new("foo", Term::Number(1)),
                Attribute::new("foo", Term::Number(2)),
            ],
            vec![Rule::Never],
        );
        assert_eq!(
            resolve(&set).unwrap_err(),
            CompileError::DuplicateAttribute { name: "foo".into() }
        );
    }

    #[test]
    fn unresolve_inverts_resolve() {
        let set = RuleSet::new(
            vec![
                Attribute::new("a", Term::Attribute("b".to_string())),
                Attribute::new("b", Term::Request("k".into())),
            ],
            vec![Rule::when(
                Condition::Equal(Term::Attribute("a".to_string()), Term::Number(3)),
                Decision::Permit,
            )],
        );
        assert_eq!(resolve(&set).unwrap().unresolve(), set);
    }
}
