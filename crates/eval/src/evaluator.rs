//! Reduction of a resolved rule set against a request.
//!
//! Evaluation is eager everywhere except `Branch`, which reduces only the
//! selected leg. Both operands of every binary node are reduced before they
//! are combined, so an explanation tree always covers the whole expression.

use arbiter_core::{AttrId, Condition, Decision, Rule, RuleSet, Term, ValueType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::combinators;
use crate::error::EvalError;
use crate::rest::RestClient;
use crate::result::EvaluationResult;
use crate::value::Value;

/// Named string parameters supplied with one evaluation.
pub type Request = BTreeMap<String, String>;

/// Nested attribute dereferences allowed before evaluation gives up.
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// Reduces terms, conditions and rules of one rule set.
///
/// Holds only shared references and a cancellation flag, so one evaluator
/// can serve many threads at once.
pub struct Evaluator<'a> {
    rule_set: &'a RuleSet<AttrId>,
    rest: &'a dyn RestClient,
    cancel: Option<Arc<AtomicBool>>,
    depth_limit: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(rule_set: &'a RuleSet<AttrId>, rest: &'a dyn RestClient) -> Self {
        Evaluator {
            rule_set,
            rest,
            cancel: None,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// REST terms reduced after `flag` is set fail with `Cancelled`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Reduce every top-level rule against `request`, in order.
    ///
    /// A failing rule yields a `Failure` entry; its siblings are still
    /// reduced.
    pub fn evaluate(&self, request: &Request) -> Vec<EvaluationResult<Decision>> {
        self.rule_set
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let result = self.reduce_rule(rule, request);
                match &result {
                    EvaluationResult::Success { value, .. } => {
                        tracing::debug!(rule = i + 1, decision = %value, "rule reduced");
                    }
                    EvaluationResult::Failure(e) => {
                        tracing::debug!(rule = i + 1, error = %e, "rule failed");
                    }
                }
                result
            })
            .collect()
    }

    pub fn reduce_term(&self, term: &Term<AttrId>, request: &Request) -> EvaluationResult<Value> {
        self.term(term, request, &mut Vec::new())
    }

    pub fn reduce_condition(
        &self,
        condition: &Condition<AttrId>,
        request: &Request,
    ) -> EvaluationResult<bool> {
        self.condition(condition, request)
    }

    pub fn reduce_rule(&self, rule: &Rule<AttrId>, request: &Request) -> EvaluationResult<Decision> {
        self.rule(rule, request)
    }

    // -- Terms ----------------------------------------------------

    /// `chain` holds the attributes currently being dereferenced, outermost
    /// first.
    fn term(
        &self,
        term: &Term<AttrId>,
        request: &Request,
        chain: &mut Vec<AttrId>,
    ) -> EvaluationResult<Value> {
        match term {
            Term::String(s) => EvaluationResult::success(Value::String(s.clone()), "string"),
            Term::Number(n) => EvaluationResult::success(Value::Number(*n), "number"),
            Term::Attribute(id) => self.attribute(*id, request, chain),
            Term::Coerce { from, to } => {
                let to: ValueType = *to;
                self.term(from, request, chain)
                    .try_map(|v| v.coerce(to), format!("to {}", to.name()))
            }
            Term::Expr { lhs, op, rhs } => {
                let l = self.term(lhs, request, chain);
                let r = self.term(rhs, request, chain);
                l.combine(r, |a, b| a.apply(*op, &b), op.symbol())
            }
            Term::Request(key) => match request.get(key) {
                Some(v) => EvaluationResult::success(
                    Value::String(v.clone()),
                    format!("request {}", key),
                ),
                None => {
                    EvaluationResult::failure(EvalError::MissingRequestParameter { key: key.clone() })
                }
            },
            Term::Rest {
                url,
                method,
                params,
            } => {
                let params = EvaluationResult::traverse(
                    params.iter().map(|(name, id)| (name.clone(), *id)),
                    |id| self.attribute(id, request, chain),
                    "params",
                );
                params.flat_map(
                    |values| self.call(url, *method, &values),
                    format!("{} {}", method.name(), url),
                )
            }
        }
    }

    fn attribute(
        &self,
        id: AttrId,
        request: &Request,
        chain: &mut Vec<AttrId>,
    ) -> EvaluationResult<Value> {
        let Some(attribute) = self.rule_set.attribute(id) else {
            return EvaluationResult::failure(EvalError::UnknownAttribute { id: id.0 });
        };
        if chain.contains(&id) {
            return EvaluationResult::failure(EvalError::AttributeCycle {
                attribute: attribute.name.clone(),
            });
        }
        if chain.len() >= self.depth_limit {
            return EvaluationResult::failure(EvalError::DepthExceeded {
                attribute: attribute.name.clone(),
                limit: self.depth_limit,
            });
        }
        chain.push(id);
        let result = self.term(&attribute.value, request, chain);
        chain.pop();
        result.map(|v| v, format!("attribute {}", attribute.name))
    }

    fn call(
        &self,
        url: &str,
        method: arbiter_core::RestMethod,
        params: &[(String, Value)],
    ) -> EvaluationResult<Value> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            tracing::warn!(url, "REST call cancelled");
            return EvaluationResult::failure(EvalError::Cancelled {
                url: url.to_string(),
            });
        }
        match self.rest.call(url, method, params) {
            Ok(body) => EvaluationResult::success(Value::String(body), "response"),
            Err(e) => {
                tracing::warn!(url, method = method.name(), error = %e, "REST call failed");
                EvaluationResult::failure(EvalError::ExternalCall {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    // -- Conditions -----------------------------------------------

    fn condition(&self, condition: &Condition<AttrId>, request: &Request) -> EvaluationResult<bool> {
        match condition {
            Condition::Not(c) => self.condition(c, request).map(|b| !b, "not"),
            Condition::And(l, r) => {
                let l = self.condition(l, request);
                let r = self.condition(r, request);
                l.combine(r, |a, b| Ok(a && b), "and")
            }
            Condition::Or(l, r) => {
                let l = self.condition(l, request);
                let r = self.condition(r, request);
                l.combine(r, |a, b| Ok(a || b), "or")
            }
            Condition::Equal(l, r) => {
                let l = self.term(l, request, &mut Vec::new());
                let r = self.term(r, request, &mut Vec::new());
                l.combine(r, |a, b| Ok(a.equals(&b)), "==")
            }
            Condition::Greater(l, r) => {
                let l = self.term(l, request, &mut Vec::new());
                let r = self.term(r, request, &mut Vec::new());
                l.combine(r, |a, b| a.greater(&b), ">")
            }
        }
    }

    // -- Rules ----------------------------------------------------

    fn rule(&self, rule: &Rule<AttrId>, request: &Request) -> EvaluationResult<Decision> {
        match rule {
            Rule::Always(d) => EvaluationResult::success(*d, "always"),
            Rule::Never => EvaluationResult::success(Decision::Undecided, "never"),
            Rule::When {
                condition,
                decision,
            } => {
                let decision = *decision;
                self.condition(condition, request).map(
                    |holds| if holds { decision } else { Decision::Undecided },
                    "when",
                )
            }
            Rule::Branch {
                condition,
                on_true,
                on_false,
            } => self.condition(condition, request).flat_map(
                |holds| {
                    let leg = if holds { on_true } else { on_false };
                    self.rule(leg, request)
                },
                "branch",
            ),
            Rule::Majority { decision, rules } => {
                let d = *decision;
                self.aggregate(rules, request, "majority", |ds| {
                    combinators::majority(d, ds)
                })
            }
            Rule::All { decision, rules } => {
                let d = *decision;
                self.aggregate(rules, request, "all", |ds| combinators::all(d, ds))
            }
            Rule::Any { decision, rules } => {
                let d = *decision;
                self.aggregate(rules, request, "any", |ds| combinators::any(d, ds))
            }
            Rule::OneOf(rules) => {
                self.aggregate(rules, request, "one-of", combinators::one_of)
            }
        }
    }

    /// Reduce every sub-rule, then fold the decisions. A failing sub-rule
    /// fails the parent.
    fn aggregate(
        &self,
        rules: &[Rule<AttrId>],
        request: &Request,
        label: &str,
        fold: impl FnOnce(&[Decision]) -> Decision,
    ) -> EvaluationResult<Decision> {
        let results: Vec<_> = rules.iter().map(|r| self.rule(r, request)).collect();
        EvaluationResult::aggregate(results, |ds| fold(ds.as_slice()), label)
    }
}
