//! arbiter-eval: reduces a resolved rule set against a request into
//! traced decisions.
//!
//! Each top-level rule produces an [`EvaluationResult<Decision>`]: either
//! the decision plus an explanation tree of how it was reached, or the
//! [`EvalError`] that stopped it. A failing rule never affects its
//! siblings.

pub mod combinators;
pub mod error;
pub mod evaluator;
pub mod rest;
pub mod result;
pub mod value;

pub use error::EvalError;
pub use evaluator::{Evaluator, Request, DEFAULT_DEPTH_LIMIT};
pub use rest::{NoRestClient, RestClient, RestError, UreqRestClient};
pub use result::{EvaluationResult, Explanation, TraceValue, Traceable};
pub use value::{Params, Value};

use arbiter_core::{AttrId, Decision, RuleSet};

/// Evaluate every top-level rule of `rule_set` against `request`.
///
/// Shorthand for [`Evaluator::new`] followed by [`Evaluator::evaluate`].
pub fn evaluate(
    rule_set: &RuleSet<AttrId>,
    request: &Request,
    rest: &dyn RestClient,
) -> Vec<EvaluationResult<Decision>> {
    Evaluator::new(rule_set, rest).evaluate(request)
}
