//! Traced evaluation results.
//!
//! An `EvaluationResult<T>` is either a success carrying a value, the label
//! of the operation that produced it and the explanations of its operands,
//! or a failure carrying the cause. Failures carry no partial trace.

use arbiter_core::Decision;

use crate::error::EvalError;
use crate::value::{Params, Value};

// ──────────────────────────────────────────────
// Explanation tree
// ──────────────────────────────────────────────

/// Value recorded at one node of an explanation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceValue {
    Value(Value),
    Bool(bool),
    Decision(Decision),
    Params(Params),
}

impl TraceValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TraceValue::Value(v) => v.to_json(),
            TraceValue::Bool(b) => serde_json::Value::Bool(*b),
            TraceValue::Decision(d) => serde_json::Value::String(d.name().to_string()),
            TraceValue::Params(params) => {
                let mut map = serde_json::Map::new();
                for (name, value) in params {
                    map.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

/// Types an `EvaluationResult` can carry.
pub trait Traceable {
    fn trace(&self) -> TraceValue;
}

impl Traceable for Value {
    fn trace(&self) -> TraceValue {
        TraceValue::Value(self.clone())
    }
}

impl Traceable for bool {
    fn trace(&self) -> TraceValue {
        TraceValue::Bool(*self)
    }
}

impl Traceable for Decision {
    fn trace(&self) -> TraceValue {
        TraceValue::Decision(*self)
    }
}

impl Traceable for Params {
    fn trace(&self) -> TraceValue {
        TraceValue::Params(self.clone())
    }
}

/// One node of the explanation tree: what was computed, by which step,
/// from which operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub value: TraceValue,
    pub description: String,
    pub children: Vec<Explanation>,
}

impl Explanation {
    /// `{"value": ..., "description": ..., "children": [...]}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "value": self.value.to_json(),
            "description": self.description,
            "children": self.children.iter().map(Explanation::to_json).collect::<Vec<_>>(),
        })
    }
}

// ──────────────────────────────────────────────
// EvaluationResult
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationResult<T> {
    Success {
        value: T,
        label: String,
        children: Vec<Explanation>,
    },
    Failure(EvalError),
}

impl<T> EvaluationResult<T> {
    /// A leaf success.
    pub fn success(value: T, label: impl Into<String>) -> Self {
        EvaluationResult::Success {
            value,
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn failure(error: EvalError) -> Self {
        EvaluationResult::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationResult::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            EvaluationResult::Success { value, .. } => Some(value),
            EvaluationResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&EvalError> {
        match self {
            EvaluationResult::Success { .. } => None,
            EvaluationResult::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T, EvalError> {
        match self {
            EvaluationResult::Success { value, .. } => Ok(value),
            EvaluationResult::Failure(e) => Err(e),
        }
    }
}

impl<T: Traceable> EvaluationResult<T> {
    /// The explanation tree rooted at this result, if it succeeded.
    pub fn explanation(&self) -> Option<Explanation> {
        match self {
            EvaluationResult::Success {
                value,
                label,
                children,
            } => Some(Explanation {
                value: value.trace(),
                description: label.clone(),
                children: children.clone(),
            }),
            EvaluationResult::Failure(_) => None,
        }
    }

    /// Split a success into its value and its own explanation node.
    fn into_parts(self) -> Result<(T, Explanation), EvalError> {
        match self {
            EvaluationResult::Success {
                value,
                label,
                children,
            } => {
                let node = Explanation {
                    value: value.trace(),
                    description: label,
                    children,
                };
                Ok((value, node))
            }
            EvaluationResult::Failure(e) => Err(e),
        }
    }

    /// Apply `f` to the value; this result becomes the sole child.
    pub fn map<U>(self, f: impl FnOnce(T) -> U, label: impl Into<String>) -> EvaluationResult<U> {
        self.try_map(|v| Ok(f(v)), label)
    }

    /// `map` with a fallible `f`.
    pub fn try_map<U>(
        self,
        f: impl FnOnce(T) -> Result<U, EvalError>,
        label: impl Into<String>,
    ) -> EvaluationResult<U> {
        let (value, node) = match self.into_parts() {
            Ok(parts) => parts,
            Err(e) => return EvaluationResult::Failure(e),
        };
        match f(value) {
            Ok(value) => EvaluationResult::Success {
                value,
                label: label.into(),
                children: vec![node],
            },
            Err(e) => EvaluationResult::Failure(e),
        }
    }

    /// Join two independently reduced operands. The left failure wins over
    /// the right one.
    pub fn combine<U: Traceable, V>(
        self,
        other: EvaluationResult<U>,
        f: impl FnOnce(T, U) -> Result<V, EvalError>,
        label: impl Into<String>,
    ) -> EvaluationResult<V> {
        let (l, l_node) = match self.into_parts() {
            Ok(parts) => parts,
            Err(e) => return EvaluationResult::Failure(e),
        };
        let (r, r_node) = match other.into_parts() {
            Ok(parts) => parts,
            Err(e) => return EvaluationResult::Failure(e),
        };
        match f(l, r) {
            Ok(value) => EvaluationResult::Success {
                value,
                label: label.into(),
                children: vec![l_node, r_node],
            },
            Err(e) => EvaluationResult::Failure(e),
        }
    }

    /// Continue with a computation that depends on the value. The children
    /// are this result followed by the inner one.
    pub fn flat_map<U: Traceable>(
        self,
        f: impl FnOnce(T) -> EvaluationResult<U>,
        label: impl Into<String>,
    ) -> EvaluationResult<U> {
        let (value, node) = match self.into_parts() {
            Ok(parts) => parts,
            Err(e) => return EvaluationResult::Failure(e),
        };
        match f(value).into_parts() {
            Ok((value, inner)) => EvaluationResult::Success {
                value,
                label: label.into(),
                children: vec![node, inner],
            },
            Err(e) => EvaluationResult::Failure(e),
        }
    }

    /// Fold already reduced siblings into one value. The first failure in
    /// list order wins; otherwise every sibling becomes a child.
    pub fn aggregate<U>(
        results: Vec<EvaluationResult<T>>,
        f: impl FnOnce(Vec<T>) -> U,
        label: impl Into<String>,
    ) -> EvaluationResult<U> {
        let mut values = Vec::with_capacity(results.len());
        let mut children = Vec::with_capacity(results.len());
        for result in results {
            match result.into_parts() {
                Ok((value, node)) => {
                    values.push(value);
                    children.push(node);
                }
                Err(e) => return EvaluationResult::Failure(e),
            }
        }
        EvaluationResult::Success {
            value: f(values),
            label: label.into(),
            children,
        }
    }

    /// Reduce every named entry in order, failing fast on the first failure.
    pub fn traverse<X>(
        entries: impl IntoIterator<Item = (String, X)>,
        mut f: impl FnMut(X) -> EvaluationResult<T>,
        label: impl Into<String>,
    ) -> EvaluationResult<Vec<(String, T)>> {
        let mut values = Vec::new();
        let mut children = Vec::new();
        for (name, entry) in entries {
            match f(entry).into_parts() {
                Ok((value, node)) => {
                    values.push((name, value));
                    children.push(node);
                }
                Err(e) => return EvaluationResult::Failure(e),
            }
        }
        EvaluationResult::Success {
            value: values,
            label: label.into(),
            children,
        }
    }
}
