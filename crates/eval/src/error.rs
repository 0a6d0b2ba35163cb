//! Evaluation-time failures.
//!
//! An `EvalError` fails the branch of the tree it occurs in. It is never
//! converted into an `Undecided` decision.

/// Why a term, condition or rule could not be reduced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A `request "key"` term found no entry in the request.
    #[error("missing request parameter '{key}'")]
    MissingRequestParameter { key: String },
    /// A value could not be used as the type an operation requires.
    #[error("type coercion failed: {message}")]
    TypeCoercion { message: String },
    /// Checked integer arithmetic left the `i64` range.
    #[error("arithmetic overflow: {message}")]
    Overflow { message: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    /// The REST collaborator failed or timed out.
    #[error("call to {url} failed: {message}")]
    ExternalCall { url: String, message: String },
    /// The evaluation was cancelled before the REST call was made.
    #[error("call to {url} cancelled")]
    Cancelled { url: String },
    /// An attribute was reached again while its own value was being reduced.
    #[error("attribute '{attribute}' refers to itself")]
    AttributeCycle { attribute: String },
    /// The chain of nested attribute dereferences is longer than the limit.
    #[error("attribute '{attribute}' exceeds the dereference depth limit of {limit}")]
    DepthExceeded { attribute: String, limit: usize },
    /// An attribute id outside the rule set's arena.
    #[error("unknown attribute #{id}")]
    UnknownAttribute { id: usize },
}

impl EvalError {
    pub(crate) fn coercion(message: impl Into<String>) -> Self {
        EvalError::TypeCoercion {
            message: message.into(),
        }
    }

    /// Whether this failure belongs to the type coercion class
    /// (coercion proper and arithmetic overflow).
    pub fn is_type_coercion(&self) -> bool {
        matches!(
            self,
            EvalError::TypeCoercion { .. } | EvalError::Overflow { .. }
        )
    }
}
