/// An error raised while turning policy source into an evaluable rule set.
///
/// Compile errors are fatal: a rule set that fails to lex, parse or resolve
/// never becomes evaluable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The source does not match the grammar at the given position.
    #[error("{file}:{line}:{column}: syntax error: {message}")]
    Syntax {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },

    /// A term or REST parameter names an attribute that is never defined.
    #[error("unresolved reference to attribute '{name}' in {context}")]
    UnresolvedReference { name: String, context: String },

    /// Two attribute definitions share a name.
    #[error("duplicate attribute '{name}'")]
    DuplicateAttribute { name: String },

    /// The policy file could not be read.
    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },
}

impl CompileError {
    pub fn syntax(file: &str, line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn unresolved(name: &str, context: impl Into<String>) -> Self {
        CompileError::UnresolvedReference {
            name: name.to_owned(),
            context: context.into(),
        }
    }
}
