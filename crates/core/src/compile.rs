//! Compile pipeline: source -> tokens -> by-name AST -> resolved rule set.
//!
//! This is a thin orchestrator over the lexer, parser and resolver.

use crate::ast::{AttrId, RuleSet};
use crate::error::CompileError;
use crate::{lexer, parser, resolve};
use std::path::Path;

/// Compile policy source into an evaluable rule set, or return the first
/// error encountered.
pub fn compile(src: &str, filename: &str) -> Result<RuleSet<AttrId>, CompileError> {
    let tokens = lexer::lex(src, filename)?;
    tracing::debug!(file = filename, tokens = tokens.len(), "lexed policy source");
    let parsed = parser::parse(&tokens, filename)?;
    resolve::resolve(&parsed)
}

/// Read and compile a policy file.
pub fn compile_file(path: &Path) -> Result<RuleSet<AttrId>, CompileError> {
    let src = std::fs::read_to_string(path).map_err(|e| CompileError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    compile(&src, &path.display().to_string())
}
