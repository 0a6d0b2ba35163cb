//! arbiter-core: the Arbiter policy language front end.
//!
//! Turns policy source into an evaluable rule set in three stages:
//!
//! - [`lexer::lex`] -- source text to positioned tokens
//! - [`parser::parse`] -- tokens to a by-name [`RuleSet<String>`]
//! - [`resolve::resolve`] -- by-name to by-reference [`RuleSet<AttrId>`]
//!
//! [`compile()`] runs all three.

pub mod ast;
pub mod compile;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolve;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    AttrId, Attribute, Condition, Decision, Operator, RestMethod, Rule, RuleSet, Term, ValueType,
};
pub use error::CompileError;

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::{compile, compile_file};
pub use parser::parse_source;
pub use resolve::resolve;
