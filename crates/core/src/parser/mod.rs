//! Recursive-descent parser producing the by-name AST.
//!
//! No reference checking happens here -- that is the resolver's job.
use crate::ast::{Attribute, Condition, Rule, RuleSet, Term};
use crate::error::CompileError;
use crate::lexer::{self, is_keyword, Spanned, Token};

mod conditions;
mod rules;
mod terms;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

/// Deepest allowed nesting of parentheses, `not`, coercions, `if` and rule
/// blocks, counted together.
pub const MAX_NESTING: usize = 128;

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(self.err(format!(
                "nesting too deep (more than {} levels)",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    /// Token `n` places ahead of the current one.
    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> CompileError {
        let cur = self.cur();
        CompileError::syntax(&self.filename, cur.line, cur.column, msg)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        self.err(format!("expected {}, got {}", expected, describe(self.peek())))
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn expect_word(&mut self, expected: &str) -> Result<(), CompileError> {
        if self.is_word(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), CompileError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// A non-keyword word: an attribute or parameter name.
    fn take_identifier(&mut self) -> Result<String, CompileError> {
        match self.peek().clone() {
            Token::Word(w) if !is_keyword(&w) => {
                self.advance();
                Ok(w)
            }
            Token::Word(w) => Err(self.err(format!(
                "'{}' is a reserved word and cannot be used as a name",
                w
            ))),
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn take_str(&mut self) -> Result<String, CompileError> {
        if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Ok(s)
        } else {
            Err(self.unexpected("string literal"))
        }
    }

    fn expect_eof(&self) -> Result<(), CompileError> {
        if self.peek() == &Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // -- Rule sets ----------------------------------------------

    fn at_attribute_def(&self) -> bool {
        matches!(self.peek(), Token::Word(w) if !is_keyword(w)) && self.peek_at(1) == &Token::Eq
    }

    fn parse_attribute(&mut self) -> Result<Attribute<String>, CompileError> {
        let name = self.take_identifier()?;
        self.expect(Token::Eq, "'='")?;
        let value = self.parse_term()?;
        Ok(Attribute::new(name, value))
    }

    fn parse_rule_set(&mut self) -> Result<RuleSet<String>, CompileError> {
        let mut attributes = Vec::new();
        while self.at_attribute_def() {
            attributes.push(self.parse_attribute()?);
        }

        let mut rules = Vec::new();
        while self.peek() != &Token::Eof {
            rules.push(self.parse_rule()?);
        }
        if rules.is_empty() {
            return Err(self.unexpected("at least one rule"));
        }

        Ok(RuleSet::new(attributes, rules))
    }
}

/// Human-readable token description for error messages.
fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) if is_keyword(w) => format!("keyword '{}'", w),
        Token::Word(w) => format!("identifier '{}'", w),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Int(n) => format!("number {}", n),
        Token::LBrace => "'{'".to_owned(),
        Token::RBrace => "'}'".to_owned(),
        Token::LParen => "'('".to_owned(),
        Token::RParen => "')'".to_owned(),
        Token::Comma => "','".to_owned(),
        Token::Eq => "'='".to_owned(),
        Token::Neq => "'!='".to_owned(),
        Token::Lt => "'<'".to_owned(),
        Token::Lte => "'<='".to_owned(),
        Token::Gt => "'>'".to_owned(),
        Token::Gte => "'>='".to_owned(),
        Token::Plus => "'+'".to_owned(),
        Token::Minus => "'-'".to_owned(),
        Token::Star => "'*'".to_owned(),
        Token::Slash => "'/'".to_owned(),
        Token::Eof => "end of input".to_owned(),
    }
}

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse a token stream into a by-name rule set.
pub fn parse(tokens: &[Spanned], filename: &str) -> Result<RuleSet<String>, CompileError> {
    let mut p = Parser::new(tokens, filename);
    let rule_set = p.parse_rule_set()?;
    tracing::debug!(
        file = filename,
        attributes = rule_set.attributes.len(),
        rules = rule_set.rules.len(),
        "parsed rule set"
    );
    Ok(rule_set)
}

/// Lex and parse policy source into a by-name rule set.
pub fn parse_source(src: &str, filename: &str) -> Result<RuleSet<String>, CompileError> {
    let tokens = lexer::lex(src, filename)?;
    parse(&tokens, filename)
}

/// Parse a single production, requiring it to consume the whole input.
fn parse_whole<T>(
    src: &str,
    production: impl FnOnce(&mut Parser<'_>) -> Result<T, CompileError>,
) -> Result<T, CompileError> {
    let tokens = lexer::lex(src, "<input>")?;
    let mut p = Parser::new(&tokens, "<input>");
    let node = production(&mut p)?;
    p.expect_eof()?;
    Ok(node)
}

pub fn parse_term(src: &str) -> Result<Term<String>, CompileError> {
    parse_whole(src, |p| p.parse_term())
}

pub fn parse_condition(src: &str) -> Result<Condition<String>, CompileError> {
    parse_whole(src, |p| p.parse_condition())
}

pub fn parse_rule(src: &str) -> Result<Rule<String>, CompileError> {
    parse_whole(src, |p| p.parse_rule())
}

pub fn parse_attribute(src: &str) -> Result<Attribute<String>, CompileError> {
    parse_whole(src, |p| p.parse_attribute())
}
