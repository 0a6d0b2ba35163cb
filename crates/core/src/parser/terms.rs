use super::Parser;
use crate::ast::{Operator, RestMethod, Term, ValueType};
use crate::error::CompileError;
use crate::lexer::{is_keyword, Token};

impl<'a> Parser<'a> {
    // -- Term parsing ---------------------------------------------

    pub(super) fn parse_term(&mut self) -> Result<Term<String>, CompileError> {
        let subject = self.parse_additive()?;
        if self.is_word("matches") {
            self.advance();
            let pattern = self.parse_additive()?;
            return Ok(Term::expr(subject, Operator::Regex, pattern));
        }
        Ok(subject)
    }

    fn parse_additive(&mut self) -> Result<Term<String>, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => Operator::Plus,
                Token::Minus => Operator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Term::expr(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Term<String>, CompileError> {
        let mut left = self.parse_atom()?;
        loop {
            let op = match self.peek() {
                Token::Star => Operator::Multiply,
                Token::Slash => Operator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_atom()?;
            left = Term::expr(left, op, right);
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Term<String>, CompileError> {
        match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(Term::String(s))
            }
            Token::Int(n) => {
                self.advance();
                Ok(Term::Number(n))
            }
            Token::LParen => {
                self.advance();
                let inner = self.nested(|p| p.parse_term())?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Word(w) => match w.as_str() {
                "string" | "number" => {
                    self.advance();
                    let to = if w == "string" {
                        ValueType::String
                    } else {
                        ValueType::Number
                    };
                    let from = self.nested(|p| p.parse_term())?;
                    Ok(Term::coerce(from, to))
                }
                "request" => {
                    self.advance();
                    let key = self.take_str()?;
                    Ok(Term::Request(key))
                }
                _ => {
                    if let Some(method) = RestMethod::from_name(&w) {
                        self.advance();
                        return self.parse_rest(method);
                    }
                    let name = self.take_identifier()?;
                    Ok(Term::Attribute(name))
                }
            },
            _ => Err(self.unexpected("term")),
        }
    }

    fn parse_rest(&mut self, method: RestMethod) -> Result<Term<String>, CompileError> {
        let url = self.take_str()?;
        let mut params: Vec<(String, String)> = Vec::new();
        if self.at_rest_param(0) {
            loop {
                let name = self.take_identifier()?;
                if params.iter().any(|(n, _)| *n == name) {
                    return Err(self.err(format!("duplicate REST parameter '{}'", name)));
                }
                self.expect(Token::Eq, "'='")?;
                let attribute = self.take_identifier()?;
                params.push((name, attribute));

                // A comma continues the list only when another parameter follows;
                // otherwise it belongs to the enclosing rule list.
                if self.peek() == &Token::Comma && self.at_rest_param(1) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(Term::Rest {
            url,
            method,
            params,
        })
    }

    /// Whether `name = identifier` starts `offset` tokens ahead.
    fn at_rest_param(&self, offset: usize) -> bool {
        let is_name = |t: &Token| matches!(t, Token::Word(w) if !is_keyword(w));
        is_name(self.peek_at(offset))
            && self.peek_at(offset + 1) == &Token::Eq
            && is_name(self.peek_at(offset + 2))
    }
}
