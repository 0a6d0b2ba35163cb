use super::Parser;
use crate::ast::Condition;
use crate::error::CompileError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Condition parsing ----------------------------------------

    pub(super) fn parse_condition(&mut self) -> Result<Condition<String>, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Condition<String>, CompileError> {
        let mut left = self.parse_and()?;
        while self.is_word("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Condition::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition<String>, CompileError> {
        let mut left = self.parse_unary()?;
        while self.is_word("and") {
            self.advance();
            let right = self.parse_unary()?;
            left = Condition::and(left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Condition<String>, CompileError> {
        if self.is_word("not") {
            self.advance();
            let c = self.nested(|p| p.parse_unary())?;
            return Ok(Condition::not(c));
        }

        // `(` opens either a grouped condition or a comparison whose left
        // operand is a parenthesised term. Try the condition first.
        if self.peek() == &Token::LParen {
            let start = self.pos;
            self.advance();
            if let Ok(c) = self.nested(|p| p.parse_condition()) {
                if self.peek() == &Token::RParen {
                    self.advance();
                    return Ok(c);
                }
            }
            self.pos = start;
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Condition<String>, CompileError> {
        let left = self.parse_term()?;
        let op = self.peek().clone();
        match op {
            Token::Eq | Token::Neq | Token::Lt | Token::Lte | Token::Gt | Token::Gte => {
                self.advance();
            }
            _ => return Err(self.unexpected("comparison operator")),
        }
        let right = self.parse_term()?;

        Ok(match op {
            Token::Eq => Condition::Equal(left, right),
            Token::Neq => Condition::not(Condition::Equal(left, right)),
            Token::Gt => Condition::Greater(left, right),
            Token::Lt => Condition::Greater(right, left),
            Token::Gte => Condition::or(
                Condition::Equal(left.clone(), right.clone()),
                Condition::Greater(left, right),
            ),
            _ => Condition::or(
                Condition::Equal(left.clone(), right.clone()),
                Condition::Greater(right, left),
            ),
        })
    }
}
