use super::Parser;
use crate::ast::{Decision, Rule};
use crate::error::CompileError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Rule parsing ---------------------------------------------

    fn parse_decision(&mut self) -> Result<Decision, CompileError> {
        if self.is_word("permit") {
            self.advance();
            Ok(Decision::Permit)
        } else if self.is_word("deny") {
            self.advance();
            Ok(Decision::Deny)
        } else {
            Err(self.unexpected("'permit' or 'deny'"))
        }
    }

    pub(super) fn parse_rule(&mut self) -> Result<Rule<String>, CompileError> {
        let Token::Word(w) = self.peek().clone() else {
            return Err(self.unexpected("rule"));
        };
        match w.as_str() {
            "always" => {
                self.advance();
                Ok(Rule::Always(self.parse_decision()?))
            }
            "never" => {
                self.advance();
                Ok(Rule::Never)
            }
            "permit" | "deny" => {
                let decision = self.parse_decision()?;
                self.expect_word("when")?;
                let condition = self.parse_condition()?;
                Ok(Rule::when(condition, decision))
            }
            "if" => {
                self.advance();
                self.nested(|p| {
                    let condition = p.parse_condition()?;
                    let on_true = p.parse_rule()?;
                    let on_false = if p.is_word("else") {
                        p.advance();
                        p.parse_rule()?
                    } else {
                        Rule::Never
                    };
                    Ok(Rule::branch(condition, on_true, on_false))
                })
            }
            "majority" | "all" | "any" => {
                self.advance();
                let decision = self.parse_decision()?;
                let rules = self.parse_rule_block()?;
                Ok(match w.as_str() {
                    "majority" => Rule::Majority { decision, rules },
                    "all" => Rule::All { decision, rules },
                    _ => Rule::Any { decision, rules },
                })
            }
            "exclusive" => {
                self.advance();
                Ok(Rule::OneOf(self.parse_rule_block()?))
            }
            _ => Err(self.unexpected("rule")),
        }
    }

    /// `{ rule (, rule)* }`
    fn parse_rule_block(&mut self) -> Result<Vec<Rule<String>>, CompileError> {
        self.expect(Token::LBrace, "'{'")?;
        let rules = self.nested(|p| {
            let mut rules = vec![p.parse_rule()?];
            while p.peek() == &Token::Comma {
                p.advance();
                rules.push(p.parse_rule()?);
            }
            Ok(rules)
        })?;
        self.expect(Token::RBrace, "',' or '}'")?;
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_rule;
    use crate::ast::{Condition, Decision, Rule, Term};

    fn a(name: &str) -> Term<String> {
        Term::Attribute(name.to_string())
    }

    fn s(v: &str) -> Term<String> {
        Term::String(v.to_string())
    }

    fn n(v: i64) -> Term<String> {
        Term::Number(v)
    }

    #[test]
    fn always_and_never() {
        assert_eq!(
            parse_rule("always permit").unwrap(),
            Rule::Always(Decision::Permit)
        );
        assert_eq!(parse_rule("always deny").unwrap(), Rule::Always(Decision::Deny));
        assert_eq!(parse_rule("never").unwrap(), Rule::Never);
    }

    #[test]
    fn when_rules() {
        assert_eq!(
            parse_rule("permit when abc = \"def\"").unwrap(),
            Rule::when(Condition::Equal(a("abc"), s("def")), Decision::Permit)
        );
        assert_eq!(
            parse_rule("deny when 23 > 22").unwrap(),
            Rule::when(Condition::Greater(n(23), n(22)), Decision::Deny)
        );
    }

    #[test]
    fn one_leg_branch_defaults_to_never() {
        assert_eq!(
            parse_rule("if \"abc\" = \"def\" always deny").unwrap(),
            Rule::branch(
                Condition::Equal(s("abc"), s("def")),
                Rule::Always(Decision::Deny),
                Rule::Never
            )
        );
    }

    #[test]
    fn two_leg_branch() {
        assert_eq!(
            parse_rule("if 2 > 1 always permit else always deny").unwrap(),
            Rule::branch(
                Condition::Greater(n(2), n(1)),
                Rule::Always(Decision::Permit),
                Rule::Always(Decision::Deny)
            )
        );
    }

    #[test]
    fn else_binds_to_nearest_if() {
        assert_eq!(
            parse_rule("if a = 1 if b = 2 always permit else always deny").unwrap(),
            Rule::branch(
                Condition::Equal(a("a"), n(1)),
                Rule::branch(
                    Condition::Equal(a("b"), n(2)),
                    Rule::Always(Decision::Permit),
                    Rule::Always(Decision::Deny)
                ),
                Rule::Never
            )
        );
    }

    #[test]
    fn combinators() {
        let pair = vec![Rule::Always(Decision::Permit), Rule::Always(Decision::Deny)];
        assert_eq!(
            parse_rule("majority permit { always permit, always deny }").unwrap(),
            Rule::Majority {
                decision: Decision::Permit,
                rules: pair.clone()
            }
        );
        assert_eq!(
            parse_rule("any permit { always permit, always deny }").unwrap(),
            Rule::Any {
                decision: Decision::Permit,
                rules: pair.clone()
            }
        );
        assert_eq!(
            parse_rule("all deny { always permit, always deny }").unwrap(),
            Rule::All {
                decision: Decision::Deny,
                rules: pair
            }
        );
        assert_eq!(
            parse_rule("exclusive { always permit, deny when a = b }").unwrap(),
            Rule::OneOf(vec![
                Rule::Always(Decision::Permit),
                Rule::when(Condition::Equal(a("a"), a("b")), Decision::Deny)
            ])
        );
    }

    #[test]
    fn nested_rule() {
        let src = r#"
            if foo = "bar"
              exclusive {
                permit when a > b,
                deny when a <= b
              }
            else
              always deny
        "#;
        assert_eq!(
            parse_rule(src).unwrap(),
            Rule::branch(
                Condition::Equal(a("foo"), s("bar")),
                Rule::OneOf(vec![
                    Rule::when(Condition::Greater(a("a"), a("b")), Decision::Permit),
                    Rule::when(
                        Condition::or(
                            Condition::Equal(a("a"), a("b")),
                            Condition::Greater(a("b"), a("a"))
                        ),
                        Decision::Deny
                    )
                ]),
                Rule::Always(Decision::Deny)
            )
        );
    }

    #[test]
    fn empty_block_is_rejected() {
        let err = parse_rule("any permit { }").unwrap_err();
        assert!(err.to_string().contains("expected rule, got '}'"), "{}", err);
    }

    #[test]
    fn unclosed_block_reports_expected_tokens() {
        let err = parse_rule("all permit { always permit always deny }").unwrap_err();
        assert!(err.to_string().contains("expected ',' or '}'"), "{}", err);
    }

    #[test]
    fn when_requires_condition() {
        assert!(parse_rule("permit when").is_err());
        assert!(parse_rule("deny foo = 1").is_err());
    }
}
