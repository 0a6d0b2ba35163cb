//! AST types for the Arbiter policy language.
//!
//! Every node is generic over `A`, the representation of an attribute
//! reference. The parser produces `A = String` (references by name); the
//! resolver relinks the tree to `A = AttrId` (references into the rule
//! set's attribute arena). Evaluation only ever sees the resolved form.

use std::fmt;

// ──────────────────────────────────────────────
// Attribute handles
// ──────────────────────────────────────────────

/// Index of an attribute in a resolved rule set's attribute list.
///
/// Two references to the same attribute carry the same id, so they share one
/// attribute node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub usize);

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ──────────────────────────────────────────────
// Enumerations
// ──────────────────────────────────────────────

/// Target type of a coercion term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Number => "NUMBER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "STRING" => Some(ValueType::String),
            "NUMBER" => Some(ValueType::Number),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary term operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Regex,
}

impl Operator {
    /// Symbol used in explanation labels.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Regex => "regex",
        }
    }

    /// Name used as the `type` discriminator in the JSON encoding.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Plus => "PLUS",
            Operator::Minus => "MINUS",
            Operator::Multiply => "MULTIPLY",
            Operator::Divide => "DIVIDE",
            Operator::Regex => "REGEX",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLUS" => Some(Operator::Plus),
            "MINUS" => Some(Operator::Minus),
            "MULTIPLY" => Some(Operator::Multiply),
            "DIVIDE" => Some(Operator::Divide),
            "REGEX" => Some(Operator::Regex),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// HTTP method of a REST-backed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RestMethod {
    pub fn name(self) -> &'static str {
        match self {
            RestMethod::Get => "GET",
            RestMethod::Post => "POST",
            RestMethod::Put => "PUT",
            RestMethod::Delete => "DELETE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(RestMethod::Get),
            "POST" => Some(RestMethod::Post),
            "PUT" => Some(RestMethod::Put),
            "DELETE" => Some(RestMethod::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for RestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a rule. `Undecided` doubles as the fail-safe value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Permit,
    Deny,
    Undecided,
}

impl Decision {
    pub fn name(self) -> &'static str {
        match self {
            Decision::Permit => "Permit",
            Decision::Deny => "Deny",
            Decision::Undecided => "Undecided",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Permit" => Some(Decision::Permit),
            "Deny" => Some(Decision::Deny),
            "Undecided" => Some(Decision::Undecided),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Terms, conditions, rules
// ──────────────────────────────────────────────

/// An expression producing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term<A> {
    String(String),
    Number(i64),
    Attribute(A),
    Coerce {
        from: Box<Term<A>>,
        to: ValueType,
    },
    Expr {
        lhs: Box<Term<A>>,
        op: Operator,
        rhs: Box<Term<A>>,
    },
    /// Reads a request parameter.
    Request(String),
    /// Calls an external endpoint. Each parameter is sent under its name with
    /// the value of the referenced attribute; order is declaration order.
    Rest {
        url: String,
        method: RestMethod,
        params: Vec<(String, A)>,
    },
}

impl<A> Term<A> {
    pub fn expr(lhs: Term<A>, op: Operator, rhs: Term<A>) -> Self {
        Term::Expr {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn coerce(from: Term<A>, to: ValueType) -> Self {
        Term::Coerce {
            from: Box::new(from),
            to,
        }
    }

    /// Rebuild this term with every attribute reference passed through `f`.
    pub fn map_refs<B, E, F>(&self, f: &mut F) -> Result<Term<B>, E>
    where
        F: FnMut(&A) -> Result<B, E>,
    {
        Ok(match self {
            Term::String(s) => Term::String(s.clone()),
            Term::Number(n) => Term::Number(*n),
            Term::Attribute(a) => Term::Attribute(f(a)?),
            Term::Coerce { from, to } => Term::Coerce {
                from: Box::new(from.map_refs(f)?),
                to: *to,
            },
            Term::Expr { lhs, op, rhs } => Term::Expr {
                lhs: Box::new(lhs.map_refs(f)?),
                op: *op,
                rhs: Box::new(rhs.map_refs(f)?),
            },
            Term::Request(key) => Term::Request(key.clone()),
            Term::Rest {
                url,
                method,
                params,
            } => {
                let mut mapped = Vec::with_capacity(params.len());
                for (name, a) in params {
                    mapped.push((name.clone(), f(a)?));
                }
                Term::Rest {
                    url: url.clone(),
                    method: *method,
                    params: mapped,
                }
            }
        })
    }
}

/// A boolean-valued expression over terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition<A> {
    Not(Box<Condition<A>>),
    And(Box<Condition<A>>, Box<Condition<A>>),
    Or(Box<Condition<A>>, Box<Condition<A>>),
    Equal(Term<A>, Term<A>),
    Greater(Term<A>, Term<A>),
}

impl<A> Condition<A> {
    pub fn not(c: Condition<A>) -> Self {
        Condition::Not(Box::new(c))
    }

    pub fn and(lhs: Condition<A>, rhs: Condition<A>) -> Self {
        Condition::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Condition<A>, rhs: Condition<A>) -> Self {
        Condition::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn map_refs<B, E, F>(&self, f: &mut F) -> Result<Condition<B>, E>
    where
        F: FnMut(&A) -> Result<B, E>,
    {
        Ok(match self {
            Condition::Not(c) => Condition::Not(Box::new(c.map_refs(f)?)),
            Condition::And(l, r) => {
                Condition::And(Box::new(l.map_refs(f)?), Box::new(r.map_refs(f)?))
            }
            Condition::Or(l, r) => {
                Condition::Or(Box::new(l.map_refs(f)?), Box::new(r.map_refs(f)?))
            }
            Condition::Equal(l, r) => Condition::Equal(l.map_refs(f)?, r.map_refs(f)?),
            Condition::Greater(l, r) => Condition::Greater(l.map_refs(f)?, r.map_refs(f)?),
        })
    }
}

/// A policy fragment producing a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule<A> {
    Always(Decision),
    /// Always `Undecided`.
    Never,
    When {
        condition: Condition<A>,
        decision: Decision,
    },
    /// Only the selected leg is evaluated.
    Branch {
        condition: Condition<A>,
        on_true: Box<Rule<A>>,
        on_false: Box<Rule<A>>,
    },
    Majority {
        decision: Decision,
        rules: Vec<Rule<A>>,
    },
    All {
        decision: Decision,
        rules: Vec<Rule<A>>,
    },
    Any {
        decision: Decision,
        rules: Vec<Rule<A>>,
    },
    OneOf(Vec<Rule<A>>),
}

impl<A> Rule<A> {
    pub fn when(condition: Condition<A>, decision: Decision) -> Self {
        Rule::When {
            condition,
            decision,
        }
    }

    pub fn branch(condition: Condition<A>, on_true: Rule<A>, on_false: Rule<A>) -> Self {
        Rule::Branch {
            condition,
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        }
    }

    pub fn map_refs<B, E, F>(&self, f: &mut F) -> Result<Rule<B>, E>
    where
        F: FnMut(&A) -> Result<B, E>,
    {
        fn map_all<A, B, E, F>(rules: &[Rule<A>], f: &mut F) -> Result<Vec<Rule<B>>, E>
        where
            F: FnMut(&A) -> Result<B, E>,
        {
            let mut mapped = Vec::with_capacity(rules.len());
            for r in rules {
                mapped.push(r.map_refs(f)?);
            }
            Ok(mapped)
        }

        Ok(match self {
            Rule::Always(d) => Rule::Always(*d),
            Rule::Never => Rule::Never,
            Rule::When {
                condition,
                decision,
            } => Rule::When {
                condition: condition.map_refs(f)?,
                decision: *decision,
            },
            Rule::Branch {
                condition,
                on_true,
                on_false,
            } => Rule::Branch {
                condition: condition.map_refs(f)?,
                on_true: Box::new(on_true.map_refs(f)?),
                on_false: Box::new(on_false.map_refs(f)?),
            },
            Rule::Majority { decision, rules } => Rule::Majority {
                decision: *decision,
                rules: map_all(rules, f)?,
            },
            Rule::All { decision, rules } => Rule::All {
                decision: *decision,
                rules: map_all(rules, f)?,
            },
            Rule::Any { decision, rules } => Rule::Any {
                decision: *decision,
                rules: map_all(rules, f)?,
            },
            Rule::OneOf(rules) => Rule::OneOf(map_all(rules, f)?),
        })
    }
}

// ──────────────────────────────────────────────
// Attributes and rule sets
// ──────────────────────────────────────────────

/// A named, reusable term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<A> {
    pub name: String,
    pub value: Term<A>,
}

impl<A> Attribute<A> {
    pub fn new(name: impl Into<String>, value: Term<A>) -> Self {
        Attribute {
            name: name.into(),
            value,
        }
    }
}

/// Attribute definitions plus the top-level rules evaluated against each
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet<A> {
    pub attributes: Vec<Attribute<A>>,
    pub rules: Vec<Rule<A>>,
}

impl<A> RuleSet<A> {
    pub fn new(attributes: Vec<Attribute<A>>, rules: Vec<Rule<A>>) -> Self {
        RuleSet { attributes, rules }
    }
}

impl RuleSet<AttrId> {
    /// The attribute node behind a resolved reference.
    pub fn attribute(&self, id: AttrId) -> Option<&Attribute<AttrId>> {
        self.attributes.get(id.0)
    }

    pub fn attribute_id(&self, name: &str) -> Option<AttrId> {
        self.attributes
            .iter()
            .position(|a| a.name == name)
            .map(AttrId)
    }

    /// Relink the rule set back to references by name.
    pub fn unresolve(&self) -> RuleSet<String> {
        let mut by_name = |id: &AttrId| -> Result<String, std::convert::Infallible> {
            Ok(self
                .attributes
                .get(id.0)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| id.to_string()))
        };
        let attributes = self
            .attributes
            .iter()
            .map(|a| match a.value.map_refs(&mut by_name) {
                Ok(value) => Attribute::new(a.name.clone(), value),
                Err(never) => match never {},
            })
            .collect();
        let rules = self
            .rules
            .iter()
            .map(|r| match r.map_refs(&mut by_name) {
                Ok(rule) => rule,
                Err(never) => match never {},
            })
            .collect();
        RuleSet { attributes, rules }
    }
}
