//! Restricted condition language used by `visibilityCondition`.
//!
//! Conditions are tokenized, parsed into an [`Expr`] and evaluated against a
//! [`FieldLookup`]. Nothing is ever executed as code.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::FieldValue;

pub mod lexer;
pub mod parser;

/// Failure while reading or evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("condition is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("unterminated quoted text starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("condition ends before an operand")]
    UnexpectedEnd,
    #[error("condition nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("'{value}' cannot be used as a boolean")]
    NotBoolean { value: String },
    #[error("'{label}' does not name a field")]
    UnknownField { label: String },
}

/// Condition AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Literal { value: String },
    Field { label: String },
    Eq { left: Box<Expr>, right: Box<Expr> },
    Ne { left: Box<Expr>, right: Box<Expr> },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
}

/// Result of resolving a field label against live state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Value(&'a FieldValue),
    /// The field exists but currently has no value (unanswered or hidden).
    Absent,
    Unknown,
}

/// Live state a condition is evaluated against.
pub trait FieldLookup {
    fn lookup(&self, label: &str) -> Lookup<'_>;
}

/// Label-keyed values, handy for evaluating a condition in isolation.
impl FieldLookup for BTreeMap<String, FieldValue> {
    fn lookup(&self, label: &str) -> Lookup<'_> {
        match self.get(label) {
            Some(value) => Lookup::Value(value),
            None => Lookup::Unknown,
        }
    }
}

/// Evaluated operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    Text(Cow<'a, str>),
    List(&'a [String]),
    Bool(bool),
}

impl Operand<'_> {
    fn text(&self) -> Cow<'_, str> {
        match self {
            Operand::Text(text) => Cow::Borrowed(text.as_ref()),
            Operand::Bool(flag) => Cow::Owned(flag.to_string()),
            Operand::List(items) => Cow::Owned(items.join(",")),
        }
    }

    fn truthy(&self) -> Result<bool, ExprError> {
        match self {
            Operand::Bool(flag) => Ok(*flag),
            Operand::List(items) => Ok(!items.is_empty()),
            Operand::Text(text) => match text.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(true),
                "false" | "no" | "n" | "0" | "" => Ok(false),
                _ => Err(ExprError::NotBoolean {
                    value: text.to_string(),
                }),
            },
        }
    }
}

/// Equality where a list on either side means membership.
fn operands_equal(left: &Operand<'_>, right: &Operand<'_>) -> bool {
    match (left, right) {
        (Operand::List(left), Operand::List(right)) => left == right,
        (Operand::List(items), scalar) | (scalar, Operand::List(items)) => {
            let needle = scalar.text();
            items.iter().any(|item| item.as_str() == needle.as_ref())
        }
        _ => left.text() == right.text(),
    }
}

impl Expr {
    /// Parses a condition, asking `check_if_field_exists` which quoted tokens are labels.
    pub fn parse<F>(source: &str, check_if_field_exists: F) -> Result<Expr, ExprError>
    where
        F: Fn(&str) -> bool,
    {
        let tokens = lexer::tokenize(source)?;
        parser::Parser::new(&tokens, check_if_field_exists).parse()
    }

    /// Distinct field labels this condition reads.
    pub fn field_labels(&self) -> BTreeSet<&str> {
        let mut labels = BTreeSet::new();
        self.collect_labels(&mut labels);
        labels
    }

    fn collect_labels<'a>(&'a self, labels: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Field { label } => {
                labels.insert(label.as_str());
            }
            Expr::Eq { left, right } | Expr::Ne { left, right } => {
                left.collect_labels(labels);
                right.collect_labels(labels);
            }
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expression in expressions {
                    expression.collect_labels(labels);
                }
            }
        }
    }

    /// Evaluates the condition to a boolean.
    pub fn evaluate<C>(&self, ctx: &C) -> Result<bool, ExprError>
    where
        C: FieldLookup + ?Sized,
    {
        match self {
            Expr::And { expressions } => {
                for expression in expressions {
                    if !expression.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or { expressions } => {
                for expression in expressions {
                    if expression.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => other.evaluate_operand(ctx)?.truthy(),
        }
    }

    pub fn evaluate_operand<'c, C>(&'c self, ctx: &'c C) -> Result<Operand<'c>, ExprError>
    where
        C: FieldLookup + ?Sized,
    {
        match self {
            Expr::Literal { value } => Ok(Operand::Text(Cow::Borrowed(value))),
            Expr::Field { label } => match ctx.lookup(label) {
                Lookup::Value(FieldValue::Scalar(text)) => Ok(Operand::Text(Cow::Borrowed(text))),
                Lookup::Value(FieldValue::Multi(items)) => Ok(Operand::List(items)),
                Lookup::Absent => Ok(Operand::Text(Cow::Borrowed(""))),
                Lookup::Unknown => Err(ExprError::UnknownField {
                    label: label.clone(),
                }),
            },
            Expr::Eq { left, right } => {
                let left = left.evaluate_operand(ctx)?;
                let right = right.evaluate_operand(ctx)?;
                Ok(Operand::Bool(operands_equal(&left, &right)))
            }
            Expr::Ne { left, right } => {
                let left = left.evaluate_operand(ctx)?;
                let right = right.evaluate_operand(ctx)?;
                Ok(Operand::Bool(!operands_equal(&left, &right)))
            }
            Expr::And { .. } | Expr::Or { .. } => self.evaluate(ctx).map(Operand::Bool),
        }
    }
}
