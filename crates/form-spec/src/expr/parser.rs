//! Recursive-descent parser for visibility conditions.
//!
//! ```text
//! or         := and ( "||" and )*
//! and        := comparison ( "&&" comparison )*
//! comparison := primary ( ( "==" | "!=" ) primary )*
//! primary    := "(" or ")" | QUOTED | WORD
//! ```

use super::lexer::{Token, TokenKind};
use super::{Expr, ExprError};

/// Bound on parenthesis nesting and on chained comparisons.
pub const MAX_DEPTH: usize = 64;

pub struct Parser<'a, F> {
    tokens: &'a [Token],
    cursor: usize,
    depth: usize,
    is_field: F,
}

impl<'a, F> Parser<'a, F>
where
    F: Fn(&str) -> bool,
{
    pub fn new(tokens: &'a [Token], is_field: F) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            is_field,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let expr = self.parse_or()?;
        match self.peek() {
            Some(token) => Err(unexpected(token)),
            None => Ok(expr),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut expressions = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            expressions.push(self.parse_and()?);
        }
        Ok(if expressions.len() == 1 {
            expressions.remove(0)
        } else {
            Expr::Or { expressions }
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut expressions = vec![self.parse_comparison()?];
        while self.eat(&TokenKind::And) {
            expressions.push(self.parse_comparison()?);
        }
        Ok(if expressions.len() == 1 {
            expressions.remove(0)
        } else {
            Expr::And { expressions }
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_primary()?;
        let mut chained = 0;
        loop {
            if matches!(
                self.peek().map(|token| &token.kind),
                Some(TokenKind::Eq | TokenKind::Ne)
            ) {
                chained += 1;
                if chained > MAX_DEPTH {
                    return Err(ExprError::TooDeep { limit: MAX_DEPTH });
                }
            }
            if self.eat(&TokenKind::Eq) {
                let right = self.parse_primary()?;
                left = Expr::Eq {
                    left: Box::new(left),
                    right: Box::new(right),
                };
            } else if self.eat(&TokenKind::Ne) {
                let right = self.parse_primary()?;
                left = Expr::Ne {
                    left: Box::new(left),
                    right: Box::new(right),
                };
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match &token.kind {
            TokenKind::LParen => {
                if self.depth >= MAX_DEPTH {
                    return Err(ExprError::TooDeep { limit: MAX_DEPTH });
                }
                self.depth += 1;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(unexpected(other)),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            TokenKind::Quoted(text) if (self.is_field)(text) => Ok(Expr::Field {
                label: text.clone(),
            }),
            TokenKind::Quoted(text) | TokenKind::Word(text) => Ok(Expr::Literal {
                value: text.clone(),
            }),
            _ => Err(unexpected(token)),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.cursor += 1;
                true
            }
            _ => false,
        }
    }
}

fn unexpected(token: &Token) -> ExprError {
    ExprError::UnexpectedToken {
        found: token.kind.to_string(),
        position: token.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lexer::tokenize;

    fn parse(source: &str) -> Result<Expr, ExprError> {
        let tokens = tokenize(source)?;
        Parser::new(&tokens, |label| matches!(label, "Gender" | "Subscribe" | "Age")).parse()
    }

    fn field(label: &str) -> Box<Expr> {
        Box::new(Expr::Field {
            label: label.into(),
        })
    }

    fn literal(value: &str) -> Box<Expr> {
        Box::new(Expr::Literal {
            value: value.into(),
        })
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("'Gender' == 'Male' || 'Age' == '30' && 'Subscribe' != 'true'")
            .expect("parse");
        assert_eq!(
            expr,
            Expr::Or {
                expressions: vec![
                    Expr::Eq {
                        left: field("Gender"),
                        right: literal("Male"),
                    },
                    Expr::And {
                        expressions: vec![
                            Expr::Eq {
                                left: field("Age"),
                                right: literal("30"),
                            },
                            Expr::Ne {
                                left: field("Subscribe"),
                                right: literal("true"),
                            },
                        ],
                    },
                ],
            }
        );
    }

    #[test]
    fn parentheses_group_alternatives() {
        let expr = parse("('Gender' == 'Male' || 'Gender' == 'Other') && 'Subscribe' == 'true'")
            .expect("parse");
        let Expr::And { expressions } = expr else {
            panic!("expected conjunction");
        };
        assert!(matches!(expressions[0], Expr::Or { .. }));
    }

    #[test]
    fn unknown_labels_stay_literals() {
        let expr = parse("'Colour' == 'Red'").expect("parse");
        assert_eq!(
            expr,
            Expr::Eq {
                left: literal("Colour"),
                right: literal("Red"),
            }
        );
    }

    #[test]
    fn missing_operand_is_an_error() {
        assert_eq!(parse("'Gender' =="), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            parse("== 'Male'"),
            Err(ExprError::UnexpectedToken { position: 0, .. })
        ));
    }

    #[test]
    fn unbalanced_parentheses_are_errors() {
        assert_eq!(parse("('Gender' == 'Male'"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            parse("'Gender' == 'Male')"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |levels: usize| {
            format!("{}'Gender' == 'Male'{}", "(".repeat(levels), ")".repeat(levels))
        };
        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(
            parse(&nested(MAX_DEPTH + 1)),
            Err(ExprError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&nested(20_000)),
            Err(ExprError::TooDeep { limit: MAX_DEPTH })
        );

        let chain = vec!["'a'"; MAX_DEPTH + 2].join(" == ");
        assert_eq!(parse(&chain), Err(ExprError::TooDeep { limit: MAX_DEPTH }));
    }

    #[test]
    fn empty_condition_is_an_error() {
        assert_eq!(parse("   "), Err(ExprError::Empty));
    }
}
