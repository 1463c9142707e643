//! Gate expression AST and its recursive-descent parser.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparisons, then literals,
//! flag names and parenthesized groups. Comparisons do not chain.

use story_graph::FlagValue;

use super::lexer::{tokenize, Token, TokenKind};
use super::GateError;

/// Deepest nesting accepted before parsing gives up.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    fn from_token(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Eq => Some(CompareOp::Eq),
            TokenKind::Ne => Some(CompareOp::Ne),
            TokenKind::Ge => Some(CompareOp::Ge),
            TokenKind::Le => Some(CompareOp::Le),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Lt => Some(CompareOp::Lt),
            _ => None,
        }
    }
}

/// Parsed gate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal written in the gate; numbers are always floats.
    Literal(FlagValue),
    /// Reference to a flag by name.
    Flag(String),
    Not(Box<Expr>),
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Parse a complete gate expression. Trailing tokens are an error.
pub(crate) fn parse(source: &str) -> Result<Expr, GateError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(Token {
            kind: TokenKind::RParen,
            position,
        }) => Err(GateError::UnbalancedParen {
            position: *position,
        }),
        Some(token) => Err(GateError::UnexpectedToken {
            found: token.kind.describe(),
            position: token.position,
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self, position: usize) -> Result<(), GateError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(GateError::TooDeep { position });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn current_position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(0)
    }

    fn parse_or(&mut self) -> Result<Expr, GateError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek_kind(), Some(TokenKind::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, GateError> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek_kind(), Some(TokenKind::And)) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, GateError> {
        if matches!(self.peek_kind(), Some(TokenKind::Not)) {
            let position = self.current_position();
            self.advance();
            self.enter(position)?;
            let inner = self.parse_not();
            self.leave();
            return Ok(Expr::Not(Box::new(inner?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, GateError> {
        let lhs = self.parse_primary()?;
        let Some(op) = self.peek_kind().and_then(CompareOp::from_token) else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_primary()?;

        if let Some(token) = self.peek() {
            if CompareOp::from_token(&token.kind).is_some() {
                return Err(GateError::UnexpectedToken {
                    found: token.kind.describe(),
                    position: token.position,
                });
            }
        }

        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, GateError> {
        let Some(token) = self.advance() else {
            return Err(GateError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::True => Ok(Expr::Literal(FlagValue::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(FlagValue::Bool(false))),
            TokenKind::Number(n) => Ok(Expr::Literal(FlagValue::Float(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(FlagValue::String(s))),
            TokenKind::Ident(name) => Ok(Expr::Flag(name)),
            TokenKind::Minus => match self.advance() {
                Some(Token {
                    kind: TokenKind::Number(n),
                    ..
                }) => Ok(Expr::Literal(FlagValue::Float(-n))),
                Some(other) => Err(GateError::UnexpectedToken {
                    found: other.kind.describe(),
                    position: other.position,
                }),
                None => Err(GateError::UnexpectedEnd),
            },
            TokenKind::LParen => {
                self.enter(token.position)?;
                let inner = self.parse_or();
                self.leave();
                let inner = inner?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(GateError::UnexpectedToken {
                        found: other.kind.describe(),
                        position: other.position,
                    }),
                    None => Err(GateError::UnbalancedParen {
                        position: token.position,
                    }),
                }
            }
            other => Err(GateError::UnexpectedToken {
                found: other.describe(),
                position: token.position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(name: &str) -> Box<Expr> {
        Box::new(Expr::Flag(name.to_string()))
    }

    fn number(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(FlagValue::Float(n)))
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a or b and c").unwrap();
        assert_eq!(
            expr,
            Expr::Logical {
                op: LogicalOp::Or,
                lhs: flag("a"),
                rhs: Box::new(Expr::Logical {
                    op: LogicalOp::And,
                    lhs: flag("b"),
                    rhs: flag("c"),
                }),
            }
        );
    }

    #[test]
    fn test_not_wraps_comparison() {
        let expr = parse("not reputation >= 3").unwrap();
        assert_eq!(
            expr,
            Expr::Not(Box::new(Expr::Compare {
                op: CompareOp::Ge,
                lhs: flag("reputation"),
                rhs: number(3.0),
            }))
        );
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse("not a and b").unwrap();
        assert_eq!(
            expr,
            Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(Expr::Not(flag("a"))),
                rhs: flag("b"),
            }
        );
    }

    #[test]
    fn test_parentheses_group() {
        let expr = parse("(a or b) and c").unwrap();
        assert!(matches!(
            expr,
            Expr::Logical {
                op: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_literal() {
        let expr = parse("karma > -2").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Gt,
                lhs: flag("karma"),
                rhs: number(-2.0),
            }
        );
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(
            parse("(a and b"),
            Err(GateError::UnbalancedParen { position: 0 })
        );
        assert_eq!(
            parse("a and b)"),
            Err(GateError::UnbalancedParen { position: 7 })
        );
    }

    #[test]
    fn test_chained_comparison_rejected() {
        assert!(matches!(
            parse("1 < x < 3"),
            Err(GateError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_function_call_rejected() {
        assert!(matches!(
            parse("len(items) > 2"),
            Err(GateError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_free_text_rejected() {
        assert!(parse("Persuasion DC 13").is_err());
        assert!(parse("Intimidation DC15").is_err());
    }

    #[test]
    fn test_dangling_operator() {
        assert_eq!(parse("a and"), Err(GateError::UnexpectedEnd));
        assert_eq!(parse("a >="), Err(GateError::UnexpectedEnd));
        assert_eq!(parse("- x").unwrap_err(), GateError::UnexpectedToken {
            found: "x".to_string(),
            position: 2,
        });
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse(&deep), Err(GateError::TooDeep { .. })));

        let fine = format!("{}a{}", "(".repeat(8), ")".repeat(8));
        assert_eq!(parse(&fine).unwrap(), Expr::Flag("a".to_string()));

        let nots = format!("{}a", "not ".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse(&nots), Err(GateError::TooDeep { .. })));
    }
}
