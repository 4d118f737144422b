//! Recursive-descent parser producing an [`Expr`] tree.
//!
//! Precedence, lowest first: ternary, `||`, `&&`, equality, comparison,
//! additive, multiplicative, unary, postfix (member / index access).

use vellum_core::Value;

use crate::error::ParseError;
use crate::lexer::{Punct, Token, TokenKind, tokenize};

/// Depth limit for the parsed tree. Parenthesised, unary and conditional
/// sub-expressions count, and so does every link of an operator or
/// member/index chain.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

/// Parse a complete expression. Trailing input is an error.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    let tail = parser.peek();
    if tail.kind != TokenKind::Eof {
        return Err(ParseError::new("unexpected trailing input", tail.offset));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token list always ends with Eof and we never advance past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.peek().kind == TokenKind::Punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct, what: &str) -> Result<(), ParseError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(ParseError::new(format!("expected {what}"), self.peek().offset))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                "expression nested too deeply",
                self.peek().offset,
            ));
        }
        Ok(())
    }

    /// Release `levels` taken by [`Parser::enter`] on the way out of a chain.
    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let test = self.logical_or()?;
        let expr = if self.eat(Punct::Question) {
            let consequent = self.ternary()?;
            self.expect(Punct::Colon, "`:` in conditional expression")?;
            let alternate = self.ternary()?;
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        let mut levels = 0;
        while self.eat(Punct::OrOr) {
            self.enter()?;
            levels += 1;
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(levels);
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        let mut levels = 0;
        while self.eat(Punct::AndAnd) {
            self.enter()?;
            levels += 1;
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(levels);
        Ok(left)
    }

    fn binary_level(
        &mut self,
        ops: &[(Punct, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        let mut levels = 0;
        'outer: loop {
            for &(punct, op) in ops {
                if self.eat(punct) {
                    self.enter()?;
                    levels += 1;
                    let right = next(self)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.leave(levels);
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNotEq),
                (Punct::EqEq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::NotEq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Le, BinaryOp::Le),
                (Punct::Gt, BinaryOp::Gt),
                (Punct::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = if self.eat(Punct::Bang) {
            UnaryOp::Not
        } else if self.eat(Punct::Minus) {
            UnaryOp::Neg
        } else if self.eat(Punct::Plus) {
            UnaryOp::Plus
        } else {
            return self.postfix();
        };
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        let mut levels = 0;
        loop {
            if self.eat(Punct::Dot) {
                self.enter()?;
                levels += 1;
                let token = self.advance();
                let TokenKind::Ident(property) = token.kind else {
                    return Err(ParseError::new("expected property name after `.`", token.offset));
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(Punct::LBracket) {
                self.enter()?;
                levels += 1;
                let index = self.ternary()?;
                self.expect(Punct::RBracket, "`]`")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                self.leave(levels);
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "undefined" => Expr::Literal(Value::Undefined),
                _ => Expr::Ident(name),
            }),
            TokenKind::Punct(Punct::LParen) => {
                let inner = self.ternary()?;
                self.expect(Punct::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Eof => Err(ParseError::new("unexpected end of expression", token.offset)),
            TokenKind::Punct(p) => Err(ParseError::new(
                format!("unexpected token {p:?}"),
                token.offset,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.into()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse("a + b * 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: ident("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: ident("b"),
                    right: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse("10 - 3 - 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: num(10.0),
                    right: num(3.0),
                }),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn member_and_index_chain() {
        assert_eq!(
            parse("user.tags[0]").unwrap(),
            Expr::Index {
                object: Box::new(Expr::Member {
                    object: ident("user"),
                    property: "tags".into(),
                }),
                index: num(0.0),
            }
        );
    }

    #[test]
    fn ternary_is_right_associative() {
        let expr = parse("a ? 1 : b ? 2 : 3").unwrap();
        let Expr::Conditional { alternate, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*alternate, Expr::Conditional { .. }));
    }

    #[test]
    fn keywords_are_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(parse("undefined").unwrap(), Expr::Literal(Value::Undefined));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse("").unwrap_err().message, "unexpected end of expression");
        assert_eq!(parse("a b").unwrap_err().message, "unexpected trailing input");
        assert_eq!(parse("(a").unwrap_err().message, "expected `)`");
        assert_eq!(
            parse("a ? b").unwrap_err().message,
            "expected `:` in conditional expression"
        );
        assert!(parse("a.1").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let src = format!("{}1{}", "(".repeat(MAX_DEPTH + 5), ")".repeat(MAX_DEPTH + 5));
        assert_eq!(parse(&src).unwrap_err().message, "expression nested too deeply");

        let unary = format!("{}1", "!".repeat(MAX_DEPTH + 5));
        assert!(parse(&unary).is_err());
    }

    #[test]
    fn long_chains_are_rejected() {
        let sum = vec!["1"; 5_000].join(" + ");
        assert_eq!(parse(&sum).unwrap_err().message, "expression nested too deeply");

        let conj = vec!["a"; 5_000].join(" && ");
        assert!(parse(&conj).is_err());

        let members = format!("a{}", ".b".repeat(5_000));
        assert!(parse(&members).is_err());

        let indexes = format!("x{}", "[0]".repeat(5_000));
        assert!(parse(&indexes).is_err());
    }

    #[test]
    fn chains_within_the_limit_parse() {
        let sum = vec!["1"; MAX_DEPTH / 2].join(" + ");
        assert!(parse(&sum).is_ok());

        let members = format!("a{}", ".b".repeat(MAX_DEPTH / 2));
        assert!(parse(&members).is_ok());
    }

    #[test]
    fn chain_budget_is_released_between_operands() {
        // Sibling groups each use part of the budget but never all of it together.
        let group = format!("({})", vec!["1"; MAX_DEPTH / 2].join(" + "));
        let src = vec![group; 4].join(" * ");
        assert!(parse(&src).is_ok());
    }
}
