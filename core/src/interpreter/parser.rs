//! Expression parser
//!
//! Recursive descent over the token stream, with precedence climbing for the
//! binary operator levels. Two independent flags restrict the grammar for the
//! context an expression is typed into: operations may assign but not compare,
//! conditions may compare but not assign, return values may do neither.

use thiserror::Error;

use super::ast::{is_literal_name, BinaryOp, Expr, Expression, UnaryOp, PREC_OR};
use super::lexer::{tokenize, Token, TokenKind};

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("operator '{op}' is not allowed here (token {pos})")]
    BooleanNotAllowed { op: String, pos: usize },

    #[error("assignment is not allowed here (token {pos})")]
    AssignmentNotAllowed { pos: usize },

    #[error("cannot assign to the expression before '=' (token {pos})")]
    NotAssignable { pos: usize },

    #[error("unclosed '{open}' opened at token {pos}: expected '{close}' but {found}")]
    Unclosed {
        open: &'static str,
        close: &'static str,
        pos: usize,
        found: String,
    },

    #[error("unexpected {token} at token {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("expression ends where an operand was expected")]
    UnexpectedEnd,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unterminated '%{{' substitution at offset {offset}")]
    UnterminatedSubstitution { offset: usize },

    #[error("empty substitution at offset {offset}")]
    EmptySubstitution { offset: usize },

    #[error("input substitution '{text}' is not assignable")]
    InputNotAssignable { text: String },

    #[error("in substitution '{text}': {source}")]
    Substitution {
        text: String,
        #[source]
        source: Box<ParseError>,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Parser ===================== */

/// Grammar configuration for one expression context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionParser {
    pub allow_boolean: bool,
    pub allow_assignment: bool,
}

impl ExpressionParser {
    pub fn new(allow_boolean: bool, allow_assignment: bool) -> Self {
        Self {
            allow_boolean,
            allow_assignment,
        }
    }

    /// Grammar for operation statements
    pub fn operation() -> Self {
        Self::new(false, true)
    }

    /// Grammar for if/while conditions
    pub fn condition() -> Self {
        Self::new(true, false)
    }

    /// Grammar for return values
    pub fn value() -> Self {
        Self::new(false, false)
    }

    /// Parse expression text. Empty text yields an empty [`Expression`].
    pub fn parse(&self, text: &str) -> ParseResult<Expression> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Expression {
                text: text.to_string(),
                root: None,
            });
        }

        let mut state = State {
            config: *self,
            tokens,
            pos: 0,
        };
        let root = state.parse_assignment()?;
        if let Some(token) = state.peek() {
            return Err(ParseError::UnexpectedToken {
                token: token.to_string(),
                pos: state.pos + 1,
            });
        }

        Ok(Expression {
            text: text.to_string(),
            root: Some(root),
        })
    }

    /// Parse text that must not be empty
    pub fn parse_expr(&self, text: &str) -> ParseResult<Expr> {
        self.parse(text)?.root.ok_or(ParseError::UnexpectedEnd)
    }
}

struct State {
    config: ExpressionParser,
    tokens: Vec<Token>,
    pos: usize,
}

impl State {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_symbol(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(text))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        let lhs = self.parse_binary(PREC_OR)?;

        if !self.peek_symbol("=") {
            return Ok(lhs);
        }
        let eq_pos = self.pos + 1;
        if !self.config.allow_assignment {
            return Err(ParseError::AssignmentNotAllowed { pos: eq_pos });
        }
        // only a bare (optionally subscripted) name may be assigned; a parenthesized
        // assignment is grammatically reachable but rejected here
        if !matches!(&lhs, Expr::Identifier { name, .. } if !is_literal_name(name))
            || self.tokens[start].is_symbol("(")
        {
            return Err(ParseError::NotAssignable { pos: eq_pos });
        }
        self.advance();

        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target: Box::new(lhs),
            value: Box::new(value),
        })
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let token = self.peek()?;
        if token.kind != TokenKind::Symbol {
            return None;
        }
        let op = match token.text.as_str() {
            "or" => BinaryOp::Or,
            "and" => BinaryOp::And,
            "==" => BinaryOp::Eq,
            "<>" => BinaryOp::Neq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Lte,
            ">=" => BinaryOp::Gte,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "//" => BinaryOp::IDiv,
            "^" => BinaryOp::Pow,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over the binary operator levels
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            if op.is_boolean() && !self.config.allow_boolean {
                return Err(ParseError::BooleanNotAllowed {
                    op: op.symbol().to_string(),
                    pos: self.pos + 1,
                });
            }
            self.advance();

            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let rhs = self.parse_binary(next_min)?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = if self.peek_symbol("-") {
            UnaryOp::Negate
        } else if self.peek_symbol("not") {
            if !self.config.allow_boolean {
                return Err(ParseError::BooleanNotAllowed {
                    op: "not".to_string(),
                    pos: self.pos + 1,
                });
            }
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };
        self.advance();

        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        while self.peek_symbol("(") {
            let open = self.pos + 1;
            self.advance();
            let args = self.parse_args(open)?;
            expr = Expr::Call {
                callee: Box::new(expr),
                args,
            };
        }

        Ok(expr)
    }

    /// Argument list after '(', right recursive: `arg (',' rest)?`
    fn parse_args(&mut self, open: usize) -> ParseResult<Vec<Expr>> {
        if self.peek_symbol(")") {
            self.advance();
            return Ok(Vec::new());
        }

        let first = self.parse_assignment()?;
        if self.peek_symbol(",") {
            self.advance();
            let mut rest = self.parse_args(open)?;
            rest.insert(0, first);
            return Ok(rest);
        }

        self.expect_close("(", ")", open)?;
        Ok(vec![first])
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.pos + 1;
        let token = self.advance().ok_or(ParseError::UnexpectedEnd)?;

        match token.kind {
            TokenKind::Number => {
                let v = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(Expr::Number { v })
            }
            TokenKind::Identifier => {
                let index = if self.peek_symbol("[") {
                    let open = self.pos + 1;
                    self.advance();
                    let index = self.parse_assignment()?;
                    self.expect_close("[", "]", open)?;
                    Some(Box::new(index))
                } else {
                    None
                };
                Ok(Expr::Identifier {
                    name: token.text,
                    index,
                })
            }
            TokenKind::Symbol if token.text == "(" => {
                let inner = self.parse_assignment()?;
                self.expect_close("(", ")", pos)?;
                Ok(inner)
            }
            TokenKind::Symbol => Err(ParseError::UnexpectedToken {
                token: token.to_string(),
                pos,
            }),
        }
    }

    fn expect_close(&mut self, open: &'static str, close: &'static str, pos: usize) -> ParseResult<()> {
        match self.peek() {
            Some(token) if token.is_symbol(close) => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(ParseError::Unclosed {
                open,
                close,
                pos,
                found: format!("found {}", token),
            }),
            None => Err(ParseError::Unclosed {
                open,
                close,
                pos,
                found: "reached the end of the expression".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        ExpressionParser::new(true, true)
            .parse_expr(text)
            .expect("Should parse")
    }

    #[test]
    fn test_precedence_shapes() {
        assert_eq!(parse("1 + 2 * 3").to_source(), "1 + 2 * 3");
        assert_eq!(parse("(1 + 2) * 3").to_source(), "(1 + 2) * 3");
        assert_eq!(
            parse("2 ^ 3 ^ 2"),
            Expr::binary(
                BinaryOp::Pow,
                Expr::num(2.0),
                Expr::binary(BinaryOp::Pow, Expr::num(3.0), Expr::num(2.0))
            )
        );
        assert_eq!(
            parse("a or b and c"),
            Expr::binary(
                BinaryOp::Or,
                Expr::ident("a"),
                Expr::binary(BinaryOp::And, Expr::ident("b"), Expr::ident("c"))
            )
        );
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        match parse("-2 ^ 2") {
            Expr::Binary {
                op: BinaryOp::Pow,
                lhs,
                ..
            } => assert!(matches!(*lhs, Expr::Unary { op: UnaryOp::Negate, .. })),
            other => panic!("Expected Pow, got {:?}", other),
        }
        assert!(matches!(
            parse("not 1 == 1"),
            Expr::Binary {
                op: BinaryOp::Eq,
                ..
            }
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let e = parse("a = b = 3");
        match e {
            Expr::Assign { target, value } => {
                assert_eq!(*target, Expr::ident("a"));
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("Expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_calls_and_subscripts() {
        let e = parse("f(1, x[i + 1], g())");
        match e {
            Expr::Call { callee, args } => {
                assert_eq!(*callee, Expr::ident("f"));
                assert_eq!(args.len(), 3);
                assert_eq!(args[1].to_source(), "x[i + 1]");
                assert!(matches!(&args[2], Expr::Call { args, .. } if args.is_empty()));
            }
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_expression_is_not_an_error() {
        let parsed = ExpressionParser::condition().parse("   ").expect("Should parse");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_boolean_flag() {
        let err = ExpressionParser::operation().parse("not 1 == 1").unwrap_err();
        assert_eq!(
            err,
            ParseError::BooleanNotAllowed {
                op: "not".to_string(),
                pos: 1
            }
        );
        let err = ExpressionParser::value().parse("a < b").unwrap_err();
        assert!(matches!(err, ParseError::BooleanNotAllowed { ref op, pos: 2 } if op == "<"));
    }

    #[test]
    fn test_assignment_flag_and_target() {
        assert_eq!(
            ExpressionParser::condition().parse("a = 1").unwrap_err(),
            ParseError::AssignmentNotAllowed { pos: 2 }
        );
        let op = ExpressionParser::operation();
        assert!(matches!(op.parse("a + 1 = 2"), Err(ParseError::NotAssignable { pos: 4 })));
        assert!(matches!(op.parse("(a = b) = c"), Err(ParseError::NotAssignable { .. })));
        assert!(matches!(op.parse("true = 1"), Err(ParseError::NotAssignable { .. })));
        assert!(op.parse("v[2] = 1").is_ok());
    }

    #[test]
    fn test_distinct_structural_errors() {
        let op = ExpressionParser::operation();
        assert!(matches!(
            op.parse("(1 + 2"),
            Err(ParseError::Unclosed { open: "(", .. })
        ));
        assert!(matches!(
            op.parse("a[1"),
            Err(ParseError::Unclosed { open: "[", .. })
        ));
        assert!(matches!(
            op.parse("1 2"),
            Err(ParseError::UnexpectedToken { pos: 2, .. })
        ));
        assert!(matches!(
            op.parse("x mod 2"),
            Err(ParseError::UnexpectedToken { pos: 2, .. })
        ));
        assert_eq!(op.parse("1 +").unwrap_err(), ParseError::UnexpectedEnd);
    }

    #[test]
    fn test_error_messages_reference_tokens() {
        let err = ExpressionParser::operation().parse("f(1, 2").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unclosed '(' opened at token 2: expected ')' but reached the end of the expression"
        );
        let err = ExpressionParser::operation().parse("x = 1 )").unwrap_err();
        assert_eq!(err.to_string(), "unexpected ')' at token 4");
    }
}
