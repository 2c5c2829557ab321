//! I/O templates
//!
//! A template mixes literal text with `%name` and `%{expression}` substitution
//! sites. It is compiled once into an ordered segment list and reused every
//! time its statement runs.

use super::ast::{is_literal_name, BinaryOp, Expr};
use super::eval::{EvalContext, EvalError, Place};
use super::parser::{ExpressionParser, ParseError, ParseResult};

/// One parsed unit of a template, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Variable(String),
    Expression { text: String, expr: Expr },
}

/// Direction a template is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatString {
    pub text: String,
    pub direction: Direction,
    segments: Vec<Segment>,
}

/// Text produced by rendering an output template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    pub text: String,
    /// Non-fatal problems, reported after the text is printed
    pub warnings: Vec<String>,
}

impl FormatString {
    pub fn compile_output(text: &str) -> ParseResult<Self> {
        Self::compile(text, Direction::Output)
    }

    /// Compile an input template. Every `%{...}` site must be assignable.
    pub fn compile_input(text: &str) -> ParseResult<Self> {
        Self::compile(text, Direction::Input)
    }

    pub fn compile(text: &str, direction: Direction) -> ParseResult<Self> {
        let grammar = match direction {
            Direction::Output => ExpressionParser::condition(),
            Direction::Input => ExpressionParser::value(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(pct) = rest.find('%') {
            literal.push_str(&rest[..pct]);
            let after = &rest[pct + 1..];
            let site_offset = offset + pct;

            if let Some(body) = after.strip_prefix('{') {
                let close = body
                    .find('}')
                    .ok_or(ParseError::UnterminatedSubstitution { offset: site_offset })?;
                let inner = body[..close].trim();
                if inner.is_empty() {
                    return Err(ParseError::EmptySubstitution { offset: site_offset });
                }
                let expr = grammar
                    .parse_expr(inner)
                    .map_err(|e| ParseError::Substitution {
                        text: inner.to_string(),
                        source: Box::new(e),
                    })?;
                if direction == Direction::Input && !expr.is_assignable() {
                    return Err(ParseError::InputNotAssignable {
                        text: inner.to_string(),
                    });
                }
                flush(&mut literal, &mut segments);
                segments.push(Segment::Expression {
                    text: inner.to_string(),
                    expr,
                });
                let consumed = pct + 2 + close + 1;
                rest = &rest[consumed..];
                offset += consumed;
                continue;
            }

            let name_len = identifier_len(after);
            if name_len == 0 {
                // a lone '%' is literal text
                literal.push('%');
                rest = after;
                offset += pct + 1;
                continue;
            }

            let name = &after[..name_len];
            if direction == Direction::Input && is_literal_name(name) {
                return Err(ParseError::InputNotAssignable {
                    text: name.to_string(),
                });
            }
            flush(&mut literal, &mut segments);
            segments.push(Segment::Variable(name.to_string()));
            rest = &after[name_len..];
            offset += pct + 1 + name_len;
        }

        literal.push_str(rest);
        flush(&mut literal, &mut segments);

        Ok(Self {
            text: text.to_string(),
            direction,
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable references of every site, as `(name, subscripted)`
    pub fn variables(&self) -> Vec<(&str, bool)> {
        let mut found = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(_) => {}
                Segment::Variable(name) => found.push((name.as_str(), false)),
                Segment::Expression { expr, .. } => found.extend(expr.variables()),
            }
        }
        found
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Expression { expr, .. } => Some(expr),
            _ => None,
        })
    }

    pub fn uses_op(&self, op: BinaryOp) -> bool {
        self.expressions().any(|expr| expr.uses_op(op))
    }

    /// Render an output template.
    ///
    /// Sites that fail to evaluate are replaced by a placeholder and reported as
    /// warnings. Only [`EvalError::Halted`] (a failure already reported by a
    /// nested procedure call) is returned as an error.
    pub fn render(&self, ctx: &mut dyn EvalContext) -> Result<Rendered, EvalError> {
        let mut out = Rendered::default();
        for segment in &self.segments {
            let result = match segment {
                Segment::Literal(text) => {
                    out.text.push_str(text);
                    continue;
                }
                Segment::Variable(name) => Expr::ident(name.as_str()).evaluate(ctx),
                Segment::Expression { expr, .. } => expr.evaluate(ctx),
            };
            match result {
                Ok(v) => out.text.push_str(&v.to_string()),
                Err(EvalError::Halted) => return Err(EvalError::Halted),
                Err(err @ (EvalError::UndefinedVariable(_) | EvalError::UndefinedElement { .. })) => {
                    out.text.push_str("<undefined>");
                    out.warnings.push(format!("output: {}", err));
                }
                Err(err) => {
                    out.text.push_str("<error>");
                    out.warnings.push(format!("output: {}", err));
                }
            }
        }
        Ok(out)
    }
}

/// Resolve the assignment target of an input site
pub fn input_place(segment: &Segment, ctx: &mut dyn EvalContext) -> Option<Result<Place, EvalError>> {
    match segment {
        Segment::Literal(_) => None,
        Segment::Variable(name) => Some(Ok(Place {
            name: name.clone(),
            index: None,
        })),
        Segment::Expression { expr, .. } => Some(expr.place(ctx)),
    }
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn identifier_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    if bytes.is_empty() || !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return 0;
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}
