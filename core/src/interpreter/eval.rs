//! Expression evaluation
//!
//! Tree-walking evaluation over [`Expr`]. Variable access and procedure calls go
//! through an [`EvalContext`], so the same code serves the interpreter and
//! closed expressions evaluated from the CLI.

use thiserror::Error;

use super::ast::{is_literal_name, BinaryOp, Expr, UnaryOp};
use super::values::Val;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("variable '{name}' has no element {index}")]
    UndefinedElement { name: String, index: i64 },

    #[error("variable '{0}' is an array and needs a subscript")]
    ArrayNeedsIndex(String),

    #[error("variable '{0}' is not an array")]
    NotAnArray(String),

    #[error("'{0}' cannot be assigned to")]
    NotAssignable(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("no procedure named '{0}'")]
    UndefinedProcedure(String),

    #[error("expected a number for '{name}' but got '{token}'")]
    NonNumericInput { name: String, token: String },

    #[error("procedure '{name}' waited for input while being evaluated inside an expression")]
    InputInsideCall { name: String },

    #[error("procedure calls nested deeper than {0} levels")]
    CallDepth(usize),

    #[error("cannot evaluate an empty expression")]
    EmptyExpression,

    /// A nested procedure call already reported its failure and halted the run
    #[error("execution halted")]
    Halted,
}

pub type EvalResult<T> = Result<T, EvalError>;

/* ===================== Context ===================== */

/// A resolved assignment target
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub index: Option<i64>,
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// What evaluation needs from its surroundings
pub trait EvalContext {
    /// Read a variable, walking outward through enclosing scopes
    fn lookup(&self, name: &str, index: Option<i64>) -> EvalResult<Val>;

    /// Update the nearest binding of the place, or create it in the innermost scope
    fn store(&mut self, place: &Place, value: Val) -> EvalResult<()>;

    /// Invoke a procedure synchronously and return its result
    fn call(&mut self, name: &str, args: Vec<Val>) -> EvalResult<Val>;
}

/// Floor a numeric subscript to an integer key
pub fn index_key(v: Val) -> i64 {
    v.as_num().floor() as i64
}

/* ===================== Evaluation ===================== */

impl Expr {
    /// Evaluate to a value
    pub fn evaluate(&self, ctx: &mut dyn EvalContext) -> EvalResult<Val> {
        match self {
            Expr::Number { v } => Ok(Val::Num(*v)),

            Expr::Identifier { name, index } => {
                if index.is_none() {
                    match name.as_str() {
                        "true" => return Ok(Val::Bool(true)),
                        "false" => return Ok(Val::Bool(false)),
                        _ => {}
                    }
                }
                let key = match index {
                    Some(index) => Some(index_key(index.evaluate(ctx)?)),
                    None => None,
                };
                ctx.lookup(name, key)
            }

            Expr::Assign { target, value } => {
                let place = target.place(ctx)?;
                let v = value.evaluate(ctx)?;
                ctx.store(&place, v)?;
                Ok(v)
            }

            Expr::Unary { op, operand } => {
                let v = operand.evaluate(ctx)?;
                Ok(match op {
                    UnaryOp::Negate => Val::Num(-v.as_num()),
                    UnaryOp::Not => Val::Bool(!v.is_truthy()),
                })
            }

            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                let l = lhs.evaluate(ctx)?;
                if !l.is_truthy() {
                    return Ok(Val::Bool(false));
                }
                Ok(Val::Bool(rhs.evaluate(ctx)?.is_truthy()))
            }

            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => {
                let l = lhs.evaluate(ctx)?;
                if l.is_truthy() {
                    return Ok(Val::Bool(true));
                }
                Ok(Val::Bool(rhs.evaluate(ctx)?.is_truthy()))
            }

            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.evaluate(ctx)?.as_num();
                let r = rhs.evaluate(ctx)?.as_num();
                Ok(apply_binary(*op, l, r))
            }

            Expr::Call { callee, args } => {
                let name = match &**callee {
                    Expr::Identifier { name, index: None } if !is_literal_name(name) => name,
                    other => return Err(EvalError::NotCallable(other.to_source())),
                };
                // arguments are evaluated left to right before the call
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(ctx)?);
                }
                ctx.call(name, values)
            }
        }
    }

    /// Resolve this expression to an assignable place
    pub fn place(&self, ctx: &mut dyn EvalContext) -> EvalResult<Place> {
        match self {
            Expr::Identifier { name, index } if !is_literal_name(name) => {
                let index = match index {
                    Some(index) => Some(index_key(index.evaluate(ctx)?)),
                    None => None,
                };
                Ok(Place {
                    name: name.clone(),
                    index,
                })
            }
            Expr::Assign { target, .. } => target.place(ctx),
            other => Err(EvalError::NotAssignable(other.to_source())),
        }
    }
}

fn apply_binary(op: BinaryOp, l: f64, r: f64) -> Val {
    match op {
        BinaryOp::Eq => Val::Bool(l == r),
        BinaryOp::Neq => Val::Bool(l != r),
        BinaryOp::Lt => Val::Bool(l < r),
        BinaryOp::Gt => Val::Bool(l > r),
        BinaryOp::Lte => Val::Bool(l <= r),
        BinaryOp::Gte => Val::Bool(l >= r),
        BinaryOp::Add => Val::Num(l + r),
        BinaryOp::Sub => Val::Num(l - r),
        BinaryOp::Mul => Val::Num(l * r),
        BinaryOp::Div => Val::Num(l / r),
        BinaryOp::IDiv => Val::Num((l / r).floor()),
        BinaryOp::Pow => Val::Num(l.powf(r)),
        // short-circuit operators are handled before operands are evaluated
        BinaryOp::And => Val::Bool(l != 0.0 && r != 0.0),
        BinaryOp::Or => Val::Bool(l != 0.0 || r != 0.0),
    }
}

/* ===================== Closed Context ===================== */

/// A context with a flat variable table and no procedures.
///
/// Used to evaluate standalone expressions (the CLI `eval` command and tests).
#[derive(Debug, Default)]
pub struct ClosedContext {
    pub vars: std::collections::HashMap<String, Val>,
}

impl EvalContext for ClosedContext {
    fn lookup(&self, name: &str, index: Option<i64>) -> EvalResult<Val> {
        if index.is_some() {
            return Err(EvalError::NotAnArray(name.to_string()));
        }
        self.vars
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    fn store(&mut self, place: &Place, value: Val) -> EvalResult<()> {
        if place.index.is_some() {
            return Err(EvalError::NotAnArray(place.name.clone()));
        }
        self.vars.insert(place.name.clone(), value);
        Ok(())
    }

    fn call(&mut self, name: &str, _args: Vec<Val>) -> EvalResult<Val> {
        Err(EvalError::UndefinedProcedure(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::parser::ExpressionParser;
    use maplit::hashmap;

    fn eval(text: &str) -> EvalResult<Val> {
        let expr = ExpressionParser::new(true, true)
            .parse_expr(text)
            .expect("Should parse");
        expr.evaluate(&mut ClosedContext::default())
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Val::Num(7.0)));
        assert_eq!(eval("2 ^ 3 ^ 2"), Ok(Val::Num(512.0)));
        assert_eq!(eval("-2 ^ 2"), Ok(Val::Num(4.0)));
        assert_eq!(eval("7 // 2"), Ok(Val::Num(3.0)));
        assert_eq!(eval("-7 // 2"), Ok(Val::Num(-4.0)));
        assert_eq!(eval("1 / 0"), Ok(Val::Num(f64::INFINITY)));
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(eval("not 1 == 1"), Ok(Val::Bool(false)));
        assert_eq!(eval("1 < 2 and 2 <> 3"), Ok(Val::Bool(true)));
        assert_eq!(eval("true + 1"), Ok(Val::Num(2.0)));
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        // 'missing' would fail to resolve if evaluated
        assert_eq!(eval("false and missing"), Ok(Val::Bool(false)));
        assert_eq!(eval("true or missing"), Ok(Val::Bool(true)));
        assert_eq!(
            eval("true and missing"),
            Err(EvalError::UndefinedVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_assignment_chains_and_yields_value() {
        let expr = ExpressionParser::operation()
            .parse_expr("a = b = 4 + 1")
            .expect("Should parse");
        let mut ctx = ClosedContext::default();
        assert_eq!(expr.evaluate(&mut ctx), Ok(Val::Num(5.0)));
        assert_eq!(
            ctx.vars,
            hashmap! { "a".to_string() => Val::Num(5.0), "b".to_string() => Val::Num(5.0) }
        );
    }

    #[test]
    fn test_uncallable_callee() {
        assert_eq!(eval("(1 + 2)(3)"), Err(EvalError::NotCallable("1 + 2".to_string())));
        assert_eq!(eval("f(3)"), Err(EvalError::UndefinedProcedure("f".to_string())));
    }
}
