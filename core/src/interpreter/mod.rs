//! Expression language and flowchart interpreter
//!
//! Leaves first: [`lexer`] and [`parser`] turn text into [`ast::Expr`] trees,
//! [`eval`] evaluates them against an [`eval::EvalContext`], [`format_string`]
//! compiles I/O templates, [`program`] holds the statement tree and
//! [`executor`] runs it one suspendable step at a time.

pub mod ast;
pub mod eval;
pub mod executor;
pub mod format_string;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod scope;
pub mod values;

#[cfg(test)]
mod expression_tests;

pub use ast::{BinaryOp, Expr, Expression, UnaryOp};
pub use eval::{ClosedContext, EvalContext, EvalError};
pub use executor::{ExecutionLimits, Output, RuntimeError, VmState, VM};
pub use format_string::FormatString;
pub use parser::{ExpressionParser, ParseError};
pub use program::{NodeId, NodeRecord, Program, ProgramError, Stmt};
pub use values::Val;
