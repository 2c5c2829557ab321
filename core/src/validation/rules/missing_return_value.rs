//! Rule: Missing Return Value
//!
//! Warns when the value of a call is used but the called procedure never
//! returns one. The interpreter substitutes 0 at run time; generated C++
//! declares such a procedure `void` and will not compile.

use crate::interpreter::ast::Expr;
use crate::interpreter::program::{Program, Stmt};

use super::super::{nodes, stmt_expressions, ValidationError, ValidationRule};

pub struct MissingReturnValueRule;

impl ValidationRule for MissingReturnValueRule {
    fn id(&self) -> &'static str {
        "missing-return-value"
    }

    fn description(&self) -> &'static str {
        "procedures whose value is used should return one"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut warnings = Vec::new();

        for (id, stmt) in nodes(program) {
            let Some(scope) = program.enclosing_block(id) else {
                continue;
            };

            let mut used: Vec<&str> = Vec::new();
            for expr in stmt_expressions(stmt) {
                match (stmt, expr) {
                    // a bare call statement discards the value; only its arguments are used
                    (Stmt::Operation { .. }, Expr::Call { args, .. }) => {
                        for arg in args {
                            used.extend(arg.callees());
                        }
                    }
                    _ => used.extend(expr.callees()),
                }
            }

            for name in used {
                let returns = program
                    .find_block(scope, name)
                    .map(|block| program.contains_return(block));
                if returns == Some(false) {
                    warnings.push(ValidationError::warning(
                        program,
                        id,
                        format!("'{}' returns no value but its result is used", name),
                        self.id(),
                    ));
                }
            }
        }

        warnings
    }
}
