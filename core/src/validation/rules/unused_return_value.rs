//! Rule: Unused Return Value
//!
//! Warns when an operation is a bare call to a procedure that returns a
//! value, since the value is thrown away.

use crate::interpreter::ast::Expr;
use crate::interpreter::program::{Program, Stmt};

use super::super::{nodes, ValidationError, ValidationRule};

pub struct UnusedReturnValueRule;

impl ValidationRule for UnusedReturnValueRule {
    fn id(&self) -> &'static str {
        "unused-return-value"
    }

    fn description(&self) -> &'static str {
        "values returned by procedures should be used"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut warnings = Vec::new();

        for (id, stmt) in nodes(program) {
            let Stmt::Operation { expr } = stmt else {
                continue;
            };
            let Some(Expr::Call { callee, .. }) = &expr.root else {
                continue;
            };
            let Expr::Identifier { name, index: None } = &**callee else {
                continue;
            };
            let returns = program
                .enclosing_block(id)
                .and_then(|scope| program.find_block(scope, name))
                .is_some_and(|block| program.contains_return(block));
            if returns {
                warnings.push(ValidationError::warning(
                    program,
                    id,
                    format!("the value returned by '{}' is discarded", name),
                    self.id(),
                ));
            }
        }

        warnings
    }
}
