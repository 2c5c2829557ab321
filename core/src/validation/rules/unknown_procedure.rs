//! Rule: Unknown Procedure
//!
//! Reports an error for every call whose name does not resolve to a block,
//! using the same lookup the interpreter performs.

use crate::interpreter::program::Program;

use super::super::{nodes, stmt_expressions, ValidationError, ValidationRule};

pub struct UnknownProcedureRule;

impl ValidationRule for UnknownProcedureRule {
    fn id(&self) -> &'static str {
        "unknown-procedure"
    }

    fn description(&self) -> &'static str {
        "called procedures must exist"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (id, stmt) in nodes(program) {
            let Some(scope) = program.enclosing_block(id) else {
                continue;
            };
            for expr in stmt_expressions(stmt) {
                for name in expr.callees() {
                    if program.find_block(scope, name).is_none() {
                        errors.push(ValidationError::error(
                            program,
                            id,
                            format!("no procedure named '{}'", name),
                            self.id(),
                        ));
                    }
                }
            }
        }

        errors
    }
}
