//! Rule: Empty Condition
//!
//! Reports an error for `if` and `while` statements whose condition text is
//! empty. Running one halts the program.

use crate::interpreter::program::{Program, Stmt};

use super::super::{nodes, ValidationError, ValidationRule};

pub struct EmptyConditionRule;

impl ValidationRule for EmptyConditionRule {
    fn id(&self) -> &'static str {
        "empty-condition"
    }

    fn description(&self) -> &'static str {
        "if and while statements need a condition"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        nodes(program)
            .filter_map(|(id, stmt)| match stmt {
                Stmt::If { cond, .. } if cond.is_empty() => Some((id, "if")),
                Stmt::While { cond, .. } if cond.is_empty() => Some((id, "while")),
                _ => None,
            })
            .map(|(id, kind)| {
                ValidationError::error(program, id, format!("{} condition is empty", kind), self.id())
            })
            .collect()
    }
}
