//! Rule: Break Outside Loop
//!
//! Reports an error for a `break` with no enclosing `while` in the same
//! procedure. At run time such a break ends the whole procedure.

use crate::interpreter::program::{NodeId, Program, Stmt};

use super::super::{nodes, ValidationError, ValidationRule};

pub struct BreakOutsideLoopRule;

impl ValidationRule for BreakOutsideLoopRule {
    fn id(&self) -> &'static str {
        "break-outside-loop"
    }

    fn description(&self) -> &'static str {
        "break must be inside a while loop"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        nodes(program)
            .filter(|(id, stmt)| matches!(stmt, Stmt::Break) && !inside_loop(program, *id))
            .map(|(id, _)| ValidationError::error(program, id, "break is not inside a loop", self.id()))
            .collect()
    }
}

/// Whether a `while` encloses `id` before the procedure boundary
fn inside_loop(program: &Program, id: NodeId) -> bool {
    let mut current = program.node(id).and_then(|n| n.parent);
    while let Some(node) = current {
        if node == program.root() {
            return false;
        }
        if matches!(program.stmt(node), Some(Stmt::While { .. })) {
            return true;
        }
        current = program.node(node).and_then(|n| n.parent);
    }
    false
}
