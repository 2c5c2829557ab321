//! Rule: No-op Operation
//!
//! Warns about operation statements whose expression neither assigns nor
//! calls anything, so evaluating it has no effect.
//!
//! # Flagged
//!
//! ```text
//! x + 1
//! a
//! ```

use crate::interpreter::ast::Expr;
use crate::interpreter::program::{Program, Stmt};

use super::super::{nodes, ValidationError, ValidationRule};

pub struct NoOpOperationRule;

impl ValidationRule for NoOpOperationRule {
    fn id(&self) -> &'static str {
        "no-op-operation"
    }

    fn description(&self) -> &'static str {
        "operations should assign a variable or call a procedure"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        nodes(program)
            .filter_map(|(id, stmt)| match stmt {
                Stmt::Operation { expr } => expr.root.as_ref().map(|root| (id, root)),
                _ => None,
            })
            .filter(|(_, root)| !has_effect(root))
            .map(|(id, root)| {
                ValidationError::warning(
                    program,
                    id,
                    format!("operation '{}' has no effect", root),
                    self.id(),
                )
            })
            .collect()
    }
}

fn has_effect(expr: &Expr) -> bool {
    let mut effect = false;
    expr.walk(&mut |node| {
        if matches!(node, Expr::Assign { .. } | Expr::Call { .. }) {
            effect = true;
        }
    });
    effect
}
