//! Rule: Missing Main
//!
//! Reports an error when the program has no procedure named `main`, which is
//! where every run starts.

use crate::interpreter::program::Program;

use super::super::{ValidationError, ValidationRule};

pub struct MissingMainRule;

impl ValidationRule for MissingMainRule {
    fn id(&self) -> &'static str {
        "missing-main"
    }

    fn description(&self) -> &'static str {
        "the program must define a 'main' procedure"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        if program.procedures().iter().any(|(name, _)| *name == "main") {
            return Vec::new();
        }
        vec![ValidationError::error(
            program,
            program.root(),
            "program has no 'main' procedure",
            self.id(),
        )]
    }
}
