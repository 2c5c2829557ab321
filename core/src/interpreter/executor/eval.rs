//! Expression evaluation against live VM state
//!
//! Variables resolve through the innermost frame's scope. Procedure calls run
//! the callee to completion on the same frame stack before the expression
//! continues.

use tracing::debug;

use super::exec_loop::step;
use super::types::Control;
use super::vm::{push_procedure, Step, VM};
use crate::interpreter::eval::{EvalContext, EvalError, EvalResult, Place};
use crate::interpreter::values::Val;

impl EvalContext for VM<'_> {
    fn lookup(&self, name: &str, index: Option<i64>) -> EvalResult<Val> {
        self.scopes.lookup(self.current_scope(), name, index)
    }

    fn store(&mut self, place: &Place, value: Val) -> EvalResult<()> {
        let scope = self.current_scope();
        self.scopes.update_or_create(scope, &place.name, place.index, value)
    }

    fn call(&mut self, name: &str, args: Vec<Val>) -> EvalResult<Val> {
        let block = self
            .program
            .find_block(self.current_block(), name)
            .ok_or_else(|| EvalError::UndefinedProcedure(name.to_string()))?;
        if self.activations.len() >= self.limits.max_call_depth {
            return Err(EvalError::CallDepth(self.limits.max_call_depth));
        }

        let floor = self.frames.len();
        self.call_result = None;
        push_procedure(self, block, args);

        self.nested += 1;
        while self.frames.len() > floor {
            if step(self) == Step::Done {
                break;
            }
        }
        self.nested -= 1;

        if matches!(self.control, Control::Throw(_)) {
            return Err(EvalError::Halted);
        }

        match self.call_result.take() {
            Some(v) => Ok(v),
            None => {
                debug!(procedure = name, "call produced no value");
                self.warn(format!("procedure '{}' did not return a value; using 0", name));
                Ok(Val::Num(0.0))
            }
        }
    }
}
