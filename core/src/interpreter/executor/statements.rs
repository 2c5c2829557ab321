//! Statement execution handlers
//!
//! Each statement type has its own handler function. A handler either pops its
//! own frame (the statement is done), pushes a child frame, or sets `control`
//! and lets the loop unwind.

use tracing::warn;

use super::types::{Control, FrameKind, Output, ProcedurePhase, RuntimeError, Wait};
use super::vm::{finish_procedure, push_stmt, set_top_kind, suspend, Step, VM};
use crate::interpreter::ast::Expression;
use crate::interpreter::eval::{EvalContext, EvalError};
use crate::interpreter::format_string::{input_place, FormatString, Segment};
use crate::interpreter::program::NodeId;
use crate::interpreter::scope::{ScopeId, ROOT_SCOPE};
use crate::interpreter::values::Val;

/* ===================== Errors ===================== */

/// Report a runtime error and halt the run
pub fn fail(vm: &mut VM<'_>, err: RuntimeError) -> Step {
    warn!(error = %err, "run halted");
    vm.outbox.push(Output::Error(err.to_string()));
    vm.control = Control::Throw(err);
    Step::Continue
}

/// Halt on an evaluation error, unless a nested call already did
pub fn raise(vm: &mut VM<'_>, err: EvalError) -> Step {
    if err == EvalError::Halted {
        return Step::Continue;
    }
    fail(vm, err.into())
}

/* ===================== Statement Handlers ===================== */

/// Execute a procedure boundary frame
pub fn execute_procedure(vm: &mut VM<'_>, phase: ProcedurePhase, block: NodeId) -> Step {
    match phase {
        ProcedurePhase::Enter => {
            set_top_kind(
                vm,
                FrameKind::Procedure {
                    phase: ProcedurePhase::Body,
                },
            );
            push_stmt(vm, block, ROOT_SCOPE);
        }
        // the body ran off its end without a return
        ProcedurePhase::Body => finish_procedure(vm, None),
    }
    Step::Continue
}

/// Execute Block statement
pub fn execute_block(vm: &mut VM<'_>, idx: usize, children: &[NodeId], scope: ScopeId) -> Step {
    let Some(&child) = children.get(idx) else {
        vm.frames.pop();
        return Step::Continue;
    };

    set_top_kind(vm, FrameKind::Block { idx: idx + 1 });
    push_stmt(vm, child, scope);
    Step::Continue
}

/// Execute Operation statement
pub fn execute_operation(vm: &mut VM<'_>, expr: &Expression) -> Step {
    if let Some(root) = &expr.root {
        if let Err(err) = root.evaluate(vm) {
            return raise(vm, err);
        }
    }
    vm.frames.pop();
    Step::Continue
}

/// Execute Input statement
///
/// Literal text is printed as a prompt. Each site takes one queued token; when
/// none is queued the statement suspends with its cursor saved and picks up
/// at the same site once a line arrives.
pub fn execute_input(vm: &mut VM<'_>, cursor: usize, format: &FormatString) -> Step {
    let mut cursor = cursor;

    while let Some(segment) = format.segments().get(cursor) {
        if let Segment::Literal(text) = segment {
            vm.outbox.push(Output::Text(text.clone()));
            cursor += 1;
            continue;
        }

        let Some(token) = vm.pending.pop_front() else {
            set_top_kind(vm, FrameKind::Input { cursor });
            if vm.nested > 0 {
                let name = vm.activations.last().map(|a| a.name.clone()).unwrap_or_default();
                return raise(vm, EvalError::InputInsideCall { name });
            }
            suspend(vm, Wait::Input);
            return Step::Continue;
        };

        let place = match input_place(segment, vm) {
            Some(Ok(place)) => place,
            Some(Err(err)) => return raise(vm, err),
            None => {
                cursor += 1;
                continue;
            }
        };
        let Some(value) = parse_number(&token) else {
            return raise(
                vm,
                EvalError::NonNumericInput {
                    name: place.to_string(),
                    token,
                },
            );
        };
        if let Err(err) = vm.store(&place, Val::Num(value)) {
            return raise(vm, err);
        }
        cursor += 1;
    }

    vm.frames.pop();
    Step::Continue
}

/// Execute Output statement
///
/// With a trailing newline the run yields for one host tick afterwards, except
/// inside a procedure called from an expression, which cannot suspend.
pub fn execute_output(vm: &mut VM<'_>, format: &FormatString, newline: bool) -> Step {
    let rendered = match format.render(vm) {
        Ok(rendered) => rendered,
        Err(err) => return raise(vm, err),
    };

    if !rendered.text.is_empty() {
        vm.outbox.push(Output::Text(rendered.text));
    }
    if newline {
        vm.outbox.push(Output::EndLine);
    }
    for warning in rendered.warnings {
        vm.warn(warning);
    }

    vm.frames.pop();
    if newline && vm.nested == 0 {
        suspend(vm, Wait::Tick);
    }
    Step::Continue
}

/// Execute If statement: the chosen branch replaces this frame
pub fn execute_if(vm: &mut VM<'_>, cond: &Expression, true_part: NodeId, false_part: NodeId, scope: ScopeId) -> Step {
    let Some(root) = &cond.root else {
        return fail(vm, RuntimeError::EmptyCondition("if"));
    };
    match root.evaluate(vm) {
        Ok(v) => {
            vm.frames.pop();
            let branch = if v.is_truthy() { true_part } else { false_part };
            push_stmt(vm, branch, scope);
            Step::Continue
        }
        Err(err) => raise(vm, err),
    }
}

/// Execute While statement
///
/// The frame stays on the stack while the body runs; when the body frame pops
/// the loop lands here again and re-evaluates the condition.
pub fn execute_while(vm: &mut VM<'_>, iters: u64, cond: &Expression, body: NodeId, scope: ScopeId) -> Step {
    let Some(root) = &cond.root else {
        return fail(vm, RuntimeError::EmptyCondition("while"));
    };
    let v = match root.evaluate(vm) {
        Ok(v) => v,
        Err(err) => return raise(vm, err),
    };

    if !v.is_truthy() {
        vm.frames.pop();
        return Step::Continue;
    }
    if iters >= vm.limits.iteration_limit {
        return fail(vm, RuntimeError::ExecutionLimit(iters));
    }

    set_top_kind(vm, FrameKind::While { iters: iters + 1 });
    push_stmt(vm, body, scope);
    Step::Continue
}

/// Execute Break statement
pub fn execute_break(vm: &mut VM<'_>) -> Step {
    vm.frames.pop();
    vm.control = Control::Break;
    Step::Continue
}

/// Execute Return statement
///
/// An empty expression ends the procedure without a value.
pub fn execute_return(vm: &mut VM<'_>, expr: &Expression) -> Step {
    let value = match &expr.root {
        Some(root) => match root.evaluate(vm) {
            Ok(v) => Some(v),
            Err(err) => return raise(vm, err),
        },
        None => None,
    };

    vm.frames.pop();
    vm.control = Control::Return(value);
    Step::Continue
}

/// Convert one input token; anything but a finite decimal number is rejected
fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
