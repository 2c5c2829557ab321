//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It processes one frame at a time, advancing execution phases and managing the frame stack.
//!
//! ## Function Organization
//! 1. run_until_done() - Top-level driver (calls step repeatedly)
//! 2. step() - Main execution loop (dispatches to statement handlers)
//! 3. unwind() - Delivers break/return/throw/suspend to the frame that handles it

use tracing::{debug, trace};

use super::statements::{
    execute_block, execute_break, execute_if, execute_input, execute_operation, execute_output,
    execute_procedure, execute_return, execute_while,
};
use super::types::{Control, FrameKind, VmState, Wait};
use super::vm::{finish_procedure, Step, VM};
use crate::interpreter::program::Stmt;

/* ===================== Public API ===================== */

/// Run the VM until it finishes, fails or suspends
///
/// After it returns, inspect `vm.state()` for the outcome.
pub fn run_until_done(vm: &mut VM<'_>) {
    loop {
        match step(vm) {
            Step::Continue => continue,
            Step::Done => break,
        }
    }
}

/// Execute one step of the VM
pub fn step(vm: &mut VM<'_>) -> Step {
    if vm.control != Control::None {
        return unwind(vm);
    }

    let Some(frame) = vm.frames.last().cloned() else {
        return Step::Done;
    };

    // the program reference outlives the VM borrow, so statements can be held
    // across handler calls that mutate the VM
    let program = vm.program;
    let Some(stmt) = program.stmt(frame.node) else {
        vm.frames.pop();
        return Step::Continue;
    };
    trace!(node = frame.node, kind = stmt.kind(), "step");

    match (frame.kind, stmt) {
        (FrameKind::Procedure { phase }, Stmt::Block { .. }) => execute_procedure(vm, phase, frame.node),

        (FrameKind::Block { idx }, Stmt::Block { children, .. }) => execute_block(vm, idx, children, frame.scope),

        (FrameKind::Operation, Stmt::Operation { expr }) => execute_operation(vm, expr),

        (FrameKind::Input { cursor }, Stmt::Input { format }) => execute_input(vm, cursor, format),

        (FrameKind::Output, Stmt::Output { format, newline }) => execute_output(vm, format, *newline),

        (
            FrameKind::If,
            Stmt::If {
                cond,
                true_part,
                false_part,
            },
        ) => execute_if(vm, cond, *true_part, *false_part, frame.scope),

        (FrameKind::While { iters }, Stmt::While { cond, body }) => {
            execute_while(vm, iters, cond, *body, frame.scope)
        }

        (FrameKind::Break, Stmt::Break) => execute_break(vm),

        (FrameKind::Return, Stmt::Return { expr }) => execute_return(vm, expr),

        // frames are only ever pushed from the statement they run
        (kind, stmt) => unreachable!("frame {:?} does not match statement {}", kind, stmt.kind()),
    }
}

/* ===================== Control Flow ===================== */

/// Unwind the stack while control flow is active
///
/// - `Break` pops to the nearest `while` and leaves it. Reaching a procedure
///   boundary instead ends that procedure without a value.
/// - `Return` pops to the procedure boundary and hands the value over.
/// - `Throw` abandons every frame. Variables keep whatever was committed.
/// - `Suspend` leaves the stack untouched and stops the loop.
fn unwind(vm: &mut VM<'_>) -> Step {
    match vm.control.clone() {
        Control::Suspend(wait) => {
            vm.state = match wait {
                Wait::Input => VmState::AwaitingInput,
                Wait::Tick => VmState::AwaitingTick,
            };
            debug!(?wait, frames = vm.frames.len(), "suspended");
            Step::Done
        }

        Control::Throw(err) => {
            vm.frames.clear();
            vm.state = VmState::Failed(err);
            Step::Done
        }

        Control::Break => {
            loop {
                match vm.frames.last().map(|f| &f.kind) {
                    None => break,
                    Some(FrameKind::While { .. }) => {
                        vm.frames.pop();
                        break;
                    }
                    Some(FrameKind::Procedure { .. }) => {
                        finish_procedure(vm, None);
                        break;
                    }
                    Some(_) => {
                        vm.frames.pop();
                    }
                }
            }
            vm.control = Control::None;
            Step::Continue
        }

        Control::Return(value) => {
            loop {
                match vm.frames.last().map(|f| &f.kind) {
                    None => break,
                    Some(FrameKind::Procedure { .. }) => {
                        finish_procedure(vm, value);
                        break;
                    }
                    Some(_) => {
                        vm.frames.pop();
                    }
                }
            }
            vm.control = Control::None;
            Step::Continue
        }

        Control::None => Step::Continue,
    }
}
