//! Tests for input suspension and token carry-over

use super::helpers::{block, drive, input, op, out, out_inline, program, run_main};
use crate::interpreter::eval::EvalError;
use crate::interpreter::executor::{ExecutionLimits, Output, RuntimeError, VmState, VM};
use crate::interpreter::values::Val;

#[test]
fn test_input_suspends_until_a_line_arrives() {
    let program = program(vec![block("main", vec![input("Value: %a"), out("got %a")])]);

    let mut vm = VM::new(&program, ExecutionLimits::default()).unwrap();
    assert_eq!(vm.run(), &VmState::AwaitingInput);
    assert_eq!(vm.drain_output(), vec![Output::Text("Value: ".to_string())]);

    // resuming without input keeps waiting
    assert_eq!(vm.resume(), &VmState::AwaitingInput);

    assert_eq!(vm.provide_line("  7  "), &VmState::AwaitingTick);
    assert_eq!(
        vm.drain_output(),
        vec![Output::Text("got 7".to_string()), Output::EndLine]
    );
    assert_eq!(vm.resume(), &VmState::Finished(None));
}

#[test]
fn test_extra_tokens_carry_over_to_next_input() {
    let program = program(vec![block(
        "main",
        vec![input("%a %b"), input("%c"), out("%{a + b + c}")],
    )]);

    let mut vm = VM::new(&program, ExecutionLimits::default()).unwrap();
    assert_eq!(vm.run(), &VmState::AwaitingInput);

    // one line satisfies both statements; the second never waits
    assert_eq!(vm.provide_line("3 4 5"), &VmState::AwaitingTick);
    assert_eq!(vm.pending_tokens().count(), 0);
    assert_eq!(vm.scopes().lookup(1, "a", None), Ok(Val::Num(3.0)));
    assert_eq!(vm.scopes().lookup(1, "b", None), Ok(Val::Num(4.0)));
    assert_eq!(vm.scopes().lookup(1, "c", None), Ok(Val::Num(5.0)));
    assert_eq!(
        vm.drain_output(),
        vec![Output::Text(" ".to_string()), Output::Text("12".to_string()), Output::EndLine]
    );
}

#[test]
fn test_short_line_waits_for_more_tokens() {
    let program = program(vec![block("main", vec![input("%a,%b"), out_inline("%{a * b}")])]);

    let (state, console) = run_main(&program, &["6", "7"]);

    assert_eq!(console, ",42");
    assert_eq!(state, VmState::Finished(None));
}

#[test]
fn test_input_into_indexed_site() {
    let program = program(vec![block(
        "main",
        vec![op("i = 2"), op("v[0] = 0"), input("%{v[i]}"), out("%{v[2]}")],
    )]);

    let (_, console) = run_main(&program, &["9.5"]);

    assert_eq!(console, "9.5\n");
}

#[test]
fn test_non_numeric_input_is_fatal() {
    let program = program(vec![block("main", vec![input("%a"), out("never")])]);

    let (state, console) = run_main(&program, &["abc"]);

    assert_eq!(
        state,
        VmState::Failed(RuntimeError::Eval(EvalError::NonNumericInput {
            name: "a".to_string(),
            token: "abc".to_string(),
        }))
    );
    assert_eq!(console, "error: expected a number for 'a' but got 'abc'\n");
}

#[test]
fn test_non_finite_input_is_rejected() {
    let program = program(vec![block("main", vec![input("%a")])]);

    let (state, _) = run_main(&program, &["inf"]);

    assert!(matches!(
        state,
        VmState::Failed(RuntimeError::Eval(EvalError::NonNumericInput { .. }))
    ));
}

#[test]
fn test_drive_stops_when_input_runs_out() {
    let program = program(vec![block("main", vec![input("%a"), input("%b")])]);

    let mut vm = VM::new(&program, ExecutionLimits::default()).unwrap();
    drive(&mut vm, &["1"]);

    assert_eq!(vm.state(), &VmState::AwaitingInput);
}
