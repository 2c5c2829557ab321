//! Tests for procedure calls inside expressions

use super::helpers::{block, if_, input, op, out, program, ret, run_main};
use crate::interpreter::eval::EvalError;
use crate::interpreter::executor::{ExecutionLimits, Output, RuntimeError, VmState, VM};
use crate::interpreter::values::Val;

#[test]
fn test_arguments_bind_positionally() {
    let program = program(vec![
        block("main", vec![out("%{sub(10, 4)}")]),
        block("sub", vec![ret("arg1 - arg2")]),
    ]);

    let (_, console) = run_main(&program, &[]);

    assert_eq!(console, "6\n");
}

#[test]
fn test_recursion() {
    let program = program(vec![
        block("main", vec![out("%{fact(5)}")]),
        block(
            "fact",
            vec![if_(
                "arg1 <= 1",
                vec![ret("1")],
                vec![ret("arg1 * fact(arg1 - 1)")],
            )],
        ),
    ]);

    let (state, console) = run_main(&program, &[]);

    assert_eq!(console, "120\n");
    assert_eq!(state, VmState::Finished(None));
}

#[test]
fn test_activations_are_independent() {
    // each call of g keeps its own x, even while a deeper call runs
    let program = program(vec![
        block("main", vec![out("%{g(3)}")]),
        block(
            "g",
            vec![
                op("x = arg1"),
                if_("arg1 > 0", vec![op("y = g(arg1 - 1)")], vec![]),
                ret("x"),
            ],
        ),
    ]);

    let (_, console) = run_main(&program, &[]);

    assert_eq!(console, "3\n");
}

#[test]
fn test_callee_does_not_see_caller_locals() {
    let program = program(vec![
        block("main", vec![op("secret = 1"), out("%{peek()}")]),
        block("peek", vec![ret("secret")]),
    ]);

    let (state, console) = run_main(&program, &[]);

    assert_eq!(console, "error: undefined variable 'secret'\n");
    assert!(matches!(state, VmState::Failed(_)));
}

#[test]
fn test_missing_return_warns_and_yields_zero() {
    let program = program(vec![
        block("main", vec![op("r = noop() + 1"), out("%r")]),
        block("noop", vec![op("z = 5")]),
    ]);

    let (state, console) = run_main(&program, &[]);

    assert_eq!(
        console,
        "warning: procedure 'noop' did not return a value; using 0\n1\n"
    );
    assert_eq!(state, VmState::Finished(None));
}

#[test]
fn test_unknown_procedure() {
    let program = program(vec![block("main", vec![op("nothing(1)")])]);

    let (state, _) = run_main(&program, &[]);

    assert_eq!(
        state,
        VmState::Failed(RuntimeError::Eval(EvalError::UndefinedProcedure("nothing".to_string())))
    );
}

#[test]
fn test_output_inside_call_does_not_suspend() {
    let program = program(vec![
        block("main", vec![op("v = loud()"), out("%v")]),
        block("loud", vec![out("one"), out("two"), ret("2")]),
    ]);

    let mut vm = VM::new(&program, ExecutionLimits::default()).unwrap();
    // the first suspension is main's own output
    assert_eq!(vm.run(), &VmState::AwaitingTick);
    assert_eq!(
        vm.drain_output(),
        vec![
            Output::Text("one".to_string()),
            Output::EndLine,
            Output::Text("two".to_string()),
            Output::EndLine,
            Output::Text("2".to_string()),
            Output::EndLine,
        ]
    );
}

#[test]
fn test_input_inside_call_uses_queued_tokens_or_fails() {
    let program = program(vec![
        block("main", vec![input("%a"), out("%{ask() + a}")]),
        block("ask", vec![input("%v"), ret("v")]),
    ]);

    // the second token is still queued when ask runs
    let (_, console) = run_main(&program, &["1 2"]);
    assert_eq!(console, "3\n");

    let (state, console) = run_main(&program, &["1"]);
    assert_eq!(
        state,
        VmState::Failed(RuntimeError::Eval(EvalError::InputInsideCall {
            name: "ask".to_string()
        }))
    );
    // reported once, by the statement that failed
    assert_eq!(console.matches("error:").count(), 1);
}

#[test]
fn test_call_depth_limit() {
    let program = program(vec![
        block("main", vec![out("%{down(0)}")]),
        block("down", vec![ret("down(arg1 + 1)")]),
    ]);
    let limits = ExecutionLimits {
        max_call_depth: 16,
        ..ExecutionLimits::default()
    };

    let mut vm = VM::new(&program, limits).unwrap();
    vm.run();

    assert_eq!(
        vm.state(),
        &VmState::Failed(RuntimeError::Eval(EvalError::CallDepth(16)))
    );
    let errors = vm
        .output()
        .iter()
        .filter(|o| matches!(o, Output::Error(_)))
        .count();
    assert_eq!(errors, 1);
}

#[test]
fn test_any_procedure_can_be_the_entry() {
    let program = program(vec![
        block("main", vec![]),
        block("twice", vec![ret("arg1 * 2")]),
    ]);

    let mut vm = VM::with_entry(&program, "twice", vec![Val::Num(21.0)], ExecutionLimits::default()).unwrap();

    assert_eq!(vm.run(), &VmState::Finished(Some(Val::Num(42.0))));
}
