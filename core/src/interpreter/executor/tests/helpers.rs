//! Test helpers for executor tests

use crate::interpreter::executor::{ExecutionLimits, Output, VmState, VM};
use crate::interpreter::program::Program;

pub use crate::test_support::{block, brk, if_, input, op, out, out_inline, program, ret, while_};

/// Drive a run to completion the way a console host would: ticks resume
/// immediately, input requests take the next scripted line. Stops early when
/// input is requested and no lines remain.
pub fn drive(vm: &mut VM<'_>, lines: &[&str]) -> String {
    let mut lines = lines.iter();
    let mut console = String::new();

    vm.run();
    loop {
        for output in vm.drain_output() {
            match output {
                Output::Text(text) => console.push_str(&text),
                Output::EndLine => console.push('\n'),
                Output::Warning(message) => console.push_str(&format!("warning: {}\n", message)),
                Output::Error(message) => console.push_str(&format!("error: {}\n", message)),
            }
        }
        match vm.state().clone() {
            VmState::AwaitingTick => {
                vm.resume();
            }
            VmState::AwaitingInput => match lines.next() {
                Some(line) => {
                    vm.provide_line(line);
                }
                None => break,
            },
            VmState::Running | VmState::Finished(_) | VmState::Failed(_) => break,
        }
    }
    console
}

/// Run `main` with default limits and return the final state and console text
pub fn run_main(program: &Program, lines: &[&str]) -> (VmState, String) {
    let mut vm = VM::new(program, ExecutionLimits::default()).expect("Program should have a main");
    let console = drive(&mut vm, lines);
    (vm.state().clone(), console)
}
