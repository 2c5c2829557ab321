//! # Resumable Stack-Driven Interpreter
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: all statement state lives in `frames: Vec<Frame>`;
//!    the interpreter never recurses through the Rust call stack per statement
//! 2. **Centralized control flow**: the `Control` enum carries break, return,
//!    throw and suspend to the frame that handles them
//! 3. **Pure executor**: no I/O. Console output goes to an outbox, input arrives
//!    through `VM::provide_line`, and newline output yields for one host tick
//! 4. **Independent activations**: every procedure call gets its own scopes on
//!    the shared scope chain, released when the call returns

pub mod eval;
pub mod exec_loop;
pub mod statements;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use exec_loop::{run_until_done, step};
pub use types::{Control, ExecutionLimits, Frame, FrameKind, Output, RuntimeError, VmState, Wait};
pub use vm::{Activation, Step, VM};
