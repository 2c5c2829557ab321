//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `missing_main.rs` - Program has no `main` procedure
//! - `empty_condition.rs` - `if`/`while` whose condition was never set
//! - `break_outside_loop.rs` - `break` with no enclosing `while`
//! - `unknown_procedure.rs` - Calls that resolve to no block
//! - `no_op_operation.rs` - Operations that neither assign nor call
//! - `unused_return_value.rs` - Bare calls that discard a returned value
//! - `missing_return_value.rs` - Calls used for a value their procedure never returns

mod break_outside_loop;
mod empty_condition;
mod missing_main;
mod missing_return_value;
mod no_op_operation;
mod unknown_procedure;
mod unused_return_value;

pub use break_outside_loop::BreakOutsideLoopRule;
pub use empty_condition::EmptyConditionRule;
pub use missing_main::MissingMainRule;
pub use missing_return_value::MissingReturnValueRule;
pub use no_op_operation::NoOpOperationRule;
pub use unknown_procedure::UnknownProcedureRule;
pub use unused_return_value::UnusedReturnValueRule;
