pub mod cli;
pub mod codegen;
pub mod config;
pub mod interpreter;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use codegen::{generate_cpp, CppOptions};
pub use config::Config;
pub use interpreter::{ExecutionLimits, Program, ProgramError, Val, VmState, VM};
pub use validation::{has_errors, validate_program, ValidationError};
