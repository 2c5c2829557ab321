//! Source generators
//!
//! Translate a compiled [`Program`](crate::interpreter::Program) into a
//! standalone translation unit in another language. The pass is purely static:
//! it never consults runtime scopes.

pub mod cpp;

pub use cpp::{generate_cpp, CppOptions};
