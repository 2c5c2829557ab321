//! Tests for the executor
//!
//! Organized by feature area

mod call_tests;
mod helpers;
mod io_tests;
