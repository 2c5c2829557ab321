//! Static Validation for Flowchart Programs
//!
//! This module provides an extensible rule-based validation system that runs
//! on a compiled [`Program`] to catch problems that per-node parsing cannot see.
//!
//! # Usage
//!
//! ```ignore
//! use progflow_core::validation::validate_program;
//!
//! let program = Program::from_json(&json)?;
//! for diagnostic in validate_program(&program) {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - The output of validation (errors, warnings, hints)
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validation/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;

use crate::interpreter::ast::Expr;
use crate::interpreter::program::{NodeId, Program, Stmt};

// ============================================================================
// Validation Error Types
// ============================================================================

/// A diagnostic produced by static analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The node the diagnostic is about
    pub node: NodeId,
    /// Readable location of the node, e.g. `main[1].then[0]`
    pub path: String,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Which rule produced this error
    pub rule_id: &'static str,
}

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must be fixed - the program cannot run correctly
    Error,
    /// Should probably be fixed - potential bug
    Warning,
    /// Suggestion for improvement
    Hint,
}

impl ValidationError {
    /// Create a new error
    pub fn error(program: &Program, node: NodeId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            node,
            path: node_path(program, node),
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    /// Create a new warning
    pub fn warning(program: &Program, node: NodeId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(program, node, message, rule_id)
        }
    }

    /// Check if this is an error (not a warning or hint)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        write!(f, "{} at {}: {} [{}]", severity, self.path, self.message, self.rule_id)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules must implement.
///
/// Each rule checks one aspect of the program and does not depend on other
/// rules' results.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "missing-main")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the validation and return any problems found
    fn validate(&self, program: &Program) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

/// The main validator that orchestrates all validation rules.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                // Error rules - the program cannot run correctly
                Box::new(rules::MissingMainRule),
                Box::new(rules::EmptyConditionRule),
                Box::new(rules::BreakOutsideLoopRule),
                Box::new(rules::UnknownProcedureRule),
                // Warning rules - these are suggestions
                Box::new(rules::NoOpOperationRule),
                Box::new(rules::UnusedReturnValueRule),
                Box::new(rules::MissingReturnValueRule),
            ],
        }
    }

    /// Run all validation rules and collect their diagnostics.
    pub fn validate(&self, program: &Program) -> Vec<ValidationError> {
        self.rules.iter().flat_map(|rule| rule.validate(program)).collect()
    }

    /// Registered rules as `(id, description)`
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Program Traversal
// ============================================================================

/// Readable location of a node: procedure name, then child positions and
/// branch names, e.g. `main[1].then[0]`
pub fn node_path(program: &Program, id: NodeId) -> String {
    let mut parts = Vec::new();
    let mut current = id;

    while let Some(parent) = program.node(current).and_then(|n| n.parent) {
        let part = match program.stmt(parent) {
            Some(Stmt::Block { .. }) if parent == program.root() => match program.stmt(current) {
                Some(Stmt::Block { label, .. }) => label.clone(),
                _ => format!("[{}]", current),
            },
            Some(Stmt::Block { children, .. }) => {
                let pos = children.iter().position(|&c| c == current).unwrap_or_default();
                format!("[{}]", pos)
            }
            Some(Stmt::If { true_part, .. }) if *true_part == current => ".then".to_string(),
            Some(Stmt::If { .. }) => ".else".to_string(),
            Some(Stmt::While { .. }) => ".body".to_string(),
            _ => String::new(),
        };
        parts.push(part);
        current = parent;
    }

    if parts.is_empty() {
        return program.label().to_string();
    }
    parts.reverse();
    parts.concat()
}

/// Every expression a statement evaluates
pub fn stmt_expressions(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Operation { expr } | Stmt::Return { expr } => expr.root.iter().collect(),
        Stmt::If { cond, .. } | Stmt::While { cond, .. } => cond.root.iter().collect(),
        Stmt::Input { format } | Stmt::Output { format, .. } => format.expressions().collect(),
        Stmt::Block { .. } | Stmt::Break => Vec::new(),
    }
}

/// Statement nodes in program order
pub fn nodes(program: &Program) -> impl Iterator<Item = (NodeId, &Stmt)> {
    (0..program.len()).filter_map(move |id| program.stmt(id).map(|stmt| (id, stmt)))
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program with every built-in rule
pub fn validate_program(program: &Program) -> Vec<ValidationError> {
    Validator::new().validate(program)
}

/// Check if a program has any validation errors (not just warnings).
pub fn has_errors(program: &Program) -> bool {
    validate_program(program).iter().any(|e| e.is_error())
}

#[cfg(test)]
mod tests;
