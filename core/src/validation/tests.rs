//! Tests for the static validation rules

use super::*;
use crate::test_support::{block, brk, if_, op, out, program, ret, while_};

// ============================================================================
// Helper Functions
// ============================================================================

fn for_rule<'a>(errors: &'a [ValidationError], rule_id: &str) -> Vec<&'a ValidationError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

fn has_rule(errors: &[ValidationError], rule_id: &str) -> bool {
    errors.iter().any(|e| e.rule_id == rule_id)
}

// ============================================================================
// Rules
// ============================================================================

#[test]
fn test_clean_program_has_no_diagnostics() {
    let program = program(vec![
        block("main", vec![op("x = sq(3)"), out("%x")]),
        block("sq", vec![ret("arg1 * arg1")]),
    ]);

    assert!(validate_program(&program).is_empty());
    assert!(!has_errors(&program));
}

#[test]
fn test_missing_main() {
    let program = program(vec![block("start", vec![])]);

    let errors = validate_program(&program);
    let missing = for_rule(&errors, "missing-main");
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].path, "test");
    assert!(has_errors(&program));
}

#[test]
fn test_empty_conditions() {
    let program = program(vec![block(
        "main",
        vec![if_("", vec![], vec![]), while_("", vec![])],
    )]);

    let errors = validate_program(&program);
    let empty = for_rule(&errors, "empty-condition");
    assert_eq!(empty.len(), 2);
    assert_eq!(empty[0].message, "if condition is empty");
    assert_eq!(empty[0].path, "main[0]");
    assert_eq!(empty[1].path, "main[1]");
}

#[test]
fn test_break_outside_loop() {
    let program = program(vec![block(
        "main",
        vec![
            while_("true", vec![if_("true", vec![brk()], vec![])]),
            if_("true", vec![], vec![brk()]),
        ],
    )]);

    let errors = validate_program(&program);
    let breaks = for_rule(&errors, "break-outside-loop");
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].path, "main[1].else[0]");
}

#[test]
fn test_unknown_procedure_in_any_expression() {
    let program = program(vec![block(
        "main",
        vec![op("x = nope(1)"), out("%{gone()}"), while_("missing(2) > 0", vec![])],
    )]);

    let errors = validate_program(&program);
    let unknown = for_rule(&errors, "unknown-procedure");
    let messages: Vec<_> = unknown.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "no procedure named 'nope'",
            "no procedure named 'gone'",
            "no procedure named 'missing'"
        ]
    );
}

#[test]
fn test_no_op_operation_is_a_warning() {
    let program = program(vec![block("main", vec![op("x = 1"), op("x + 1")])]);

    let errors = validate_program(&program);
    let noop = for_rule(&errors, "no-op-operation");
    assert_eq!(noop.len(), 1);
    assert_eq!(noop[0].severity, Severity::Warning);
    assert_eq!(
        noop[0].to_string(),
        "warning at main[1]: operation 'x + 1' has no effect [no-op-operation]"
    );
    assert!(!has_errors(&program));
}

#[test]
fn test_unused_return_value() {
    let program = program(vec![
        block("main", vec![op("value()"), op("effect()")]),
        block("value", vec![ret("1")]),
        block("effect", vec![out("hi")]),
    ]);

    let errors = validate_program(&program);
    let unused = for_rule(&errors, "unused-return-value");
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].message, "the value returned by 'value' is discarded");
    assert!(!has_rule(&errors, "no-op-operation"));
}

#[test]
fn test_value_of_procedure_without_return() {
    let program = program(vec![
        block(
            "main",
            vec![
                op("noop()"),
                op("y = noop() + 1"),
                op("show(noop())"),
                out("%{noop()}"),
                op("z = sq(2)"),
            ],
        ),
        block("noop", vec![op("t = 1")]),
        block("show", vec![out("%arg1")]),
        block("sq", vec![ret("arg1 * arg1")]),
    ]);

    let errors = validate_program(&program);
    let missing = for_rule(&errors, "missing-return-value");
    let paths: Vec<_> = missing.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["main[1]", "main[2]", "main[3]"]);
    assert_eq!(missing[0].severity, Severity::Warning);
    assert_eq!(missing[0].message, "'noop' returns no value but its result is used");
    assert!(!has_errors(&program));
}

#[test]
fn test_rules_are_listed() {
    let ids: Vec<_> = Validator::new().rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec![
            "missing-main",
            "empty-condition",
            "break-outside-loop",
            "unknown-procedure",
            "no-op-operation",
            "unused-return-value",
            "missing-return-value"
        ]
    );
}
