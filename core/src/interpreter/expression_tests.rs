//! Property tests for expression rendering
//!
//! Any tree the parser can produce must survive render → reparse unchanged
//! under the grammar flags it was generated for, and evaluate the same way.

use proptest::prelude::*;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::eval::ClosedContext;
use super::parser::ExpressionParser;
use super::values::Val;

const NUMERIC_OPS: [BinaryOp; 6] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::IDiv,
    BinaryOp::Pow,
];

const BOOLEAN_OPS: [BinaryOp; 8] = [
    BinaryOp::Or,
    BinaryOp::And,
    BinaryOp::Eq,
    BinaryOp::Neq,
    BinaryOp::Lt,
    BinaryOp::Gt,
    BinaryOp::Lte,
    BinaryOp::Gte,
];

fn leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0u32..1000).prop_map(|n| Expr::num(n as f64)),
        (0u32..400).prop_map(|n| Expr::num(n as f64 / 4.0)),
        prop::sample::select(vec!["a", "b", "c", "true", "false"]).prop_map(Expr::ident),
    ]
}

fn expr_strategy(ops: Vec<BinaryOp>, allow_not: bool) -> impl Strategy<Value = Expr> {
    leaf().prop_recursive(4, 32, 3, move |inner| {
        let mut choices = vec![
            (prop::sample::select(ops.clone()), inner.clone(), inner.clone())
                .prop_map(|(op, lhs, rhs)| Expr::binary(op, lhs, rhs))
                .boxed(),
            inner
                .clone()
                .prop_map(|e| Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(e),
                })
                .boxed(),
            (prop::sample::select(vec!["v", "w"]), inner.clone())
                .prop_map(|(name, index)| Expr::Identifier {
                    name: name.to_string(),
                    index: Some(Box::new(index)),
                })
                .boxed(),
            (prop::sample::select(vec!["f", "g"]), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(name, args)| Expr::Call {
                    callee: Box::new(Expr::ident(name)),
                    args,
                })
                .boxed(),
        ];
        if allow_not {
            choices.push(
                inner
                    .prop_map(|e| Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(e),
                    })
                    .boxed(),
            );
        }
        prop::strategy::Union::new(choices)
    })
}

fn all_ops() -> Vec<BinaryOp> {
    NUMERIC_OPS.iter().chain(BOOLEAN_OPS.iter()).copied().collect()
}

/// Evaluation outcome in a comparable form (NaN compares equal to itself)
fn outcome(expr: &Expr) -> String {
    let mut ctx = ClosedContext::default();
    ctx.vars.insert("a".to_string(), Val::Num(3.0));
    ctx.vars.insert("b".to_string(), Val::Num(-0.5));
    ctx.vars.insert("c".to_string(), Val::Bool(true));
    format!("{:?}", expr.evaluate(&mut ctx))
}

proptest! {
    #[test]
    fn test_condition_round_trip(expr in expr_strategy(all_ops(), true)) {
        let text = expr.to_source();
        let reparsed = ExpressionParser::condition()
            .parse_expr(&text)
            .map_err(|e| TestCaseError::fail(format!("{}: {}", text, e)))?;

        prop_assert_eq!(&reparsed, &expr, "rendered as {}", text);
        prop_assert_eq!(outcome(&reparsed), outcome(&expr));
    }

    #[test]
    fn test_operation_round_trip(
        targets in prop::collection::vec(prop::sample::select(vec!["x", "y"]), 1..3),
        value in expr_strategy(NUMERIC_OPS.to_vec(), false),
    ) {
        let expr = targets.iter().rev().fold(value, |value, target| Expr::Assign {
            target: Box::new(Expr::ident(*target)),
            value: Box::new(value),
        });
        let text = expr.to_source();
        let reparsed = ExpressionParser::operation()
            .parse_expr(&text)
            .map_err(|e| TestCaseError::fail(format!("{}: {}", text, e)))?;

        prop_assert_eq!(&reparsed, &expr, "rendered as {}", text);
    }

    #[test]
    fn test_numeric_trees_rejected_only_for_boolean_ops(expr in expr_strategy(all_ops(), true)) {
        let text = expr.to_source();
        let uses_boolean = {
            let mut found = false;
            expr.walk(&mut |e| {
                if matches!(e, Expr::Binary { op, .. } if op.is_boolean())
                    || matches!(e, Expr::Unary { op: UnaryOp::Not, .. })
                {
                    found = true;
                }
            });
            found
        };
        prop_assert_eq!(ExpressionParser::value().parse_expr(&text).is_ok(), !uses_boolean);
    }
}
