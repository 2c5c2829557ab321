//! Expression syntax tree
//!
//! A closed set of node kinds. Every node can be rendered back to source text,
//! rendered as C++ text, and asked for a type hint; evaluation lives in
//! [`super::eval`].

use serde::{Deserialize, Serialize};

/* ===================== Operators ===================== */

/// Binary operators, in increasing binding strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Pow,
}

impl BinaryOp {
    /// Source spelling
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IDiv => "//",
            BinaryOp::Pow => "^",
        }
    }

    /// C++ spelling for operators that map onto an infix C++ operator
    fn cpp_symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Neq => "!=",
            // IDiv and Pow are rendered as calls
            BinaryOp::IDiv => "/",
            other => other.symbol(),
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => PREC_OR,
            BinaryOp::And => PREC_AND,
            BinaryOp::Eq | BinaryOp::Neq => PREC_EQUALITY,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => PREC_RELATIONAL,
            BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::IDiv => PREC_MULTIPLICATIVE,
            BinaryOp::Pow => PREC_POW,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinaryOp::Pow
    }

    /// Operators rejected when a context disallows boolean expressions
    pub fn is_boolean(self) -> bool {
        self.precedence() <= PREC_RELATIONAL
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "not",
        }
    }
}

// Precedence levels, used only to decide where rendering needs parentheses.
pub const PREC_ASSIGN: u8 = 1;
pub const PREC_OR: u8 = 2;
pub const PREC_AND: u8 = 3;
pub const PREC_EQUALITY: u8 = 4;
pub const PREC_RELATIONAL: u8 = 5;
pub const PREC_ADDITIVE: u8 = 6;
pub const PREC_MULTIPLICATIVE: u8 = 7;
pub const PREC_POW: u8 = 8;
pub const PREC_UNARY: u8 = 9;
pub const PREC_CALL: u8 = 10;
pub const PREC_PRIMARY: u8 = 11;

/* ===================== Nodes ===================== */

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Identifier {
        name: String,
        index: Option<Box<Expr>>,
    },
    Number {
        v: f64,
    },
}

/// Static type guess for an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Number,
    Boolean,
    Unknown,
}

/// Options for rendering C++ text
#[derive(Debug, Clone, Copy)]
pub struct TargetOptions {
    /// Declared length of array-style variables
    pub array_size: usize,
}

/// Name of the bounds-clamping macro used for subscripts in generated code
pub const INDEX_MACRO: &str = "PF_INDEX";

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier {
            name: name.into(),
            index: None,
        }
    }

    pub fn num(v: f64) -> Self {
        Expr::Number { v }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Assign { .. } => PREC_ASSIGN,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { .. } => PREC_UNARY,
            Expr::Call { .. } => PREC_CALL,
            Expr::Identifier { .. } | Expr::Number { .. } => PREC_PRIMARY,
        }
    }

    /// Only identifiers (and assignments, which delegate to their target) yield an lvalue
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Identifier { name, .. } => !is_literal_name(name),
            Expr::Assign { target, .. } => target.is_assignable(),
            _ => false,
        }
    }

    pub fn type_hint(&self) -> TypeHint {
        match self {
            Expr::Assign { value, .. } => value.type_hint(),
            Expr::Binary { op, .. } if op.is_boolean() => TypeHint::Boolean,
            Expr::Binary { .. } => TypeHint::Number,
            Expr::Unary { op: UnaryOp::Not, .. } => TypeHint::Boolean,
            Expr::Unary { op: UnaryOp::Negate, .. } => TypeHint::Number,
            Expr::Call { .. } | Expr::Number { .. } => TypeHint::Number,
            Expr::Identifier { name, index: None } if is_literal_name(name) => TypeHint::Boolean,
            Expr::Identifier { .. } => TypeHint::Unknown,
        }
    }

    /// Visit this node and every descendant, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Assign { target, value } => {
                target.walk(visit);
                value.walk(visit);
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Call { callee, args } => {
                callee.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Identifier { index: Some(index), .. } => index.walk(visit),
            Expr::Identifier { index: None, .. } | Expr::Number { .. } => {}
        }
    }

    /// Variable references in evaluation order, as `(name, subscripted)`.
    ///
    /// Callee names and the `true`/`false` literals are not variables.
    pub fn variables(&self) -> Vec<(&str, bool)> {
        let mut found = Vec::new();
        collect_variables(self, &mut found);
        found
    }

    /// Names of procedures called anywhere in this expression
    pub fn callees(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Call { callee, .. } = node {
                if let Expr::Identifier { name, index: None } = &**callee {
                    names.push(name.as_str());
                }
            }
        });
        names
    }

    pub fn uses_op(&self, wanted: BinaryOp) -> bool {
        let mut used = false;
        self.walk(&mut |node| {
            if matches!(node, Expr::Binary { op, .. } if *op == wanted) {
                used = true;
            }
        });
        used
    }

    /* ===================== Rendering ===================== */

    /// Render as expression-language source with minimal parentheses
    pub fn to_source(&self) -> String {
        match self {
            Expr::Number { v } => format_number(*v),
            Expr::Identifier { name, index: None } => name.clone(),
            Expr::Identifier {
                name,
                index: Some(index),
            } => format!("{}[{}]", name, index.to_source()),
            Expr::Assign { target, value } => format!(
                "{} = {}",
                child(target, PREC_ASSIGN, true, Expr::to_source),
                child(value, PREC_ASSIGN, false, Expr::to_source)
            ),
            Expr::Binary { op, lhs, rhs } => {
                let (left_strict, right_strict) = strictness(*op);
                format!(
                    "{} {} {}",
                    child(lhs, op.precedence(), left_strict, Expr::to_source),
                    op.symbol(),
                    child(rhs, op.precedence(), right_strict, Expr::to_source)
                )
            }
            Expr::Unary { op, operand } => {
                let inner = child(operand, PREC_UNARY, false, Expr::to_source);
                match op {
                    UnaryOp::Not => format!("not {}", inner),
                    UnaryOp::Negate => prefix_minus(&inner),
                }
            }
            Expr::Call { callee, args } => format!(
                "{}({})",
                child(callee, PREC_CALL, false, Expr::to_source),
                args.iter().map(Expr::to_source).collect::<Vec<_>>().join(", ")
            ),
        }
    }

    /// Render as C++ text
    pub fn to_cpp(&self, opts: &TargetOptions) -> String {
        let render = |e: &Expr| e.to_cpp(opts);
        match self {
            Expr::Number { v } => {
                let text = format_number(*v);
                if text.contains('.') || !v.is_finite() {
                    text
                } else {
                    format!("{}.0", text)
                }
            }
            Expr::Identifier { name, index: None } => name.clone(),
            Expr::Identifier {
                name,
                index: Some(index),
            } => format!(
                "{}[{}({}, {})]",
                name,
                INDEX_MACRO,
                index.to_cpp(opts),
                opts.array_size
            ),
            Expr::Assign { target, value } => format!(
                "{} = {}",
                child(target, PREC_ASSIGN, true, render),
                child(value, PREC_ASSIGN, false, render)
            ),
            Expr::Binary {
                op: BinaryOp::Pow,
                lhs,
                rhs,
            } => format!("pow({}, {})", lhs.to_cpp(opts), rhs.to_cpp(opts)),
            Expr::Binary {
                op: BinaryOp::IDiv,
                lhs,
                rhs,
            } => format!(
                "floor({} / {})",
                child(lhs, PREC_MULTIPLICATIVE, false, render),
                child(rhs, PREC_MULTIPLICATIVE, true, render)
            ),
            Expr::Binary { op, lhs, rhs } => {
                let (left_strict, right_strict) = strictness(*op);
                format!(
                    "{} {} {}",
                    child(lhs, op.precedence(), left_strict, render),
                    op.cpp_symbol(),
                    child(rhs, op.precedence(), right_strict, render)
                )
            }
            Expr::Unary { op, operand } => {
                let inner = child(operand, PREC_UNARY, false, render);
                match op {
                    UnaryOp::Not => format!("!{}", inner),
                    UnaryOp::Negate => prefix_minus(&inner),
                }
            }
            Expr::Call { callee, args } => format!(
                "{}({})",
                child(callee, PREC_CALL, false, render),
                args.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_source())
    }
}

fn collect_variables<'a>(expr: &'a Expr, found: &mut Vec<(&'a str, bool)>) {
    match expr {
        Expr::Identifier { name, index } => {
            if !is_literal_name(name) {
                found.push((name.as_str(), index.is_some()));
            }
            if let Some(index) = index {
                collect_variables(index, found);
            }
        }
        Expr::Call { callee, args } => {
            if !matches!(**callee, Expr::Identifier { index: None, .. }) {
                collect_variables(callee, found);
            }
            for arg in args {
                collect_variables(arg, found);
            }
        }
        Expr::Assign { target, value } => {
            collect_variables(target, found);
            collect_variables(value, found);
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_variables(lhs, found);
            collect_variables(rhs, found);
        }
        Expr::Unary { operand, .. } => collect_variables(operand, found),
        Expr::Number { .. } => {}
    }
}

/// `true` and `false` are spelled as identifiers but never bind
pub fn is_literal_name(name: &str) -> bool {
    name == "true" || name == "false"
}

/// Whether each side of a binary operator must bind strictly tighter than it
fn strictness(op: BinaryOp) -> (bool, bool) {
    if op.is_right_assoc() {
        (true, false)
    } else {
        (false, true)
    }
}

fn child<F>(expr: &Expr, parent_prec: u8, strict: bool, render: F) -> String
where
    F: Fn(&Expr) -> String,
{
    let prec = expr.precedence();
    let needs_parens = if strict {
        prec <= parent_prec
    } else {
        prec < parent_prec
    };
    if needs_parens {
        format!("({})", render(expr))
    } else {
        render(expr)
    }
}

fn prefix_minus(inner: &str) -> String {
    if inner.starts_with('-') {
        format!("- {}", inner)
    } else {
        format!("-{}", inner)
    }
}

fn format_number(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else {
        format!("{}", v)
    }
}

/* ===================== Compiled Expression ===================== */

/// The compiled form of one editable expression field.
///
/// Keeps the text it was compiled from; an empty text compiles to no tree,
/// which marks an unset condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub text: String,
    pub root: Option<Expr>,
}

impl Expression {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
