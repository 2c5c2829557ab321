//! C++ generator
//!
//! Every procedure becomes one function. Names are classified per procedure:
//! `arg<N>` names become parameters (the largest N sets the arity), names
//! subscripted anywhere become fixed-size arrays indexed through a clamping
//! macro, and every other name becomes a `double` declared at the outermost
//! block whose direct statements mention it.

use std::collections::HashSet;

use tracing::debug;

use crate::interpreter::ast::{BinaryOp, Expr, TargetOptions, TypeHint, INDEX_MACRO};
use crate::interpreter::format_string::{FormatString, Segment};
use crate::interpreter::program::{NodeId, Program, Stmt};

/// Layout knobs for generated source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CppOptions {
    /// Output statements wrap onto continuation lines past this column
    pub column_budget: usize,
    pub indent_width: usize,
    /// Declared length of array-style variables
    pub array_size: usize,
}

impl Default for CppOptions {
    fn default() -> Self {
        Self {
            column_budget: 80,
            indent_width: 4,
            array_size: 100,
        }
    }
}

/* ===================== Translation Unit ===================== */

/// Generate one C++ translation unit for the whole program
pub fn generate_cpp(program: &Program, options: &CppOptions) -> String {
    let procedures = program.procedures();
    let names: HashSet<&str> = procedures.iter().map(|(name, _)| *name).collect();

    let mut functions = Vec::new();
    let mut declarations = Vec::new();
    let mut uses_arrays = false;

    for &(name, block) in &procedures {
        let shape = ProcedureShape::scan(program, block);
        let booleans = shape.booleans();
        debug!(procedure = name, arity = shape.arity, arrays = shape.arrays.len(), "generating function");
        uses_arrays |= !shape.arrays.is_empty();

        let signature = signature(program, name, block, shape.arity);
        if name != "main" {
            declarations.push(format!("{};", signature));
        }

        let mut writer = FunctionWriter {
            program,
            options,
            target: TargetOptions {
                array_size: options.array_size,
            },
            is_main: name == "main",
            procedures: &names,
            arrays: shape.arrays,
            booleans,
            bound: Vec::new(),
            depth: 0,
            lines: vec![signature],
        };
        writer.block(block, true);
        functions.push(writer.lines.join("\n"));
    }

    let mut out = vec![format!("// {}.cpp", program.label()), "#include <iostream>".to_string()];
    if uses_math(program) {
        out.push("#include <cmath>".to_string());
    }
    if uses_arrays {
        // the subscript is evaluated exactly once, side effects included
        out.push(
            "static inline int pf_index(double i, int n) { return i < 0 ? 0 : i >= n ? n - 1 : (int)i; }"
                .to_string(),
        );
        out.push(format!("#define {}(i, n) pf_index((i), (n))", INDEX_MACRO));
    }
    out.push("using namespace std;".to_string());
    out.push(String::new());

    if !declarations.is_empty() {
        out.extend(declarations);
        out.push(String::new());
    }
    out.push(functions.join("\n\n"));

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn signature(program: &Program, name: &str, block: NodeId, arity: usize) -> String {
    let params = (1..=arity)
        .map(|i| format!("double arg{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let return_type = if name == "main" {
        "int"
    } else if program.contains_return(block) {
        "double"
    } else {
        "void"
    };
    format!("{} {}({})", return_type, name, params)
}

/// Whether any expression needs `pow` or `floor`
fn uses_math(program: &Program) -> bool {
    (0..program.len())
        .filter_map(|id| program.stmt(id))
        .flat_map(expressions_of)
        .any(|e| e.uses_op(BinaryOp::Pow) || e.uses_op(BinaryOp::IDiv))
}

fn expressions_of(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Operation { expr } | Stmt::Return { expr } => expr.root.iter().collect(),
        Stmt::If { cond, .. } | Stmt::While { cond, .. } => cond.root.iter().collect(),
        Stmt::Input { format } | Stmt::Output { format, .. } => format.expressions().collect(),
        Stmt::Block { .. } | Stmt::Break => Vec::new(),
    }
}

/// Variables a statement mentions itself, not counting nested blocks
fn direct_variables(stmt: &Stmt) -> Vec<(&str, bool)> {
    match stmt {
        Stmt::Input { format } | Stmt::Output { format, .. } => format.variables(),
        other => expressions_of(other).into_iter().flat_map(Expr::variables).collect(),
    }
}

/// Positional argument number of an `arg<N>` name
fn arg_number(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("arg")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/* ===================== Procedure Scan ===================== */

/// Names classified across one procedure's whole subtree
struct ProcedureShape {
    arity: usize,
    arrays: HashSet<String>,
    /// Scalars given a boolean value somewhere
    boolean_stores: HashSet<String>,
    /// Scalars given a numeric (or unknown) value somewhere, input included
    numeric_stores: HashSet<String>,
}

impl ProcedureShape {
    fn scan(program: &Program, block: NodeId) -> Self {
        let mut shape = ProcedureShape {
            arity: 0,
            arrays: HashSet::new(),
            boolean_stores: HashSet::new(),
            numeric_stores: HashSet::new(),
        };
        shape.visit(program, block);
        shape
    }

    /// Scalars that only ever hold booleans; they print as `true`/`false`
    fn booleans(&self) -> HashSet<String> {
        self.boolean_stores.difference(&self.numeric_stores).cloned().collect()
    }

    fn record_stores(&mut self, stmt: &Stmt) {
        if let Stmt::Input { format } = stmt {
            for segment in format.segments() {
                match segment {
                    Segment::Variable(name) => {
                        self.numeric_stores.insert(name.clone());
                    }
                    Segment::Expression {
                        expr: Expr::Identifier { name, index: None },
                        ..
                    } => {
                        self.numeric_stores.insert(name.clone());
                    }
                    _ => {}
                }
            }
            return;
        }

        for expr in expressions_of(stmt) {
            expr.walk(&mut |node| {
                let Expr::Assign { target, value } = node else {
                    return;
                };
                let Expr::Identifier { name, index: None } = &**target else {
                    return;
                };
                if value.type_hint() == TypeHint::Boolean {
                    self.boolean_stores.insert(name.clone());
                } else {
                    self.numeric_stores.insert(name.clone());
                }
            });
        }
    }

    fn visit(&mut self, program: &Program, id: NodeId) {
        let Some(stmt) = program.stmt(id) else {
            return;
        };
        for (name, subscripted) in direct_variables(stmt) {
            if let Some(n) = arg_number(name) {
                self.arity = self.arity.max(n);
            } else if subscripted {
                self.arrays.insert(name.to_string());
            }
        }
        self.record_stores(stmt);
        match stmt {
            Stmt::Block { children, .. } => {
                for &child in children {
                    self.visit(program, child);
                }
            }
            Stmt::If {
                true_part,
                false_part,
                ..
            } => {
                self.visit(program, *true_part);
                self.visit(program, *false_part);
            }
            Stmt::While { body, .. } => self.visit(program, *body),
            _ => {}
        }
    }
}

/* ===================== Function Body ===================== */

struct FunctionWriter<'a> {
    program: &'a Program,
    options: &'a CppOptions,
    target: TargetOptions,
    is_main: bool,
    procedures: &'a HashSet<&'a str>,
    arrays: HashSet<String>,
    booleans: HashSet<String>,
    /// Names declared by each open block, innermost last
    bound: Vec<HashSet<String>>,
    depth: usize,
    lines: Vec<String>,
}

impl FunctionWriter<'_> {
    fn line(&mut self, text: impl AsRef<str>) {
        let indent = " ".repeat(self.depth * self.options.indent_width);
        self.lines.push(format!("{}{}", indent, text.as_ref()));
    }

    fn is_boolean(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Identifier { name, index: None } => {
                expr.type_hint() == TypeHint::Boolean || self.booleans.contains(name)
            }
            _ => expr.type_hint() == TypeHint::Boolean,
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|scope| scope.contains(name))
    }

    fn block(&mut self, id: NodeId, braces: bool) {
        let program = self.program;
        let Some(Stmt::Block { children, .. }) = program.stmt(id) else {
            return;
        };

        // names first mentioned by this block's own statements are declared here
        let mut fresh: Vec<String> = Vec::new();
        for &child in children {
            let Some(stmt) = program.stmt(child) else {
                continue;
            };
            for (name, _) in direct_variables(stmt) {
                if arg_number(name).is_some()
                    || self.procedures.contains(name)
                    || self.is_bound(name)
                    || fresh.iter().any(|f| f == name)
                {
                    continue;
                }
                fresh.push(name.to_string());
            }
        }

        if braces {
            self.line("{");
        }
        self.depth += 1;
        for name in &fresh {
            if self.arrays.contains(name) {
                let decl = format!("double {}[{}];", name, self.options.array_size);
                self.line(decl);
            } else {
                self.line(format!("double {};", name));
            }
        }
        self.bound.push(fresh.into_iter().collect());

        for &child in children {
            self.stmt(child);
        }

        self.bound.pop();
        self.depth -= 1;
        if braces {
            self.line("}");
        }
    }

    fn stmt(&mut self, id: NodeId) {
        let program = self.program;
        let Some(stmt) = program.stmt(id) else {
            return;
        };
        match stmt {
            Stmt::Block { .. } => self.block(id, true),
            Stmt::Operation { expr } => {
                if let Some(root) = &expr.root {
                    let text = format!("{};", root.to_cpp(&self.target));
                    self.line(text);
                }
            }
            Stmt::Return { expr } => {
                let text = match (&expr.root, self.is_main) {
                    (Some(root), _) => format!("return {};", root.to_cpp(&self.target)),
                    (None, true) => "return 0;".to_string(),
                    (None, false) => "return 0.0;".to_string(),
                };
                self.line(text);
            }
            Stmt::Input { format } => self.input(format),
            Stmt::Output { format, newline } => self.output(format, *newline),
            Stmt::If {
                cond,
                true_part,
                false_part,
            } => {
                let text = format!("if ({}) {{", self.condition(cond.root.as_ref()));
                self.line(text);
                self.block(*true_part, false);
                self.line("}");
                let has_else = matches!(
                    program.stmt(*false_part),
                    Some(Stmt::Block { children, .. }) if !children.is_empty()
                );
                if has_else {
                    self.line("else {");
                    self.block(*false_part, false);
                    self.line("}");
                }
            }
            Stmt::While { cond, body } => {
                let text = format!("while ({}) {{", self.condition(cond.root.as_ref()));
                self.line(text);
                self.block(*body, false);
                self.line("}");
            }
            Stmt::Break => self.line("break;"),
        }
    }

    /// An unset condition never holds
    fn condition(&self, cond: Option<&Expr>) -> String {
        cond.map(|e| e.to_cpp(&self.target)).unwrap_or_else(|| "false".to_string())
    }

    /// Prompts print as they come; runs of adjacent sites share one `cin`
    fn input(&mut self, format: &FormatString) {
        let mut sites: Vec<String> = Vec::new();
        for segment in format.segments() {
            match segment {
                Segment::Literal(text) => {
                    self.flush_cin(&mut sites);
                    self.line(format!("cout << {};", cpp_string(text)));
                }
                Segment::Variable(name) => sites.push(name.clone()),
                Segment::Expression { expr, .. } => sites.push(expr.to_cpp(&self.target)),
            }
        }
        self.flush_cin(&mut sites);
    }

    fn flush_cin(&mut self, sites: &mut Vec<String>) {
        if sites.is_empty() {
            return;
        }
        let text = format!("cin >> {};", sites.join(" >> "));
        sites.clear();
        self.line(text);
    }

    /// One chained `cout` statement, wrapped onto `<<` continuation lines
    fn output(&mut self, format: &FormatString, newline: bool) {
        let mut pieces: Vec<Piece> = format
            .segments()
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Piece::Literal(text.clone()),
                Segment::Variable(name) if self.booleans.contains(name) => Piece::Code(boolean_text(name)),
                Segment::Variable(name) => Piece::Code(name.clone()),
                Segment::Expression { expr, .. } => {
                    let code = expr.to_cpp(&self.target);
                    if self.is_boolean(expr) {
                        Piece::Code(boolean_text(&code))
                    } else {
                        Piece::Code(code)
                    }
                }
            })
            .collect();

        if newline {
            match pieces.last_mut() {
                Some(Piece::Literal(text)) => text.push('\n'),
                _ => pieces.push(Piece::Literal("\n".to_string())),
            }
        }
        if pieces.is_empty() {
            return;
        }

        let indent = self.depth * self.options.indent_width;
        let mut current = String::from("cout");
        let mut wrapped: Vec<String> = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            let text = piece.render();
            let fits = indent + current.len() + 4 + text.len() < self.options.column_budget;
            if i == 0 || fits {
                current.push_str(" << ");
            } else {
                wrapped.push(std::mem::replace(&mut current, "    ".to_string()));
                current.push_str(" << ");
            }
            current.push_str(&text);
        }
        current.push(';');
        wrapped.push(current);

        for text in wrapped {
            self.line(text);
        }
    }
}

fn boolean_text(code: &str) -> String {
    format!("({} ? \"true\" : \"false\")", code)
}

enum Piece {
    Literal(String),
    Code(String),
}

impl Piece {
    fn render(&self) -> String {
        match self {
            Piece::Literal(text) => cpp_string(text),
            Piece::Code(code) => code.clone(),
        }
    }
}

fn cpp_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
