//! Program builders shared by tests
//!
//! Programs are written as persistence records with `serde_json::json!` and
//! compiled through `Program::from_record`, the same path a saved file takes.

use serde_json::{json, Value};

use crate::interpreter::program::{NodeRecord, Program};

pub fn block(label: &str, children: Vec<Value>) -> Value {
    json!({ "kind": "flowblock", "label": label, "children": children })
}

pub fn op(expr: &str) -> Value {
    json!({ "kind": "flowoperation", "logic": { "expr": expr } })
}

/// Output statement with a trailing newline
pub fn out(format: &str) -> Value {
    json!({ "kind": "flowout", "logic": { "formatString": format, "nl": true } })
}

/// Output statement without a trailing newline
pub fn out_inline(format: &str) -> Value {
    json!({ "kind": "flowout", "logic": { "formatString": format, "nl": false } })
}

pub fn input(format: &str) -> Value {
    json!({ "kind": "flowin", "logic": { "formatString": format } })
}

pub fn if_(cond: &str, true_part: Vec<Value>, false_part: Vec<Value>) -> Value {
    json!({
        "kind": "flowif",
        "logic": { "cond": cond },
        "truePart": block("", true_part),
        "falsePart": block("", false_part),
    })
}

pub fn while_(cond: &str, body: Vec<Value>) -> Value {
    json!({ "kind": "flowwhile", "logic": { "cond": cond }, "body": block("", body) })
}

pub fn brk() -> Value {
    json!({ "kind": "flowbreak" })
}

pub fn ret(expr: &str) -> Value {
    json!({ "kind": "flowret", "logic": { "expr": expr } })
}

/// Compile a program whose root holds the given procedure blocks
pub fn program(procedures: Vec<Value>) -> Program {
    let record: NodeRecord =
        serde_json::from_value(block("test", procedures)).expect("Record deserialization failed");
    Program::from_record(&record).expect("Program compilation failed")
}

