//! Flowchart program tree
//!
//! Statements are stored in an arena and addressed by [`NodeId`]. A program is
//! built from its persistence record, compiled node by node; afterwards each
//! editable node goes through a parse/submit cycle that only replaces the
//! compiled form when the new text parses.

use std::cell::Cell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ast::Expression;
use super::format_string::FormatString;
use super::parser::{ExpressionParser, ParseError};

pub type NodeId = usize;

/* ===================== Statements ===================== */

/// Executable statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block {
        label: String,
        children: Vec<NodeId>,
    },
    Operation {
        expr: Expression,
    },
    Input {
        format: FormatString,
    },
    Output {
        format: FormatString,
        newline: bool,
    },
    If {
        cond: Expression,
        true_part: NodeId,
        false_part: NodeId,
    },
    While {
        cond: Expression,
        body: NodeId,
    },
    Break,
    Return {
        expr: Expression,
    },
}

impl Stmt {
    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Block { .. } => "flowblock",
            Stmt::Operation { .. } => "flowoperation",
            Stmt::Input { .. } => "flowin",
            Stmt::Output { .. } => "flowout",
            Stmt::If { .. } => "flowif",
            Stmt::While { .. } => "flowwhile",
            Stmt::Break => "flowbreak",
            Stmt::Return { .. } => "flowret",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub stmt: Stmt,
}

/* ===================== Persistence Record ===================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoLogic {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExprLogic {
    #[serde(default)]
    pub expr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CondLogic {
    #[serde(default)]
    pub cond: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatLogic {
    #[serde(default)]
    pub format_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nl: Option<bool>,
}

/// JSON-representable program tree, as saved and loaded by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeRecord {
    #[serde(rename = "flowblock")]
    Block {
        label: String,
        #[serde(default)]
        logic: NoLogic,
        #[serde(default)]
        children: Vec<NodeRecord>,
    },
    #[serde(rename = "flowoperation")]
    Operation { logic: ExprLogic },
    #[serde(rename = "flowin")]
    Input { logic: FormatLogic },
    #[serde(rename = "flowout")]
    Output { logic: FormatLogic },
    #[serde(rename = "flowif", rename_all = "camelCase")]
    If {
        logic: CondLogic,
        true_part: Box<NodeRecord>,
        false_part: Box<NodeRecord>,
    },
    #[serde(rename = "flowwhile")]
    While {
        logic: CondLogic,
        body: Box<NodeRecord>,
    },
    #[serde(rename = "flowbreak")]
    Break {
        #[serde(default)]
        logic: NoLogic,
    },
    #[serde(rename = "flowret")]
    Return { logic: ExprLogic },
}

impl NodeRecord {
    pub fn from_json(json: &str) -> Result<Self, ProgramError> {
        serde_json::from_str(json).map_err(|e| ProgramError::InvalidRecord(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ProgramError> {
        serde_json::to_string_pretty(self).map_err(|e| ProgramError::InvalidRecord(e.to_string()))
    }
}

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error("invalid program record: {0}")]
    InvalidRecord(String),

    #[error("the program root must be a block")]
    RootNotBlock,

    #[error("procedure '{0}' is defined more than once")]
    DuplicateProcedure(String),

    #[error("program has no 'main' procedure")]
    MissingMain,

    #[error("no procedure named '{0}'")]
    UnknownProcedure(String),

    #[error("{path}: {source}")]
    Node {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {node} is a {kind} and has no editable {field}")]
    NotEditable {
        node: NodeId,
        kind: &'static str,
        field: &'static str,
    },
}

/* ===================== Program ===================== */

/// A compiled flowchart program
#[derive(Debug, Clone)]
pub struct Program {
    nodes: Vec<Node>,
    root: NodeId,
    /// Named child blocks per block, rebuilt on every structural change
    named_children: HashMap<NodeId, HashMap<String, NodeId>>,
    dirty: Cell<bool>,
}

impl Program {
    /// Compile a persistence record. Every node's text must parse.
    pub fn from_record(record: &NodeRecord) -> Result<Self, ProgramError> {
        if !matches!(record, NodeRecord::Block { .. }) {
            return Err(ProgramError::RootNotBlock);
        }

        let mut program = Program {
            nodes: Vec::new(),
            root: 0,
            named_children: HashMap::new(),
            dirty: Cell::new(false),
        };
        program.root = program.add_record(record, None, "program")?;
        program.index_blocks()?;
        Ok(program)
    }

    pub fn from_json(json: &str) -> Result<Self, ProgramError> {
        Self::from_record(&NodeRecord::from_json(json)?)
    }

    /// Serialize back into a persistence record
    pub fn to_record(&self) -> NodeRecord {
        self.record_of(self.root)
    }

    fn add_record(&mut self, record: &NodeRecord, parent: Option<NodeId>, path: &str) -> Result<NodeId, ProgramError> {
        let id = self.nodes.len();
        // reserve the slot so children can refer to their parent
        self.nodes.push(Node {
            parent,
            stmt: Stmt::Break,
        });
        let wrap = |source: ParseError| ProgramError::Node {
            path: path.to_string(),
            source,
        };

        let stmt = match record {
            NodeRecord::Block { label, children, .. } => {
                let mut ids = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let child_path = format!("{}/{}[{}]", path, label, i);
                    ids.push(self.add_record(child, Some(id), &child_path)?);
                }
                Stmt::Block {
                    label: label.clone(),
                    children: ids,
                }
            }
            NodeRecord::Operation { logic } => Stmt::Operation {
                expr: ExpressionParser::operation().parse(&logic.expr).map_err(wrap)?,
            },
            NodeRecord::Return { logic } => Stmt::Return {
                expr: ExpressionParser::value().parse(&logic.expr).map_err(wrap)?,
            },
            NodeRecord::Input { logic } => Stmt::Input {
                format: FormatString::compile_input(&logic.format_string).map_err(wrap)?,
            },
            NodeRecord::Output { logic } => Stmt::Output {
                format: FormatString::compile_output(&logic.format_string).map_err(wrap)?,
                newline: logic.nl.unwrap_or(false),
            },
            NodeRecord::If {
                logic,
                true_part,
                false_part,
            } => {
                let cond = ExpressionParser::condition().parse(&logic.cond).map_err(wrap)?;
                let true_part = self.add_branch(true_part, id, &format!("{}/if.true", path))?;
                let false_part = self.add_branch(false_part, id, &format!("{}/if.false", path))?;
                Stmt::If {
                    cond,
                    true_part,
                    false_part,
                }
            }
            NodeRecord::While { logic, body } => {
                let cond = ExpressionParser::condition().parse(&logic.cond).map_err(wrap)?;
                let body = self.add_branch(body, id, &format!("{}/while.body", path))?;
                Stmt::While { cond, body }
            }
            NodeRecord::Break { .. } => Stmt::Break,
        };

        self.nodes[id].stmt = stmt;
        Ok(id)
    }

    fn add_branch(&mut self, record: &NodeRecord, parent: NodeId, path: &str) -> Result<NodeId, ProgramError> {
        if !matches!(record, NodeRecord::Block { .. }) {
            return Err(ProgramError::InvalidRecord(format!("{}: branch must be a block", path)));
        }
        self.add_record(record, Some(parent), path)
    }

    fn index_blocks(&mut self) -> Result<(), ProgramError> {
        let mut named_children = HashMap::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let Stmt::Block { children, .. } = &node.stmt else {
                continue;
            };
            let mut names = HashMap::new();
            for &child in children {
                if let Stmt::Block { label, .. } = &self.nodes[child].stmt {
                    if names.insert(label.clone(), child).is_some() {
                        return Err(ProgramError::DuplicateProcedure(label.clone()));
                    }
                }
            }
            named_children.insert(id, names);
        }
        self.named_children = named_children;
        Ok(())
    }

    fn record_of(&self, id: NodeId) -> NodeRecord {
        match &self.nodes[id].stmt {
            Stmt::Block { label, children } => NodeRecord::Block {
                label: label.clone(),
                logic: NoLogic {},
                children: children.iter().map(|&c| self.record_of(c)).collect(),
            },
            Stmt::Operation { expr } => NodeRecord::Operation {
                logic: ExprLogic {
                    expr: expr.text.clone(),
                },
            },
            Stmt::Return { expr } => NodeRecord::Return {
                logic: ExprLogic {
                    expr: expr.text.clone(),
                },
            },
            Stmt::Input { format } => NodeRecord::Input {
                logic: FormatLogic {
                    format_string: format.text.clone(),
                    nl: None,
                },
            },
            Stmt::Output { format, newline } => NodeRecord::Output {
                logic: FormatLogic {
                    format_string: format.text.clone(),
                    nl: Some(*newline),
                },
            },
            Stmt::If {
                cond,
                true_part,
                false_part,
            } => NodeRecord::If {
                logic: CondLogic {
                    cond: cond.text.clone(),
                },
                true_part: Box::new(self.record_of(*true_part)),
                false_part: Box::new(self.record_of(*false_part)),
            },
            Stmt::While { cond, body } => NodeRecord::While {
                logic: CondLogic {
                    cond: cond.text.clone(),
                },
                body: Box::new(self.record_of(*body)),
            },
            Stmt::Break => NodeRecord::Break { logic: NoLogic {} },
        }
    }

    /* ===================== Queries ===================== */

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The program's display label
    pub fn label(&self) -> &str {
        match &self.nodes[self.root].stmt {
            Stmt::Block { label, .. } => label,
            _ => "program",
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn stmt(&self, id: NodeId) -> Option<&Stmt> {
        self.nodes.get(id).map(|n| &n.stmt)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Procedure blocks (the root's direct block children), in order
    pub fn procedures(&self) -> Vec<(&str, NodeId)> {
        match &self.nodes[self.root].stmt {
            Stmt::Block { children, .. } => children
                .iter()
                .filter_map(|&c| match &self.nodes[c].stmt {
                    Stmt::Block { label, .. } => Some((label.as_str(), c)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nearest block strictly enclosing `id`
    pub fn enclosing_block(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(id)?.parent;
        while let Some(node) = current {
            if matches!(self.nodes[node].stmt, Stmt::Block { .. }) {
                return Some(node);
            }
            current = self.nodes[node].parent;
        }
        None
    }

    /// Resolve a procedure name as seen from block `from`: named child blocks at
    /// this level, then the block's own name, then the enclosing block.
    pub fn find_block(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(block) = current {
            if let Some(&found) = self.named_children.get(&block).and_then(|names| names.get(name)) {
                return Some(found);
            }
            if matches!(&self.nodes[block].stmt, Stmt::Block { label, .. } if label == name) {
                return Some(block);
            }
            current = self.enclosing_block(block);
        }
        None
    }

    /// Whether `id` or anything beneath it is a `return` statement
    pub fn contains_return(&self, id: NodeId) -> bool {
        match &self.nodes[id].stmt {
            Stmt::Return { .. } => true,
            Stmt::Block { children, .. } => children.iter().any(|&c| self.contains_return(c)),
            Stmt::If {
                true_part,
                false_part,
                ..
            } => self.contains_return(*true_part) || self.contains_return(*false_part),
            Stmt::While { body, .. } => self.contains_return(*body),
            _ => false,
        }
    }

    /* ===================== Editing ===================== */

    /// Re-parse one node's text.
    ///
    /// On success the compiled expression or template is replaced and the
    /// program is marked modified; on failure the previous state is kept.
    pub fn submit(&mut self, id: NodeId, text: &str) -> Result<(), ProgramError> {
        let node = self.nodes.get_mut(id).ok_or(ProgramError::UnknownNode(id))?;
        let path = format!("node {}", id);
        let wrap = |source: ParseError| ProgramError::Node {
            path: path.clone(),
            source,
        };

        match &mut node.stmt {
            Stmt::Operation { expr } => {
                *expr = ExpressionParser::operation().parse(text).map_err(wrap)?;
            }
            Stmt::Return { expr } => {
                *expr = ExpressionParser::value().parse(text).map_err(wrap)?;
            }
            Stmt::If { cond, .. } | Stmt::While { cond, .. } => {
                *cond = ExpressionParser::condition().parse(text).map_err(wrap)?;
            }
            Stmt::Input { format } => {
                *format = FormatString::compile_input(text).map_err(wrap)?;
            }
            Stmt::Output { format, .. } => {
                *format = FormatString::compile_output(text).map_err(wrap)?;
            }
            Stmt::Block { .. } | Stmt::Break => {
                return Err(ProgramError::NotEditable {
                    node: id,
                    kind: node.stmt.kind(),
                    field: "text",
                })
            }
        }

        self.dirty.set(true);
        Ok(())
    }

    /// Toggle the trailing newline of an output node
    pub fn set_newline(&mut self, id: NodeId, value: bool) -> Result<(), ProgramError> {
        let node = self.nodes.get_mut(id).ok_or(ProgramError::UnknownNode(id))?;
        match &mut node.stmt {
            Stmt::Output { newline, .. } => *newline = value,
            other => {
                return Err(ProgramError::NotEditable {
                    node: id,
                    kind: other.kind(),
                    field: "newline",
                })
            }
        }
        self.dirty.set(true);
        Ok(())
    }

    /// Rename a block; procedure names must stay unique among siblings
    pub fn rename(&mut self, id: NodeId, new_label: &str) -> Result<(), ProgramError> {
        let node = self.nodes.get_mut(id).ok_or(ProgramError::UnknownNode(id))?;
        let Stmt::Block { label, .. } = &mut node.stmt else {
            return Err(ProgramError::NotEditable {
                node: id,
                kind: node.stmt.kind(),
                field: "label",
            });
        };
        let previous = std::mem::replace(label, new_label.to_string());
        if let Err(err) = self.index_blocks() {
            if let Stmt::Block { label, .. } = &mut self.nodes[id].stmt {
                *label = previous;
            }
            self.index_blocks()?;
            return Err(err);
        }
        self.dirty.set(true);
        Ok(())
    }

    /// Whether the program changed since the flag was last cleared
    pub fn is_modified(&self) -> bool {
        self.dirty.get()
    }

    pub fn clear_modified(&self) {
        self.dirty.set(false);
    }
}
