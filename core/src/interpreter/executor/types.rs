//! Control flow, frame and host-protocol types

use thiserror::Error;

use crate::interpreter::eval::EvalError;
use crate::interpreter::program::NodeId;
use crate::interpreter::scope::ScopeId;
use crate::interpreter::values::Val;

/* ===================== Errors ===================== */

/// A failure that halts the run at a statement boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("execution limit exceeded: loop ran {0} times")]
    ExecutionLimit(u64),

    #[error("{0} condition is empty")]
    EmptyCondition(&'static str),
}

/* ===================== Control Flow ===================== */

/// What a suspended run is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// A line of console input
    Input,
    /// One host tick, so the console can repaint
    Tick,
}

/// Control flow state
///
/// When control != None, the VM unwinds the frame stack to the frame that
/// handles it. `Suspend` stops the loop with every frame left in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    None,
    Break,
    Return(Option<Val>),
    Throw(RuntimeError),
    Suspend(Wait),
}

/* ===================== Frames ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ProcedurePhase {
    Enter,
    Body,
}

/// Frame kind - the type and state of a statement being executed
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// Boundary of one procedure activation
    Procedure { phase: ProcedurePhase },
    Block { idx: usize },
    Operation,
    /// `cursor` is the next template segment to process
    Input { cursor: usize },
    Output,
    If,
    /// `iters` counts completed entries into the body
    While { iters: u64 },
    Break,
    Return,
}

/// Execution frame - one per active statement
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,

    /// The statement this frame runs
    pub node: NodeId,

    /// Scope that expressions of this frame evaluate in
    pub scope: ScopeId,
}

/* ===================== Host Protocol ===================== */

/// Console effects, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    EndLine,
    Warning(String),
    Error(String),
}

/// Where a run stands, as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub enum VmState {
    Running,
    AwaitingInput,
    AwaitingTick,
    Finished(Option<Val>),
    Failed(RuntimeError),
}

impl VmState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VmState::Finished(_) | VmState::Failed(_))
    }
}

/// Guard rails for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Body entries allowed per `while` statement before the run is halted
    pub iteration_limit: u64,
    /// Live procedure activations allowed at once
    pub max_call_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            iteration_limit: 100_000,
            max_call_depth: 200,
        }
    }
}
