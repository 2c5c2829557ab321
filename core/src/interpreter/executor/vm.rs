//! Virtual Machine state
//!
//! The VM holds all execution state for one run of a program:
//! - frames: stack of active statements
//! - control: current control flow state (return, break, throw, suspend)
//! - scopes and activations: variable tables, one set per live procedure call
//! - outbox and pending input: the host's side of the console

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use super::exec_loop::run_until_done;
use super::types::{Control, ExecutionLimits, Frame, FrameKind, Output, ProcedurePhase, VmState, Wait};
use crate::interpreter::program::{NodeId, Program, ProgramError, Stmt};
use crate::interpreter::scope::{ScopeChain, ScopeId, ROOT_SCOPE};
use crate::interpreter::values::Val;

/* ===================== Activations ===================== */

/// One live execution of a procedure
#[derive(Debug, Clone)]
pub struct Activation {
    /// The procedure's block
    pub procedure: NodeId,
    pub name: String,
    /// Positional arguments, bound as `arg1..argN` when the block is entered
    pub args: Vec<Val>,
    /// Scope-chain length when the activation started
    pub base: usize,
    /// Scope of every block this activation has entered
    pub scopes: HashMap<NodeId, ScopeId>,
}

/* ===================== VM ===================== */

/// Virtual Machine state
#[derive(Debug, Clone)]
pub struct VM<'p> {
    pub(super) program: &'p Program,

    /// Stack of execution frames
    pub frames: Vec<Frame>,

    /// Current control flow state
    pub control: Control,

    pub(super) scopes: ScopeChain,
    pub(super) activations: Vec<Activation>,
    pub(super) outbox: Vec<Output>,
    /// Whitespace-delimited input tokens not consumed yet
    pub(super) pending: VecDeque<String>,
    pub(super) state: VmState,
    pub(super) limits: ExecutionLimits,
    /// Depth of synchronous runs started by procedure calls inside expressions
    pub(super) nested: usize,
    /// Value of the most recently finished nested call
    pub(super) call_result: Option<Val>,
}

impl<'p> VM<'p> {
    /// Create a VM that runs the program's `main` procedure
    pub fn new(program: &'p Program, limits: ExecutionLimits) -> Result<Self, ProgramError> {
        Self::with_entry(program, "main", Vec::new(), limits)
    }

    /// Create a VM that runs any named procedure with positional arguments
    pub fn with_entry(
        program: &'p Program,
        entry: &str,
        args: Vec<Val>,
        limits: ExecutionLimits,
    ) -> Result<Self, ProgramError> {
        let block = program.find_block(program.root(), entry).ok_or_else(|| {
            if entry == "main" {
                ProgramError::MissingMain
            } else {
                ProgramError::UnknownProcedure(entry.to_string())
            }
        })?;

        let mut vm = VM {
            program,
            frames: vec![],
            control: Control::None,
            scopes: ScopeChain::new(program.root()),
            activations: vec![],
            outbox: vec![],
            pending: VecDeque::new(),
            state: VmState::Running,
            limits,
            nested: 0,
            call_result: None,
        };

        info!(program = program.label(), entry, "starting run");
        push_procedure(&mut vm, block, args);

        Ok(vm)
    }

    /* ===================== Host API ===================== */

    /// Run until the program finishes, fails, or suspends
    pub fn run(&mut self) -> &VmState {
        if self.state == VmState::Running {
            run_until_done(self);
        }
        &self.state
    }

    /// Continue after a tick, or after input arrived
    pub fn resume(&mut self) -> &VmState {
        let ready = match self.state {
            VmState::AwaitingTick => true,
            VmState::AwaitingInput => !self.pending.is_empty(),
            _ => false,
        };
        if ready {
            debug!(state = ?self.state, "resuming");
            self.control = Control::None;
            self.state = VmState::Running;
        }
        self.run()
    }

    /// Deliver one line of console input
    ///
    /// The line is split into whitespace-delimited tokens; tokens left over
    /// after the waiting statement is satisfied feed later input statements.
    pub fn provide_line(&mut self, line: &str) -> &VmState {
        self.pending.extend(line.split_whitespace().map(str::to_string));
        if self.state == VmState::AwaitingInput {
            return self.resume();
        }
        &self.state
    }

    pub fn state(&self) -> &VmState {
        &self.state
    }

    pub fn output(&self) -> &[Output] {
        &self.outbox
    }

    /// Take every console effect produced so far
    pub fn drain_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_tokens(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn scopes(&self) -> &ScopeChain {
        &self.scopes
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Scope of the innermost frame
    pub fn current_scope(&self) -> ScopeId {
        self.frames.last().map(|f| f.scope).unwrap_or(ROOT_SCOPE)
    }

    /// Block that owns the innermost frame's scope
    pub fn current_block(&self) -> NodeId {
        self.scopes
            .get(self.current_scope())
            .map(|scope| scope.block)
            .unwrap_or_else(|| self.program.root())
    }

    pub(super) fn warn(&mut self, message: String) {
        self.outbox.push(Output::Warning(message));
    }
}

/* ===================== Frame Management ===================== */

/// Start a new activation of `block`
pub fn push_procedure(vm: &mut VM<'_>, block: NodeId, args: Vec<Val>) {
    let name = match vm.program.stmt(block) {
        Some(Stmt::Block { label, .. }) => label.clone(),
        _ => String::new(),
    };
    debug!(procedure = %name, depth = vm.activations.len() + 1, "entering procedure");

    vm.activations.push(Activation {
        procedure: block,
        name,
        args,
        base: vm.scopes.len(),
        scopes: HashMap::new(),
    });
    vm.frames.push(Frame {
        kind: FrameKind::Procedure {
            phase: ProcedurePhase::Enter,
        },
        node: block,
        scope: ROOT_SCOPE,
    });
}

/// End the innermost activation, handing `value` to whoever called it
pub fn finish_procedure(vm: &mut VM<'_>, value: Option<Val>) {
    vm.frames.pop();
    let Some(activation) = vm.activations.pop() else {
        return;
    };
    debug!(procedure = %activation.name, result = ?value, "leaving procedure");

    if vm.frames.is_empty() {
        // the entry procedure keeps its scopes so the final state stays inspectable
        info!(procedure = %activation.name, result = ?value, "run finished");
        vm.state = VmState::Finished(value);
    } else {
        vm.scopes.truncate(activation.base);
        vm.call_result = value;
    }
}

/// Push a new frame for a statement onto the stack
///
/// Blocks get the scope of the current activation for that block, created on
/// first entry; every other statement evaluates in `scope`.
pub fn push_stmt(vm: &mut VM<'_>, node: NodeId, scope: ScopeId) {
    let program = vm.program;
    let Some(stmt) = program.stmt(node) else {
        return;
    };

    let (kind, scope) = match stmt {
        Stmt::Block { .. } => (FrameKind::Block { idx: 0 }, enter_block(vm, node, scope)),
        Stmt::Operation { .. } => (FrameKind::Operation, scope),
        Stmt::Input { .. } => (FrameKind::Input { cursor: 0 }, scope),
        Stmt::Output { .. } => (FrameKind::Output, scope),
        Stmt::If { .. } => (FrameKind::If, scope),
        Stmt::While { .. } => (FrameKind::While { iters: 0 }, scope),
        Stmt::Break => (FrameKind::Break, scope),
        Stmt::Return { .. } => (FrameKind::Return, scope),
    };

    vm.frames.push(Frame { kind, node, scope });
}

fn enter_block(vm: &mut VM<'_>, block: NodeId, parent: ScopeId) -> ScopeId {
    let Some(activation) = vm.activations.last_mut() else {
        return parent;
    };
    if let Some(&existing) = activation.scopes.get(&block) {
        return existing;
    }

    let id = vm.scopes.push(block, parent);
    activation.scopes.insert(block, id);
    if block == activation.procedure {
        for (i, value) in activation.args.iter().enumerate() {
            vm.scopes.create(id, &format!("arg{}", i + 1), None, *value);
        }
    }
    id
}

/// Replace the top frame's kind in place
pub fn set_top_kind(vm: &mut VM<'_>, kind: FrameKind) {
    if let Some(frame) = vm.frames.last_mut() {
        frame.kind = kind;
    }
}

/// Record a suspension; the loop stops on the next step
pub fn suspend(vm: &mut VM<'_>, wait: Wait) {
    vm.control = Control::Suspend(wait);
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution stopped: finished, failed or suspended
    Done,
}
