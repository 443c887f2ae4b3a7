//! Expression interpreter.
//!
//! An expression is compiled (outside of remora) into a flat [`InstructionSequence`].
//! [`Interpreter`] runs it as a stack machine against a suspended thread of a target:
//! every remote operation goes through the [`RemoteProcess`] facade, local arithmetic
//! follows the promotion tables of [`crate::debugger::value`].

mod instruction;
mod machine;
pub mod ops;
pub mod resolve;
pub mod variable;

pub use instruction::{BinaryOp, Instruction, InstructionSequence, Literal, UnaryOp};
pub use resolve::{DeclaredType, TypeResolver};
pub use variable::{FrameRef, InternalVariable, InternalVariables, StackEntry, Variable};

use crate::config::{Config, EvalConfig};
use crate::debugger::error::Error;
use crate::debugger::eval::machine::{Env, Flow, Machine};
use crate::debugger::remote::{RemoteProcess, ThreadRef};
use crate::debugger::target::DebugTarget;
use crate::debugger::value::Value;
use crate::log::{default_reporter, Reporter};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of an evaluation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalOutcome {
    /// Program finished, `None` means that expression has no value (void).
    Completed(Option<Value>),
    /// Evaluation stopped by a [`StopHandle`] before program end.
    Cancelled,
}

/// Cooperative cancellation of a running evaluation, may be sent to another thread.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask interpreter to stop. Remote call in progress is not interrupted,
    /// next instruction is not started.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Place where an expression is evaluated.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub target: &'a DebugTarget,
    pub thread: ThreadRef,
    /// Frame number, 0 is the top frame.
    pub frame: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(target: &'a DebugTarget, thread: ThreadRef, frame: usize) -> Self {
        Self {
            target,
            thread,
            frame,
        }
    }

    /// Context of a top frame of the current target thread.
    pub fn current(target: &'a DebugTarget) -> Result<Self, Error> {
        let thread = target.current_thread().ok_or(Error::NoCurrentThread)?;
        Ok(Self::new(target, thread, 0))
    }

    fn remote(&self) -> &dyn RemoteProcess {
        self.target.remote()
    }
}

/// Stack machine that runs a single expression program.
///
/// Interpreter is not reentrant, the caller serializes evaluations on the same target.
pub struct Interpreter {
    program: InstructionSequence,
    machine: Machine,
    running: Arc<AtomicBool>,
    config: EvalConfig,
    reporter: Arc<dyn Reporter>,
}

impl Interpreter {
    pub fn new(program: impl Into<InstructionSequence>) -> Self {
        Self {
            program: program.into(),
            machine: Machine::default(),
            running: Arc::new(AtomicBool::new(true)),
            config: Config::global_default().eval.clone(),
            reporter: default_reporter(),
        }
    }

    pub fn with_config(self, config: EvalConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_reporter(self, reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter, ..self }
    }

    pub fn program(&self) -> &InstructionSequence {
        &self.program
    }

    /// Return a handle that stops this interpreter.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Depth of the evaluation stack after the last run.
    pub fn stack_depth(&self) -> usize {
        self.machine.depth()
    }

    /// Internal variables created by the last run.
    pub fn internal_variables(&self) -> &InternalVariables {
        self.machine.internals()
    }

    /// Run the program from the first instruction.
    ///
    /// Any error aborts the evaluation, partial state is discarded.
    pub fn run(&mut self, ctx: &EvalContext) -> Result<EvalOutcome, Error> {
        if ctx.target.is_terminated() {
            return Err(Error::TargetTerminated);
        }

        self.machine.reset();
        let env = Env {
            remote: ctx.remote(),
            frame: FrameRef {
                thread: ctx.thread,
                frame: ctx.frame,
            },
            config: &self.config,
        };

        let outcome = Self::execute(&self.program, &mut self.machine, &self.running, &env);
        match &outcome {
            Ok(EvalOutcome::Cancelled) => {
                self.machine.reset();
                self.reporter
                    .report_warning("interpreter", "evaluation cancelled");
            }
            Err(e) => {
                debug!(target: "interpreter", "evaluation failed: {e}");
                self.machine.reset();
            }
            Ok(EvalOutcome::Completed(_)) => {}
        }
        outcome
    }

    fn execute(
        program: &InstructionSequence,
        machine: &mut Machine,
        running: &AtomicBool,
        env: &Env,
    ) -> Result<EvalOutcome, Error> {
        let mut pc = 0;
        while let Some(instruction) = program.get(pc) {
            if !running.load(Ordering::SeqCst) {
                debug!(target: "interpreter", "stopped before instruction {pc}");
                return Ok(EvalOutcome::Cancelled);
            }

            debug!(target: "interpreter", "{pc:>3}: {instruction}");
            pc = match machine.execute(instruction, env)? {
                Flow::Next => pc + 1,
                Flow::Jump(offset) => {
                    // saturated target is always out of program
                    let target = (pc as isize).saturating_add(1).saturating_add(offset);
                    if target < 0 || target as usize > program.len() {
                        return Err(Error::JumpOutOfRange(target));
                    }
                    target as usize
                }
                Flow::Return => break,
            };
        }

        Ok(EvalOutcome::Completed(machine.result(env)?))
    }
}
