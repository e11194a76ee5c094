//! Effect programs
//!
//! A program is an explicit continuation object: a step machine that either
//! suspends on an [`Effect`] it needs performed or finishes with an
//! [`Outcome`]. It never performs I/O itself. Whoever drives it hands each
//! suspended effect to an interpreter and resumes the program with the
//! result, one effect at a time.
//!
//! Programs are built from the combinators in this module ([`perform`],
//! [`pure`], [`ProgramExt::and_then`], [`sequence`], ...) or written by hand
//! as an enum-state machine, like [`ReadThrough`].

use std::fmt;

use crate::effect::{Effect, EffectFamily, EffectResult, Request};
use crate::outcome::{InterpreterError, Outcome};

pub mod combinators;
pub mod patterns;

pub use combinators::{
    fail, perform, pure, sequence, AndThen, Fail, Map, Perform, ProgramExt, Pure, Sequence,
};
pub use patterns::ReadThrough;

//-----------------------------------------------------------------------------
// Protocol
//-----------------------------------------------------------------------------

/// The observable state of a program after one step
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Waiting for `Effect` to be interpreted
    Suspended(Effect),
    /// Finished with a value or with the failure that stopped it
    Done(Outcome<T>),
}

impl<T> Step<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }

    /// The pending effect, if suspended
    pub fn pending(&self) -> Option<&Effect> {
        match self {
            Step::Suspended(effect) => Some(effect),
            Step::Done(_) => None,
        }
    }
}

/// A resumable sequential computation over effects.
///
/// Implementations make forward progress on every call: each `start` or
/// `resume` returns either the next suspension or `Done`.
///
/// Calling `start` twice, or `resume` when the program is not suspended, is
/// a protocol violation and panics.
pub trait Program: Send {
    /// Final value on success
    type Output: Send;

    /// Run until the first suspension or completion
    fn start(&mut self) -> Step<Self::Output>;

    /// Deliver the result of the pending effect and run to the next step
    fn resume(&mut self, result: EffectResult) -> Step<Self::Output>;
}

/// A type-erased program
pub type BoxProgram<T> = Box<dyn Program<Output = T>>;

impl<P: Program + ?Sized> Program for Box<P> {
    type Output = P::Output;

    fn start(&mut self) -> Step<Self::Output> {
        (**self).start()
    }

    fn resume(&mut self, result: EffectResult) -> Step<Self::Output> {
        (**self).resume(result)
    }
}

/// Abort on a misuse of the suspend/resume protocol.
///
/// Protocol violations mean the caller is miswired; they are never turned
/// into an `Outcome`.
#[track_caller]
pub fn protocol_violation(detail: impl fmt::Display) -> ! {
    panic!("effect program protocol violation: {detail}")
}

/// Typed view of a result for the request that produced `pending`.
///
/// A result of the wrong shape becomes an `UnexpectedResult` failure naming
/// the pending effect.
pub fn accept<R: Request>(pending: &Effect, result: EffectResult) -> Outcome<R::Response> {
    R::accept(result).map_err(|other| InterpreterError::unexpected_result(pending.clone(), &other))
}

//-----------------------------------------------------------------------------
// Execution guard
//-----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Suspended {
        family: EffectFamily,
        operation: &'static str,
    },
    Finished,
}

/// A program under execution, with its protocol phase tracked.
///
/// The driver is the only intended owner. Every call is checked against the
/// phase the program last reported, so a miswired caller panics instead of
/// silently corrupting the program's state.
pub struct Execution<P: Program> {
    program: P,
    phase: Phase,
    steps: usize,
}

impl<P: Program> Execution<P> {
    pub fn new(program: P) -> Self {
        Self {
            program,
            phase: Phase::Ready,
            steps: 0,
        }
    }

    /// Run the program to its first step
    ///
    /// # Panics
    ///
    /// If the program was already started.
    #[track_caller]
    pub fn start(&mut self) -> Step<P::Output> {
        if self.phase != Phase::Ready {
            protocol_violation("start called on a program that was already started");
        }
        let step = self.program.start();
        self.observe(step)
    }

    /// Resume the program with the result of its pending effect
    ///
    /// # Panics
    ///
    /// If the program is not suspended: not yet started, or already done.
    #[track_caller]
    pub fn resume(&mut self, result: EffectResult) -> Step<P::Output> {
        match self.phase {
            Phase::Suspended { .. } => {}
            Phase::Ready => protocol_violation("resume called before the program was started"),
            Phase::Finished => {
                protocol_violation("resume called on a program that has already completed")
            }
        }
        let step = self.program.resume(result);
        self.observe(step)
    }

    /// Family and operation of the pending effect, if suspended
    pub fn pending(&self) -> Option<(EffectFamily, &'static str)> {
        match self.phase {
            Phase::Suspended { family, operation } => Some((family, operation)),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Number of suspensions observed so far
    pub fn suspensions(&self) -> usize {
        self.steps
    }

    fn observe(&mut self, step: Step<P::Output>) -> Step<P::Output> {
        self.phase = match &step {
            Step::Suspended(effect) => {
                self.steps += 1;
                Phase::Suspended {
                    family: effect.family(),
                    operation: effect.operation(),
                }
            }
            Step::Done(_) => Phase::Finished,
        };
        step
    }
}

impl<P: Program> fmt::Debug for Execution<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("program", &std::any::type_name::<P>())
            .field("phase", &self.phase)
            .field("suspensions", &self.steps)
            .finish()
    }
}
