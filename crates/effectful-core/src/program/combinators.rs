// Program combinators
//
// Small state machines that build larger programs out of single requests.
// `and_then` is the delegation combinator: it runs a sub-program to
// completion, then continues with the program built from its value.

use std::marker::PhantomData;
use std::mem;

use super::{accept, protocol_violation, BoxProgram, Program, Step};
use crate::effect::{Effect, EffectResult, Request};
use crate::outcome::InterpreterError;

//-----------------------------------------------------------------------------
// Leaves
//-----------------------------------------------------------------------------

/// A program that performs one request and finishes with its typed response
#[derive(Debug)]
pub struct Perform<R: Request> {
    request: Option<R>,
    pending: Option<Effect>,
}

/// Suspend on `request`, finish with its response
pub fn perform<R: Request>(request: R) -> Perform<R> {
    Perform {
        request: Some(request),
        pending: None,
    }
}

impl<R: Request> Program for Perform<R> {
    type Output = R::Response;

    fn start(&mut self) -> Step<Self::Output> {
        let Some(request) = self.request.take() else {
            protocol_violation("start called on a program that was already started");
        };
        let effect: Effect = request.into();
        self.pending = Some(effect.clone());
        Step::Suspended(effect)
    }

    fn resume(&mut self, result: EffectResult) -> Step<Self::Output> {
        let Some(pending) = self.pending.take() else {
            protocol_violation("resume called on a request that is not suspended");
        };
        Step::Done(accept::<R>(&pending, result))
    }
}

/// A program that finishes immediately with a value
#[derive(Debug)]
pub struct Pure<T> {
    value: Option<T>,
}

pub fn pure<T: Send>(value: T) -> Pure<T> {
    Pure { value: Some(value) }
}

impl<T: Send> Program for Pure<T> {
    type Output = T;

    fn start(&mut self) -> Step<T> {
        match self.value.take() {
            Some(value) => Step::Done(Ok(value)),
            None => protocol_violation("start called on a program that was already started"),
        }
    }

    fn resume(&mut self, _result: EffectResult) -> Step<T> {
        protocol_violation("resume called on a program that never suspends")
    }
}

/// A program that finishes immediately with a failure
#[derive(Debug)]
pub struct Fail<T> {
    error: Option<InterpreterError>,
    _output: PhantomData<fn() -> T>,
}

pub fn fail<T: Send>(error: InterpreterError) -> Fail<T> {
    Fail {
        error: Some(error),
        _output: PhantomData,
    }
}

impl<T: Send> Program for Fail<T> {
    type Output = T;

    fn start(&mut self) -> Step<T> {
        match self.error.take() {
            Some(error) => Step::Done(Err(error)),
            None => protocol_violation("start called on a program that was already started"),
        }
    }

    fn resume(&mut self, _result: EffectResult) -> Step<T> {
        protocol_violation("resume called on a program that never suspends")
    }
}

//-----------------------------------------------------------------------------
// Composition
//-----------------------------------------------------------------------------

/// Combinator methods available on every program
pub trait ProgramExt: Program + Sized {
    /// Transform the final value; failures pass through untouched
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        U: Send,
        F: FnOnce(Self::Output) -> U + Send,
    {
        Map {
            program: self,
            f: Some(f),
        }
    }

    /// Run this program, then the program built from its value.
    ///
    /// The combined effect sequence is this program's effects followed by the
    /// continuation's, exactly as if they had been written inline. A failure
    /// in this program finishes the whole composition without building the
    /// continuation.
    fn and_then<Q, F>(self, f: F) -> AndThen<Self, F, Q>
    where
        Q: Program,
        F: FnOnce(Self::Output) -> Q + Send,
    {
        AndThen {
            stage: Stage::First {
                program: self,
                next: f,
            },
        }
    }

    fn boxed(self) -> BoxProgram<Self::Output>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<P: Program> ProgramExt for P {}

/// See [`ProgramExt::map`]
pub struct Map<P, F> {
    program: P,
    f: Option<F>,
}

impl<P, F, U> Map<P, F>
where
    P: Program,
    F: FnOnce(P::Output) -> U,
{
    fn finish(&mut self, step: Step<P::Output>) -> Step<U> {
        match step {
            Step::Suspended(effect) => Step::Suspended(effect),
            Step::Done(outcome) => match self.f.take() {
                Some(f) => Step::Done(outcome.map(f)),
                None => protocol_violation("program completed twice"),
            },
        }
    }
}

impl<P, F, U> Program for Map<P, F>
where
    P: Program,
    U: Send,
    F: FnOnce(P::Output) -> U + Send,
{
    type Output = U;

    fn start(&mut self) -> Step<U> {
        let step = self.program.start();
        self.finish(step)
    }

    fn resume(&mut self, result: EffectResult) -> Step<U> {
        let step = self.program.resume(result);
        self.finish(step)
    }
}

enum Stage<P, F, Q> {
    First { program: P, next: F },
    Second(Q),
    Finished,
}

/// See [`ProgramExt::and_then`]
pub struct AndThen<P, F, Q> {
    stage: Stage<P, F, Q>,
}

impl<P, F, Q> AndThen<P, F, Q>
where
    P: Program,
    Q: Program,
    F: FnOnce(P::Output) -> Q + Send,
{
    // Hand control to the continuation once the first program is done
    fn after_first(&mut self, step: Step<P::Output>) -> Step<Q::Output> {
        match step {
            Step::Suspended(effect) => Step::Suspended(effect),
            Step::Done(Err(error)) => {
                self.stage = Stage::Finished;
                Step::Done(Err(error))
            }
            Step::Done(Ok(value)) => match mem::replace(&mut self.stage, Stage::Finished) {
                Stage::First { next, .. } => {
                    let mut continuation = next(value);
                    let step = continuation.start();
                    self.stage = Stage::Second(continuation);
                    step
                }
                _ => protocol_violation("delegated program completed twice"),
            },
        }
    }

    fn after_second(&mut self, step: Step<Q::Output>) -> Step<Q::Output> {
        if step.is_done() {
            self.stage = Stage::Finished;
        }
        step
    }
}

impl<P, F, Q> Program for AndThen<P, F, Q>
where
    P: Program,
    Q: Program,
    F: FnOnce(P::Output) -> Q + Send,
{
    type Output = Q::Output;

    fn start(&mut self) -> Step<Q::Output> {
        match &mut self.stage {
            Stage::First { program, .. } => {
                let step = program.start();
                self.after_first(step)
            }
            _ => protocol_violation("start called on a program that was already started"),
        }
    }

    fn resume(&mut self, result: EffectResult) -> Step<Q::Output> {
        match &mut self.stage {
            Stage::First { program, .. } => {
                let step = program.resume(result);
                self.after_first(step)
            }
            Stage::Second(continuation) => {
                let step = continuation.resume(result);
                self.after_second(step)
            }
            Stage::Finished => {
                protocol_violation("resume called on a program that has already completed")
            }
        }
    }
}

//-----------------------------------------------------------------------------
// Sequencing
//-----------------------------------------------------------------------------

/// Runs programs one after another and collects their values in order
pub struct Sequence<P: Program> {
    remaining: std::vec::IntoIter<P>,
    current: Option<P>,
    values: Vec<P::Output>,
    started: bool,
}

/// Run every program in turn; the first failure finishes the sequence
pub fn sequence<P, I>(programs: I) -> Sequence<P>
where
    P: Program,
    I: IntoIterator<Item = P>,
{
    let programs: Vec<P> = programs.into_iter().collect();
    let values = Vec::with_capacity(programs.len());
    Sequence {
        remaining: programs.into_iter(),
        current: None,
        values,
        started: false,
    }
}

impl<P: Program> Sequence<P> {
    fn advance(&mut self, mut step: Step<P::Output>) -> Step<Vec<P::Output>> {
        loop {
            match step {
                Step::Suspended(effect) => return Step::Suspended(effect),
                Step::Done(Err(error)) => {
                    self.current = None;
                    return Step::Done(Err(error));
                }
                Step::Done(Ok(value)) => {
                    self.values.push(value);
                    self.current = None;
                }
            }

            let Some(mut next) = self.remaining.next() else {
                return Step::Done(Ok(mem::take(&mut self.values)));
            };
            step = next.start();
            self.current = Some(next);
        }
    }
}

impl<P: Program> Program for Sequence<P> {
    type Output = Vec<P::Output>;

    fn start(&mut self) -> Step<Self::Output> {
        if mem::replace(&mut self.started, true) {
            protocol_violation("start called on a program that was already started");
        }
        let Some(mut first) = self.remaining.next() else {
            return Step::Done(Ok(mem::take(&mut self.values)));
        };
        let step = first.start();
        self.current = Some(first);
        self.advance(step)
    }

    fn resume(&mut self, result: EffectResult) -> Step<Self::Output> {
        let Some(current) = self.current.as_mut() else {
            protocol_violation("resume called on a sequence that is not suspended");
        };
        let step = current.resume(result);
        self.advance(step)
    }
}
