// Program driver
//
// Alternates between interpreting a program's pending effect and resuming
// the program with the result, until the program finishes or an interpreter
// fails. Exactly one effect is in flight at a time, and the first failure
// ends the run.

use std::any::type_name;

use tracing::{debug, debug_span, warn, Instrument};

use crate::dispatch::Dispatch;
use crate::program::{Execution, Program, Step};
use crate::outcome::Outcome;

/// Run `program` to completion against `dispatcher`
pub async fn run<P, D>(program: P, dispatcher: &D) -> Outcome<P::Output>
where
    P: Program,
    D: Dispatch + ?Sized,
{
    Driver::new(dispatcher).run(program).await
}

/// Drives programs against one dispatcher
#[derive(Debug)]
pub struct Driver<'a, D: ?Sized> {
    dispatcher: &'a D,
}

impl<D: ?Sized> Clone for Driver<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for Driver<'_, D> {}

impl<'a, D: Dispatch + ?Sized> Driver<'a, D> {
    pub fn new(dispatcher: &'a D) -> Self {
        Self { dispatcher }
    }

    /// Run `program` until it finishes or an effect fails.
    ///
    /// Returns the program's own outcome, or the first interpreter failure
    /// unchanged. No effect after a failed one is ever dispatched.
    ///
    /// # Panics
    ///
    /// If the program violates the suspend/resume protocol.
    pub async fn run<P: Program>(&self, program: P) -> Outcome<P::Output> {
        let span = debug_span!("effect_program", program = type_name::<P>());
        self.drive(program).instrument(span).await
    }

    async fn drive<P: Program>(&self, program: P) -> Outcome<P::Output> {
        let mut execution = Execution::new(program);
        let mut step = execution.start();

        loop {
            let effect = match step {
                Step::Done(outcome) => {
                    debug!(
                        effects = execution.suspensions(),
                        ok = outcome.is_ok(),
                        "program finished"
                    );
                    return outcome;
                }
                Step::Suspended(effect) => effect,
            };

            debug!(effect = %effect, "dispatching effect");
            match self.dispatcher.interpret(effect).await {
                Ok(result) => step = execution.resume(result),
                Err(error) => {
                    warn!(
                        effect = %error.effect,
                        kind = %error.kind,
                        retryable = error.retryable,
                        "effect failed, stopping program"
                    );
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectResult, GetRecord, Lookup, StorageResult};
    use crate::program::{perform, pure, ProgramExt};
    use crate::testing::ScriptedDispatcher;

    #[tokio::test]
    async fn test_program_without_effects_never_dispatches() {
        let dispatcher = ScriptedDispatcher::new();
        assert_eq!(run(pure(7), &dispatcher).await, Ok(7));
        assert!(dispatcher.presented().is_empty());
    }

    #[tokio::test]
    async fn test_driver_is_reusable() {
        let dispatcher = ScriptedDispatcher::new()
            .then_ok(EffectResult::Storage(StorageResult::Lookup(Lookup::NotFound)))
            .then_ok(EffectResult::Storage(StorageResult::Lookup(Lookup::NotFound)));
        let driver = Driver::new(&dispatcher);

        for key in ["a", "b"] {
            let program =
                perform(GetRecord::new("users", key)).map(|lookup| lookup == Lookup::NotFound);
            assert_eq!(driver.run(program).await, Ok(true));
        }
        assert_eq!(dispatcher.presented().len(), 2);
    }
}
