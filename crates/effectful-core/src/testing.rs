//! Test doubles for driving programs without real collaborators
//!
//! - [`ScriptedDispatcher`] answers effects from a fixed script, in order.
//! - [`RecordingDispatcher`] wraps any dispatcher and keeps a trace.
//! - [`FnDispatcher`] answers effects with a closure.

use std::collections::VecDeque;
use std::sync::Once;

use async_trait::async_trait;
use parking_lot::Mutex;

use effectful_error::ErrorKind;

use crate::dispatch::Dispatch;
use crate::effect::{Effect, EffectResult};
use crate::outcome::{InterpreterError, Outcome};

static INIT: Once = Once::new();

/// Install a test subscriber once per process.
///
/// Honours `RUST_LOG`, defaulting to `debug`. Output goes through the test
/// harness so it is only shown for failing tests.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

//-----------------------------------------------------------------------------
// Scripted
//-----------------------------------------------------------------------------

/// One scripted answer
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(EffectResult),
    /// Fail whatever effect is presented, with the kind's default classification
    Fail { kind: ErrorKind, message: String },
    /// Fail with an explicit retry classification
    FailWith {
        kind: ErrorKind,
        retryable: bool,
        message: String,
    },
}

/// Answers effects from a script and records every effect presented to it.
///
/// Running out of script is reported as an `Internal` failure naming the
/// effect, so an over-long program shows up as a failed run.
#[derive(Debug, Default)]
pub struct ScriptedDispatcher {
    script: Mutex<VecDeque<Reply>>,
    presented: Mutex<Vec<Effect>>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            presented: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: Reply) -> Self {
        self.script.lock().push_back(reply);
        self
    }

    pub fn then_ok(self, result: impl Into<EffectResult>) -> Self {
        self.then(Reply::Ok(result.into()))
    }

    pub fn then_fail(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.then(Reply::Fail {
            kind,
            message: message.into(),
        })
    }

    pub fn then_fail_with(
        self,
        kind: ErrorKind,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        self.then(Reply::FailWith {
            kind,
            retryable,
            message: message.into(),
        })
    }

    /// Effects presented so far, in order
    pub fn presented(&self) -> Vec<Effect> {
        self.presented.lock().clone()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Dispatch for ScriptedDispatcher {
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult> {
        self.presented.lock().push(effect.clone());
        let reply = self.script.lock().pop_front();
        match reply {
            Some(Reply::Ok(result)) => Ok(result),
            Some(Reply::Fail { kind, message }) => {
                Err(InterpreterError::new(effect, kind, message))
            }
            Some(Reply::FailWith {
                kind,
                retryable,
                message,
            }) => Err(InterpreterError::new(effect, kind, message).with_retryable(retryable)),
            None => Err(InterpreterError::new(
                effect,
                ErrorKind::Internal,
                "dispatcher script exhausted",
            )),
        }
    }
}

//-----------------------------------------------------------------------------
// Recording
//-----------------------------------------------------------------------------

/// Wraps a dispatcher and records each effect with the outcome it produced
#[derive(Debug)]
pub struct RecordingDispatcher<D> {
    inner: D,
    trace: Mutex<Vec<(Effect, Outcome<EffectResult>)>>,
}

impl<D: Dispatch> RecordingDispatcher<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            trace: Mutex::new(Vec::new()),
        }
    }

    /// Effects dispatched so far, in order
    pub fn effects(&self) -> Vec<Effect> {
        self.trace.lock().iter().map(|(effect, _)| effect.clone()).collect()
    }

    /// Effects paired with their outcomes
    pub fn trace(&self) -> Vec<(Effect, Outcome<EffectResult>)> {
        self.trace.lock().clone()
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for RecordingDispatcher<D> {
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult> {
        let outcome = self.inner.interpret(effect.clone()).await;
        self.trace.lock().push((effect, outcome.clone()));
        outcome
    }
}

//-----------------------------------------------------------------------------
// Closure-backed
//-----------------------------------------------------------------------------

/// Answers every effect with a closure
pub struct FnDispatcher<F> {
    handler: F,
}

impl<F> FnDispatcher<F>
where
    F: Fn(&Effect) -> Result<EffectResult, (ErrorKind, String)> + Send + Sync,
{
    /// `handler` returns a result, or the kind and message of a failure
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Dispatch for FnDispatcher<F>
where
    F: Fn(&Effect) -> Result<EffectResult, (ErrorKind, String)> + Send + Sync,
{
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult> {
        (self.handler)(&effect)
            .map_err(|(kind, message)| InterpreterError::new(effect, kind, message))
    }
}
