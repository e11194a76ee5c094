// Outcome and interpreter error
//
// Every fallible operation in the core returns `Outcome<T>`. Domain-level
// negative results (not found, cache miss) are values inside `Ok`; only
// infrastructure failures travel as `InterpreterError`.

use std::fmt;

use thiserror::Error;

use effectful_error::{BackendError, Classified, ErrorKind, Retryable};

use crate::effect::{Effect, EffectFamily, EffectResult};

/// Success-with-value or failure-with-error
pub type Outcome<T> = std::result::Result<T, InterpreterError>;

/// Infrastructure failure raised while interpreting one effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InterpreterError {
    /// The effect description that failed
    pub effect: Effect,
    /// Failure class
    pub kind: ErrorKind,
    /// Whether an outer caller may reasonably attempt the effect again
    pub retryable: bool,
    /// Human-readable detail
    pub message: String,
}

impl InterpreterError {
    /// Create an error classified by its kind's default retry policy
    pub fn new(effect: Effect, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            effect,
            kind,
            retryable: kind.is_retryable_by_default(),
            message: message.into(),
        }
    }

    /// Convert a collaborator failure, keeping its kind and default classification
    pub fn from_backend(effect: Effect, error: &BackendError) -> Self {
        Self::new(effect, error.kind(), error.to_string())
    }

    /// An interpreter answered `effect` with a result of the wrong shape
    pub fn unexpected_result(effect: Effect, found: &EffectResult) -> Self {
        let message = format!(
            "expected a {} result for {}, got {:?}",
            effect.family(),
            effect,
            found
        );
        Self::new(effect, ErrorKind::UnexpectedResult, message)
    }

    /// No interpreter is configured for the effect's family
    pub fn unsupported(effect: Effect) -> Self {
        let message = format!("no {} interpreter configured", effect.family());
        Self::new(effect, ErrorKind::Unsupported, message)
    }

    /// The request was rejected before reaching the collaborator
    pub fn invalid_request(effect: Effect, message: impl Into<String>) -> Self {
        Self::new(effect, ErrorKind::InvalidRequest, message)
    }

    /// Override the retry classification
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Family of the failed effect
    pub fn family(&self) -> EffectFamily {
        self.effect.family()
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({}", self.effect, self.kind)?;
        if self.retryable {
            write!(f, ", retryable")?;
        }
        write!(f, "): {}", self.message)
    }
}

impl Classified for InterpreterError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Retryable for InterpreterError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}
