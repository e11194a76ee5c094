//! Specialized interpreters
//!
//! One async contract per capability family. An interpreter turns a family
//! effect into a family result against one external collaborator, and
//! converts every collaborator failure into an [`InterpreterError`] before
//! returning. It never panics past its own boundary.
//!
//! Each family also ships a narrow collaborator contract (`RecordStore`,
//! `CacheStore`, ...) reporting failures as [`BackendError`], and an adapter
//! that implements the interpreter contract over it.

use async_trait::async_trait;
use tracing::warn;

use effectful_error::{BackendError, ErrorKind};

use crate::config::InterpreterConfig;
use crate::effect::{
    CacheEffect, CacheResult, Effect, MessagingEffect, MessagingResult, ObjectEffect,
    ObjectResult, StorageEffect, StorageResult, TransportEffect, TransportResult,
};
use crate::outcome::{InterpreterError, Outcome};

pub mod cache;
pub mod messaging;
pub mod object;
pub mod storage;
pub mod transport;

pub use cache::{CacheStore, CacheStoreInterpreter};
pub use messaging::{BrokerInterpreter, MessageBroker};
pub use object::{ObjectStore, ObjectStoreInterpreter};
pub use storage::{RecordStore, RecordStoreInterpreter};
pub use transport::{SessionInterpreter, SessionTransport};

//-----------------------------------------------------------------------------
// Family contracts
//-----------------------------------------------------------------------------

/// Interprets record database effects
#[async_trait]
pub trait StorageInterpreter: Send + Sync {
    async fn handle(&self, effect: StorageEffect) -> Outcome<StorageResult>;
}

/// Interprets blob/object storage effects
#[async_trait]
pub trait ObjectInterpreter: Send + Sync {
    async fn handle(&self, effect: ObjectEffect) -> Outcome<ObjectResult>;
}

/// Interprets key/value cache effects
#[async_trait]
pub trait CacheInterpreter: Send + Sync {
    async fn handle(&self, effect: CacheEffect) -> Outcome<CacheResult>;
}

/// Interprets message broker effects
#[async_trait]
pub trait MessagingInterpreter: Send + Sync {
    async fn handle(&self, effect: MessagingEffect) -> Outcome<MessagingResult>;
}

/// Interprets session transport effects
#[async_trait]
pub trait TransportInterpreter: Send + Sync {
    async fn handle(&self, effect: TransportEffect) -> Outcome<TransportResult>;
}

//-----------------------------------------------------------------------------
// Unconfigured families
//-----------------------------------------------------------------------------

/// Stand-in for a family with no collaborator; every effect fails with a
/// non-retryable `Unsupported` error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl StorageInterpreter for Unconfigured {
    async fn handle(&self, effect: StorageEffect) -> Outcome<StorageResult> {
        Err(InterpreterError::unsupported(effect.into()))
    }
}

#[async_trait]
impl ObjectInterpreter for Unconfigured {
    async fn handle(&self, effect: ObjectEffect) -> Outcome<ObjectResult> {
        Err(InterpreterError::unsupported(effect.into()))
    }
}

#[async_trait]
impl CacheInterpreter for Unconfigured {
    async fn handle(&self, effect: CacheEffect) -> Outcome<CacheResult> {
        Err(InterpreterError::unsupported(effect.into()))
    }
}

#[async_trait]
impl MessagingInterpreter for Unconfigured {
    async fn handle(&self, effect: MessagingEffect) -> Outcome<MessagingResult> {
        Err(InterpreterError::unsupported(effect.into()))
    }
}

#[async_trait]
impl TransportInterpreter for Unconfigured {
    async fn handle(&self, effect: TransportEffect) -> Outcome<TransportResult> {
        Err(InterpreterError::unsupported(effect.into()))
    }
}

//-----------------------------------------------------------------------------
// Adapter plumbing
//-----------------------------------------------------------------------------

/// Why an adapter produced no result
#[derive(Debug)]
pub(crate) enum Rejection {
    /// The collaborator failed
    Backend(BackendError),
    /// The request never reached the collaborator
    Refused { kind: ErrorKind, message: String },
}

impl Rejection {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Rejection::Refused {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    /// Attach the failed effect and apply the configured retry policy
    pub(crate) fn into_error(self, effect: Effect, config: &InterpreterConfig) -> InterpreterError {
        let error = match self {
            Rejection::Backend(error) => {
                warn!(effect = %effect, %error, "collaborator failed");
                InterpreterError::from_backend(effect, &error)
            }
            Rejection::Refused { kind, message } => {
                warn!(effect = %effect, %kind, %message, "request refused");
                InterpreterError::new(effect, kind, message)
            }
        };
        let retryable = config.is_retryable(error.kind);
        error.with_retryable(retryable)
    }
}

impl From<BackendError> for Rejection {
    fn from(error: BackendError) -> Self {
        Rejection::Backend(error)
    }
}

/// Refuse payloads over the configured limit
pub(crate) fn check_payload(
    config: &InterpreterConfig,
    what: &str,
    len: usize,
) -> Result<(), Rejection> {
    if len > config.max_payload_bytes {
        return Err(Rejection::Refused {
            kind: ErrorKind::PayloadTooLarge,
            message: format!(
                "{what} is {len} bytes, limit is {} bytes",
                config.max_payload_bytes
            ),
        });
    }
    Ok(())
}

/// Refuse empty identifiers
pub(crate) fn require(field: &str, value: &str) -> Result<(), Rejection> {
    if value.is_empty() {
        return Err(Rejection::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryOverrides;
    use crate::effect::{CacheGet, GetRecord};

    #[tokio::test]
    async fn test_unconfigured_reports_unsupported() {
        let err = StorageInterpreter::handle(&Unconfigured, GetRecord::new("t", "k").into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
        assert!(!err.retryable);
        assert_eq!(err.message, "no storage interpreter configured");

        let err = CacheInterpreter::handle(&Unconfigured, CacheGet::new("k").into())
            .await
            .unwrap_err();
        assert_eq!(err.effect, Effect::from(CacheGet::new("k")));
    }

    #[test]
    fn test_rejection_applies_retry_overrides() {
        let config = InterpreterConfig::default().with_retry(RetryOverrides {
            always: vec![ErrorKind::Internal],
            never: vec![ErrorKind::Timeout],
        });
        let effect: Effect = GetRecord::new("t", "k").into();

        let err =
            Rejection::from(BackendError::internal("bug")).into_error(effect.clone(), &config);
        assert!(err.retryable);

        let err = Rejection::from(BackendError::Timeout(std::time::Duration::from_secs(1)))
            .into_error(effect, &config);
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(!err.retryable);
    }

    #[test]
    fn test_payload_limit_is_inclusive() {
        let config = InterpreterConfig::default().with_max_payload_bytes(4);
        assert!(check_payload(&config, "body", 4).is_ok());
        match check_payload(&config, "body", 5) {
            Err(Rejection::Refused { kind, message }) => {
                assert_eq!(kind, ErrorKind::PayloadTooLarge);
                assert_eq!(message, "body is 5 bytes, limit is 4 bytes");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
