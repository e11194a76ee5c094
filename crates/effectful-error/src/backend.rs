// Backend failure channel
// The error type every external collaborator reports through

use std::time::Duration;

use thiserror::Error;

use crate::{Classified, ErrorKind, Retryable};

/// Failure reported by an external collaborator: a database, cache, broker,
/// object store or session layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("throttled: {0}")]
    Throttled(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal backend error: {0}")]
    Internal(String),
}

/// Result type for collaborator calls
pub type BackendResult<T> = Result<T, BackendError>;

// Helper methods for creating backend errors
impl BackendError {
    /// Create a connection refused error
    pub fn refused(target: impl Into<String>) -> Self {
        BackendError::ConnectionRefused(target.into())
    }

    /// Create a connection lost error
    pub fn lost(reason: impl Into<String>) -> Self {
        BackendError::ConnectionLost(reason.into())
    }

    /// Create a throttling error
    pub fn throttled(reason: impl Into<String>) -> Self {
        BackendError::Throttled(reason.into())
    }

    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BackendError::Unavailable(reason.into())
    }

    /// Create a malformed response error
    pub fn malformed(reason: impl Into<String>) -> Self {
        BackendError::Malformed(reason.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        BackendError::PermissionDenied(reason.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        BackendError::InvalidRequest(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        BackendError::Internal(reason.into())
    }
}

impl Classified for BackendError {
    fn kind(&self) -> ErrorKind {
        match self {
            BackendError::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            BackendError::ConnectionLost(_) => ErrorKind::ConnectionLost,
            BackendError::Timeout(_) => ErrorKind::Timeout,
            BackendError::Throttled(_) => ErrorKind::Throttled,
            BackendError::Unavailable(_) => ErrorKind::Unavailable,
            BackendError::Malformed(_) => ErrorKind::MalformedResponse,
            BackendError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            BackendError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BackendError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl Retryable for BackendError {
    fn is_retryable(&self) -> bool {
        self.kind().is_retryable_by_default()
    }
}
