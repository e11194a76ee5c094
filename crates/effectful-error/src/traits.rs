// Error handling traits
// Core traits for the failure taxonomy

use crate::{ErrorCode, ErrorKind};

/// Trait for errors that reduce to an [`ErrorKind`]
pub trait Classified {
    /// The kind of failure
    fn kind(&self) -> ErrorKind;

    /// Stable numeric code of the failure kind
    fn code(&self) -> ErrorCode {
        self.kind().code()
    }
}

/// Trait for error types that know whether a retry may succeed
pub trait Retryable {
    /// Check if the error is retryable
    fn is_retryable(&self) -> bool;
}
