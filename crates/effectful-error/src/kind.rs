// Failure kinds
// Every infrastructure failure is reduced to one of these kinds before it leaves an interpreter

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error code structure for categorizing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Failure codes
pub mod codes {
    use crate::ErrorCode;

    // Transport-level failures start with 1000
    pub const CONNECTION_REFUSED: ErrorCode = ErrorCode(1001);
    pub const CONNECTION_LOST: ErrorCode = ErrorCode(1002);
    pub const TIMEOUT: ErrorCode = ErrorCode(1003);
    pub const THROTTLED: ErrorCode = ErrorCode(1004);
    pub const UNAVAILABLE: ErrorCode = ErrorCode(1005);
    pub const MALFORMED_RESPONSE: ErrorCode = ErrorCode(1006);
    pub const PERMISSION_DENIED: ErrorCode = ErrorCode(1007);
    pub const INVALID_REQUEST: ErrorCode = ErrorCode(1008);
    pub const PAYLOAD_TOO_LARGE: ErrorCode = ErrorCode(1009);
    pub const UNSUPPORTED: ErrorCode = ErrorCode(1010);
    pub const UNEXPECTED_RESULT: ErrorCode = ErrorCode(1011);
    pub const INTERNAL: ErrorCode = ErrorCode(1012);
}

/// The class of an infrastructure failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The collaborator refused the connection
    ConnectionRefused,
    /// An established connection dropped mid-operation
    ConnectionLost,
    /// The collaborator did not answer in time
    Timeout,
    /// The collaborator asked the caller to slow down
    Throttled,
    /// The collaborator is temporarily unable to serve requests
    Unavailable,
    /// The collaborator answered with something that could not be decoded
    MalformedResponse,
    /// The credentials in use do not allow the operation
    PermissionDenied,
    /// The request itself is invalid and will never succeed as sent
    InvalidRequest,
    /// The request payload exceeds the configured limit
    PayloadTooLarge,
    /// No interpreter is configured for the effect
    Unsupported,
    /// An interpreter answered with a result of the wrong shape
    UnexpectedResult,
    /// Any other failure inside the collaborator or interpreter
    Internal,
}

impl ErrorKind {
    /// All kinds, in code order
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::ConnectionRefused,
        ErrorKind::ConnectionLost,
        ErrorKind::Timeout,
        ErrorKind::Throttled,
        ErrorKind::Unavailable,
        ErrorKind::MalformedResponse,
        ErrorKind::PermissionDenied,
        ErrorKind::InvalidRequest,
        ErrorKind::PayloadTooLarge,
        ErrorKind::Unsupported,
        ErrorKind::UnexpectedResult,
        ErrorKind::Internal,
    ];

    /// Whether a failure of this kind may succeed when attempted again
    pub fn is_retryable_by_default(self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionLost
                | ErrorKind::Timeout
                | ErrorKind::Throttled
                | ErrorKind::Unavailable
        )
    }

    /// Stable numeric code for this kind
    pub fn code(self) -> ErrorCode {
        use codes::*;
        match self {
            ErrorKind::ConnectionRefused => CONNECTION_REFUSED,
            ErrorKind::ConnectionLost => CONNECTION_LOST,
            ErrorKind::Timeout => TIMEOUT,
            ErrorKind::Throttled => THROTTLED,
            ErrorKind::Unavailable => UNAVAILABLE,
            ErrorKind::MalformedResponse => MALFORMED_RESPONSE,
            ErrorKind::PermissionDenied => PERMISSION_DENIED,
            ErrorKind::InvalidRequest => INVALID_REQUEST,
            ErrorKind::PayloadTooLarge => PAYLOAD_TOO_LARGE,
            ErrorKind::Unsupported => UNSUPPORTED,
            ErrorKind::UnexpectedResult => UNEXPECTED_RESULT,
            ErrorKind::Internal => INTERNAL,
        }
    }

    /// Snake-case name, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionRefused => "connection_refused",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Throttled => "throttled",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::UnexpectedResult => "unexpected_result",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
