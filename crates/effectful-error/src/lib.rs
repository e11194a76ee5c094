// Effectful Error Taxonomy
// Central location for failure kinds, retry classification and the backend failure channel

// Re-export common error handling tools for convenience
pub use thiserror;

// Module structure
mod backend;
mod kind;
mod traits;

// Public exports
pub use backend::{BackendError, BackendResult};
pub use kind::{codes, ErrorCode, ErrorKind};
pub use traits::{Classified, Retryable};
