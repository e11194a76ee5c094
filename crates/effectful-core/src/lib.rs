// Effectful Core
//
// Effect descriptions, resumable effect programs, and the driver/dispatcher
// pair that interprets them against pluggable per-family interpreters.

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod effect;
pub mod interpreter;
pub mod logging;
pub mod outcome;
pub mod program;
pub mod testing;

pub use config::{ConfigError, InterpreterConfig, RetryOverrides, MAX_CACHE_TTL};
pub use dispatch::{Dispatch, Dispatcher, DispatcherBuilder};
pub use driver::{run, Driver};
pub use effect::{Effect, EffectFamily, EffectResult, Request};
pub use outcome::{InterpreterError, Outcome};
pub use program::{BoxProgram, Program, ProgramExt, Step};

// Re-export the error taxonomy so callers need a single dependency
pub use effectful_error::{BackendError, BackendResult, Classified, ErrorCode, ErrorKind, Retryable};
