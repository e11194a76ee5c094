// Fault injection
//
// Every memory collaborator consults its `Faults` before doing any work, so
// tests can make a single operation fail once or keep failing.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::debug;

use effectful_error::{BackendError, BackendResult};

/// Matches every operation of a collaborator
pub const ANY: &str = "*";

#[derive(Debug, Default)]
struct Plan {
    next: VecDeque<BackendError>,
    always: Option<BackendError>,
}

/// Scheduled failures, keyed by operation name
#[derive(Debug, Default)]
pub struct Faults {
    plans: Mutex<HashMap<String, Plan>>,
}

impl Faults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call to `operation` with `error`.
    ///
    /// Queued one-shot failures fire in the order they were added, before
    /// any standing failure.
    pub fn fail_next(&self, operation: &str, error: BackendError) {
        self.plans
            .lock()
            .entry(operation.to_string())
            .or_default()
            .next
            .push_back(error);
    }

    /// Fail every call to `operation` with `error` until cleared
    pub fn fail_always(&self, operation: &str, error: BackendError) {
        self.plans
            .lock()
            .entry(operation.to_string())
            .or_default()
            .always = Some(error);
    }

    /// Drop every scheduled failure
    pub fn clear(&self) {
        self.plans.lock().clear();
    }

    /// Consume the failure scheduled for `operation`, if any.
    ///
    /// Plans for the operation itself take precedence over plans for [`ANY`].
    pub fn check(&self, operation: &str) -> BackendResult<()> {
        let mut plans = self.plans.lock();
        for name in [operation, ANY] {
            if let Some(plan) = plans.get_mut(name) {
                if let Some(error) = plan.next.pop_front().or_else(|| plan.always.clone()) {
                    debug!(operation, %error, "injecting fault");
                    return Err(error);
                }
            }
        }
        Ok(())
    }
}
