use thiserror::Error;

use crate::domain::{GuardViolation, SkipReason};
use crate::ports::StoreError;

/// Errors surfaced by `Session` actions. Neither is fatal.
#[derive(Debug, Error)]
pub enum RotinaError {
    #[error(transparent)]
    Guard(#[from] GuardViolation),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Result of an action that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Skipped(SkipReason),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
