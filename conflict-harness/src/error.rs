//! Error types for the harness

use thiserror::Error;
use transfer_engine::StoreError;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failures of the harness itself, as opposed to classified store outcomes
///
/// Errors a scenario *expects* never surface here; they are folded into the
/// scenario's [`SessionResult`](crate::outcome::SessionResult)s. This type
/// covers the plumbing around the scenarios: seeding, opening sessions,
/// invariant reads, and task management.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Store error outside any scenario's expected set
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A scenario task panicked or was aborted
    #[error("Scenario task failed: {0}")]
    TaskJoin(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<tokio::task::JoinError> for HarnessError {
    fn from(err: tokio::task::JoinError) -> Self {
        HarnessError::TaskJoin(err.to_string())
    }
}
