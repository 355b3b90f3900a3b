//! Conflict scenario harness
//!
//! Drives named, reproducible concurrency and fault scenarios against the
//! transfer engine and classifies what the store did: induced malformed
//! operations, overdrafts, savepoint recovery, and concurrent conflicting
//! transfers under both default and serializable isolation. Every scenario
//! starts from a seeded snapshot and ends with a fresh invariant check.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod outcome;
pub mod runner;
pub mod scenario;

// Re-exports
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use outcome::{ScenarioOutcome, SessionResult};
pub use runner::ScenarioRunner;
pub use scenario::ScenarioId;
