//! Transactional transfer engine
//!
//! Applies debit/credit transfers atomically against an external
//! transactional store and verifies the ledger's global balance invariant.
//!
//! # Architecture
//!
//! - **Store capability**: all mutation goes through the [`store::Session`]
//!   trait; the engine never constructs textual commands
//! - **Atomicity**: one transfer is one transaction; partial effects are
//!   never observable outside it
//! - **Isolation on request**: each transfer names the isolation level it
//!   runs under; conflict detection belongs to the store
//! - **Fresh reads**: the invariant checker re-reads balances on every call,
//!   never a cached copy

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod executor;
pub mod invariant;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

// Re-exports
pub use error::{ErrorKind, Result, StoreError};
pub use executor::execute_transfer;
pub use store::{Operation, Provision, RetryPolicy, Session, TransferStore};
pub use types::{Account, AccountId, BalanceSnapshot, IsolationLevel, TransferRecord, TransferRequest};
