//! Transactional store capability
//!
//! The engine speaks to its backing store exclusively through these traits.
//! Operations carry structured parameters (account id, signed delta): the
//! engine never assembles textual commands, and savepoint names are
//! validated identifiers.

use crate::error::{Result, StoreError};
use crate::types::{AccountId, BalanceSnapshot, IsolationLevel, TransferRecord};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

/// One structured operation inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Add `delta` to an account's balance (negative delta debits it).
    /// The store's non-negativity constraint applies to the result.
    AdjustBalance {
        /// Account to adjust
        account: AccountId,
        /// Signed amount to add
        delta: Decimal,
    },

    /// Append an audit record to the transfer log
    InsertTransfer(TransferRecord),

    /// Deliberately malformed operation; always fails with a syntax error
    /// and aborts the enclosing transaction. Used for fault injection.
    Invalid,
}

/// One transactional session
///
/// A session owns its connection and must never be shared between two
/// concurrently-executing transactions. Operations within a session are
/// strictly sequential.
#[async_trait]
pub trait Session: Send {
    /// Begin a transaction at the given isolation level
    async fn begin(&mut self, isolation: IsolationLevel) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction entirely
    async fn rollback(&mut self) -> Result<()>;

    /// Establish a named savepoint inside the current transaction
    async fn savepoint(&mut self, name: &str) -> Result<()>;

    /// Roll back to a named savepoint, undoing exactly the operations
    /// issued after it and clearing any in-transaction error state
    async fn rollback_to(&mut self, name: &str) -> Result<()>;

    /// Execute one structured operation
    async fn execute(&mut self, op: Operation) -> Result<()>;

    /// Read all account balances, ordered by account id. Always a fresh
    /// round trip to the store.
    async fn read_accounts(&mut self) -> Result<BalanceSnapshot>;

    /// Read the transfer log in insertion order
    async fn read_transfers(&mut self) -> Result<Vec<TransferRecord>>;
}

/// A store that hands out independent transactional sessions
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Session type this store produces
    type Session: Session + 'static;

    /// Open a new independent session
    async fn open_session(&self) -> Result<Self::Session>;
}

/// Seeding hook for the provisioning collaborator
///
/// Resets account balances to a known snapshot and clears the transfer log
/// so every scenario starts from the same state. Schema creation stays with
/// the external provisioner.
#[async_trait]
pub trait Provision {
    /// Overwrite balances with `seed` and truncate the transfer log
    async fn seed(&self, seed: &BalanceSnapshot) -> Result<()>;
}

/// Bounded fixed-delay retry contract for store bootstrap
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts before giving up
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(5),
        }
    }
}

/// Validate a savepoint name as a plain identifier
///
/// Savepoint names cannot be bound as statement parameters, so they are
/// restricted to `[A-Za-z_][A-Za-z0-9_]*` before ever reaching a store.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::Syntax(format!(
            "invalid savepoint name: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savepoint_name_validation() {
        assert!(validate_savepoint_name("sp_1").is_ok());
        assert!(validate_savepoint_name("_anchor").is_ok());
        assert!(validate_savepoint_name("").is_err());
        assert!(validate_savepoint_name("1sp").is_err());
        assert!(validate_savepoint_name("sp; DROP TABLE accounts").is_err());
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }
}
