//! Scenario catalog
//!
//! Names the canonical scenarios, the accounts and amounts they use, and
//! the error kinds each one declares as expected. The behavioral contract
//! lives in [`runner`](crate::runner); this module is the shared vocabulary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use transfer_engine::types::{Account, AccountId, BalanceSnapshot};
use transfer_engine::ErrorKind;

/// First seeded account
pub const ACCOUNT_A: AccountId = AccountId::new(1);
/// Second seeded account
pub const ACCOUNT_B: AccountId = AccountId::new(2);
/// Third seeded account
pub const ACCOUNT_C: AccountId = AccountId::new(3);

/// Standard transfer amount used by the conflict scenarios
pub fn standard_amount() -> Decimal {
    Decimal::from(200)
}

/// Amount guaranteed to overdraw account A
pub fn overdraft_amount() -> Decimal {
    Decimal::from(5000)
}

/// Balances every scenario is seeded with
pub fn starting_balances() -> BalanceSnapshot {
    BalanceSnapshot::new(vec![
        Account { id: ACCOUNT_A, balance: Decimal::from(1000) },
        Account { id: ACCOUNT_B, balance: Decimal::from(1500) },
        Account { id: ACCOUNT_C, balance: Decimal::from(2000) },
    ])
}

/// Identifier of one canonical scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioId {
    /// A: malformed operation between debit and credit, one transaction
    MalformedStatement,
    /// B: transfer exceeding the sender's balance
    Overdraft,
    /// C: concurrent symmetric transfers under serializable isolation
    SerializableConflict,
    /// D: induced fault recovered via rollback to a savepoint
    SavepointRollback,
    /// E: concurrent symmetric transfers under default isolation
    DefaultIsolationConflict,
    /// F: audited transfer, balances and audit record verified together
    AuditedTransfer,
}

impl ScenarioId {
    /// Stable name for logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioId::MalformedStatement => "malformed_statement",
            ScenarioId::Overdraft => "overdraft",
            ScenarioId::SerializableConflict => "serializable_conflict",
            ScenarioId::SavepointRollback => "savepoint_rollback",
            ScenarioId::DefaultIsolationConflict => "default_isolation_conflict",
            ScenarioId::AuditedTransfer => "audited_transfer",
        }
    }

    /// Error kinds this scenario treats as an expected classified outcome
    pub fn expected_kinds(&self) -> &'static [ErrorKind] {
        match self {
            ScenarioId::MalformedStatement => &[ErrorKind::Syntax],
            ScenarioId::Overdraft => &[ErrorKind::Constraint],
            ScenarioId::SerializableConflict => &[ErrorKind::Serialization],
            ScenarioId::SavepointRollback => &[ErrorKind::Syntax],
            ScenarioId::DefaultIsolationConflict => &[ErrorKind::Deadlock],
            ScenarioId::AuditedTransfer => &[],
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_balances_shape() {
        let seed = starting_balances();
        assert_eq!(seed.balance_of(ACCOUNT_A), Some(Decimal::from(1000)));
        assert_eq!(seed.balance_of(ACCOUNT_B), Some(Decimal::from(1500)));
        assert_eq!(seed.balance_of(ACCOUNT_C), Some(Decimal::from(2000)));
        assert_eq!(seed.total(), Decimal::from(4500));
    }

    #[test]
    fn test_expected_kinds() {
        assert_eq!(ScenarioId::Overdraft.expected_kinds(), &[ErrorKind::Constraint]);
        assert!(ScenarioId::AuditedTransfer.expected_kinds().is_empty());
    }
}
