//! Core types for the transfer engine
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money)
//! - Value semantics (requests and snapshots are immutable once built)
//! - Serde serialization for structured reporting

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(i64);

impl AccountId {
    /// Create new account ID
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get as i64
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account row as the store holds it
///
/// The store enforces `balance >= 0` as a hard constraint; a write that
/// would break it aborts its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    pub id: AccountId,

    /// Current balance (exact decimal)
    pub balance: Decimal,
}

/// Isolation level requested for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum IsolationLevel {
    /// The store's default isolation; permits write-skew-style anomalies
    /// under concurrent conflicting transfers
    Default,
    /// Strictest guarantee; conflicting concurrent transactions fail with
    /// a serialization error rather than commit a non-serial result
    Serializable,
}

/// One money movement, passed by value into the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Account to debit
    pub sender: AccountId,

    /// Account to credit
    pub receiver: AccountId,

    /// Amount moved (must be positive)
    pub amount: Decimal,

    /// Isolation level for the enclosing transaction
    pub isolation: IsolationLevel,

    /// Whether to append a [`TransferRecord`] in the same transaction
    pub record_audit: bool,
}

impl TransferRequest {
    /// Plain transfer under default isolation, no audit record
    pub fn new(sender: AccountId, receiver: AccountId, amount: Decimal) -> Self {
        Self {
            sender,
            receiver,
            amount,
            isolation: IsolationLevel::Default,
            record_audit: false,
        }
    }

    /// Set the isolation level
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Append an audit record inside the same transaction
    pub fn with_audit(mut self) -> Self {
        self.record_audit = true;
        self
    }
}

/// Append-only audit entry for a committed transfer
///
/// Written inside the same transaction as the balance mutation; it must
/// never exist without the corresponding balance change, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Debited account
    pub from_account: AccountId,

    /// Credited account
    pub to_account: AccountId,

    /// Amount moved
    pub amount: Decimal,
}

/// Ordered sequence of balances keyed by account id
///
/// Two snapshots are equal iff all corresponding balances match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    balances: Vec<Account>,
}

impl BalanceSnapshot {
    /// Build a snapshot from (id, balance) pairs; sorts by account id
    pub fn new(mut balances: Vec<Account>) -> Self {
        balances.sort_by_key(|a| a.id);
        Self { balances }
    }

    /// Accounts in id order
    pub fn accounts(&self) -> &[Account] {
        &self.balances
    }

    /// Balance of one account, if present
    pub fn balance_of(&self, id: AccountId) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.balance)
    }

    /// Sum of all balances (conservation checks)
    pub fn total(&self) -> Decimal {
        self.balances.iter().map(|a| a.balance).sum()
    }

    /// Snapshot with one transfer applied, for building expected states
    pub fn with_transfer(&self, from: AccountId, to: AccountId, amount: Decimal) -> Self {
        let balances = self
            .balances
            .iter()
            .map(|a| {
                let balance = if a.id == from {
                    a.balance - amount
                } else if a.id == to {
                    a.balance + amount
                } else {
                    a.balance
                };
                Account { id: a.id, balance }
            })
            .collect();
        Self { balances }
    }
}

impl fmt::Display for BalanceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, a) in self.balances.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", a.id, a.balance)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(id: i64, balance: i64) -> Account {
        Account {
            id: AccountId::new(id),
            balance: Decimal::from(balance),
        }
    }

    #[test]
    fn test_snapshot_orders_by_account_id() {
        let snap = BalanceSnapshot::new(vec![acct(3, 2000), acct(1, 1000), acct(2, 1500)]);
        let ids: Vec<i64> = snap.accounts().iter().map(|a| a.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_equality_is_exact() {
        let a = BalanceSnapshot::new(vec![acct(1, 1000), acct(2, 1500)]);
        let b = BalanceSnapshot::new(vec![acct(2, 1500), acct(1, 1000)]);
        assert_eq!(a, b);

        let c = BalanceSnapshot::new(vec![acct(1, 1000), acct(2, 1501)]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_snapshot_total_and_transfer() {
        let snap = BalanceSnapshot::new(vec![acct(1, 1000), acct(2, 1500), acct(3, 2000)]);
        assert_eq!(snap.total(), Decimal::from(4500));

        let moved = snap.with_transfer(AccountId::new(1), AccountId::new(2), Decimal::from(200));
        assert_eq!(moved.balance_of(AccountId::new(1)), Some(Decimal::from(800)));
        assert_eq!(moved.balance_of(AccountId::new(2)), Some(Decimal::from(1700)));
        assert_eq!(moved.total(), snap.total());
    }

    #[test]
    fn test_request_builder() {
        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), Decimal::from(200))
            .with_isolation(IsolationLevel::Serializable)
            .with_audit();
        assert_eq!(req.isolation, IsolationLevel::Serializable);
        assert!(req.record_audit);
    }
}
