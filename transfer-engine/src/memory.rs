//! In-process transactional store
//!
//! A small store implementing the [`Session`] capability entirely in memory,
//! used by the harness's own tests and demos so conflict scenarios can run
//! without a live database. Transactions stage their operations and commit
//! under a single store lock; serializable transactions validate their
//! read/write sets against commits that landed after they began
//! (first committer wins). The store never blocks, so it never deadlocks;
//! under default isolation two symmetric concurrent transfers both commit.

use crate::error::{Result, StoreError};
use crate::store::{validate_savepoint_name, Operation, Provision, Session, TransferStore};
use crate::types::{Account, AccountId, BalanceSnapshot, IsolationLevel, TransferRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::trace;

/// Shared committed state
#[derive(Debug, Default)]
struct Shared {
    accounts: BTreeMap<AccountId, Decimal>,
    transfers: Vec<TransferRecord>,

    /// Monotone commit counter
    commit_seq: u64,

    /// Commit sequence of the last write to each account
    versions: BTreeMap<AccountId, u64>,
}

/// Staged entry in an open transaction, in issue order
#[derive(Debug, Clone)]
enum Staged {
    Adjust(AccountId, Decimal),
    Insert(TransferRecord),
    Savepoint(String),
}

#[derive(Debug)]
struct Tx {
    isolation: IsolationLevel,
    start_seq: u64,
    ops: Vec<Staged>,

    /// Accounts read or written; the serializable validation set
    touched: BTreeSet<AccountId>,

    /// Set after an in-transaction error; cleared by rollback-to-savepoint
    aborted: bool,
}

/// In-memory transfer store
#[derive(Debug, Clone)]
pub struct MemStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemStore {
    /// Create a store seeded with the given balances
    pub fn new(seed: BalanceSnapshot) -> Self {
        let mut shared = Shared::default();
        for account in seed.accounts() {
            shared.accounts.insert(account.id, account.balance);
        }
        Self {
            shared: Arc::new(Mutex::new(shared)),
        }
    }
}

#[async_trait]
impl TransferStore for MemStore {
    type Session = MemSession;

    async fn open_session(&self) -> Result<MemSession> {
        Ok(MemSession {
            shared: self.shared.clone(),
            tx: None,
        })
    }
}

#[async_trait]
impl Provision for MemStore {
    async fn seed(&self, seed: &BalanceSnapshot) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.accounts.clear();
        for account in seed.accounts() {
            shared.accounts.insert(account.id, account.balance);
        }
        shared.transfers.clear();
        shared.versions.clear();
        Ok(())
    }
}

/// One in-memory session; holds at most one open transaction
#[derive(Debug)]
pub struct MemSession {
    shared: Arc<Mutex<Shared>>,
    tx: Option<Tx>,
}

impl MemSession {
    fn tx_mut(&mut self) -> Result<&mut Tx> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Internal("no transaction in progress".to_string()))
    }

    /// Balance as the open transaction sees it: committed state overlaid
    /// with staged adjustments
    fn effective_balance(shared: &Shared, tx: &Tx, account: AccountId) -> Option<Decimal> {
        let mut balance = shared.accounts.get(&account).copied()?;
        for op in &tx.ops {
            if let Staged::Adjust(id, delta) = op {
                if *id == account {
                    balance += *delta;
                }
            }
        }
        Some(balance)
    }

    fn stage(&mut self, op: Operation) -> Result<()> {
        let shared = self.shared.clone();
        let shared = shared.lock();
        let tx = self.tx_mut()?;

        if tx.aborted {
            return Err(StoreError::Internal(
                "current transaction is aborted, commands ignored until rollback".to_string(),
            ));
        }

        match op {
            Operation::AdjustBalance { account, delta } => {
                // Missing accounts behave like an UPDATE matching no rows.
                if let Some(balance) = Self::effective_balance(&shared, tx, account) {
                    if balance + delta < Decimal::ZERO {
                        tx.aborted = true;
                        return Err(StoreError::Constraint(format!(
                            "balance of account {} would become {}",
                            account,
                            balance + delta
                        )));
                    }
                    tx.ops.push(Staged::Adjust(account, delta));
                    tx.touched.insert(account);
                }
                Ok(())
            }
            Operation::InsertTransfer(record) => {
                tx.ops.push(Staged::Insert(record));
                Ok(())
            }
            Operation::Invalid => {
                tx.aborted = true;
                Err(StoreError::Syntax("malformed operation".to_string()))
            }
        }
    }

    /// Apply an operation outside any transaction (autocommit)
    fn autocommit(&mut self, op: Operation) -> Result<()> {
        let mut shared = self.shared.lock();
        match op {
            Operation::AdjustBalance { account, delta } => {
                if let Some(balance) = shared.accounts.get(&account).copied() {
                    if balance + delta < Decimal::ZERO {
                        return Err(StoreError::Constraint(format!(
                            "balance of account {} would become {}",
                            account,
                            balance + delta
                        )));
                    }
                    shared.accounts.insert(account, balance + delta);
                    shared.commit_seq += 1;
                    let seq = shared.commit_seq;
                    shared.versions.insert(account, seq);
                }
                Ok(())
            }
            Operation::InsertTransfer(record) => {
                shared.transfers.push(record);
                shared.commit_seq += 1;
                Ok(())
            }
            Operation::Invalid => Err(StoreError::Syntax("malformed operation".to_string())),
        }
    }
}

#[async_trait]
impl Session for MemSession {
    async fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        if self.tx.is_some() {
            return Err(StoreError::Internal(
                "transaction already in progress".to_string(),
            ));
        }
        let start_seq = self.shared.lock().commit_seq;
        trace!(?isolation, start_seq, "begin");
        self.tx = Some(Tx {
            isolation,
            start_seq,
            ops: Vec::new(),
            touched: BTreeSet::new(),
            aborted: false,
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Internal("no transaction in progress".to_string()))?;

        if tx.aborted {
            return Err(StoreError::Internal(
                "cannot commit an aborted transaction".to_string(),
            ));
        }

        let mut shared = self.shared.lock();

        // First committer wins: a serializable transaction fails if any
        // account it touched was rewritten after it began.
        if tx.isolation == IsolationLevel::Serializable {
            for account in &tx.touched {
                if shared.versions.get(account).copied().unwrap_or(0) > tx.start_seq {
                    return Err(StoreError::Serialization(format!(
                        "account {} was modified concurrently",
                        account
                    )));
                }
            }
        }

        // Validate the full effect against current committed state before
        // writing anything; a concurrent commit may have shrunk a balance.
        let mut balances = shared.accounts.clone();
        for op in &tx.ops {
            if let Staged::Adjust(account, delta) = op {
                if let Some(balance) = balances.get_mut(account) {
                    *balance += *delta;
                    if *balance < Decimal::ZERO {
                        return Err(StoreError::Constraint(format!(
                            "balance of account {} would become {}",
                            account, balance
                        )));
                    }
                }
            }
        }

        shared.accounts = balances;
        shared.commit_seq += 1;
        let seq = shared.commit_seq;
        for account in &tx.touched {
            shared.versions.insert(*account, seq);
        }
        for op in tx.ops {
            if let Staged::Insert(record) = op {
                shared.transfers.push(record);
            }
        }
        trace!(seq, "commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        // Rolling back with no open transaction is a no-op, mirroring the
        // warning-only behavior of SQL stores.
        self.tx = None;
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        let tx = self.tx_mut()?;
        if tx.aborted {
            return Err(StoreError::Internal(
                "current transaction is aborted, commands ignored until rollback".to_string(),
            ));
        }
        tx.ops.push(Staged::Savepoint(name.to_string()));
        Ok(())
    }

    async fn rollback_to(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        let tx = self.tx_mut()?;
        let position = tx.ops.iter().rposition(
            |op| matches!(op, Staged::Savepoint(n) if n == name),
        );
        match position {
            Some(idx) => {
                // Keep the savepoint itself so it can be returned to again;
                // discard everything issued after it and clear the error
                // state, exactly the scope a savepoint covers.
                tx.ops.truncate(idx + 1);
                tx.aborted = false;
                Ok(())
            }
            None => Err(StoreError::Internal(format!("no such savepoint: {}", name))),
        }
    }

    async fn execute(&mut self, op: Operation) -> Result<()> {
        if self.tx.is_some() {
            self.stage(op)
        } else {
            self.autocommit(op)
        }
    }

    async fn read_accounts(&mut self) -> Result<BalanceSnapshot> {
        let shared = self.shared.clone();
        let shared = shared.lock();
        let accounts: Vec<Account> = match self.tx.as_mut() {
            Some(tx) => {
                if tx.aborted {
                    return Err(StoreError::Internal(
                        "current transaction is aborted, commands ignored until rollback"
                            .to_string(),
                    ));
                }
                // Read-your-writes view; reads join the validation set.
                let view: Vec<Account> = shared
                    .accounts
                    .keys()
                    .map(|id| Account {
                        id: *id,
                        balance: Self::effective_balance(&shared, tx, *id)
                            .unwrap_or(Decimal::ZERO),
                    })
                    .collect();
                for account in &view {
                    tx.touched.insert(account.id);
                }
                view
            }
            None => shared
                .accounts
                .iter()
                .map(|(id, balance)| Account {
                    id: *id,
                    balance: *balance,
                })
                .collect(),
        };
        Ok(BalanceSnapshot::new(accounts))
    }

    async fn read_transfers(&mut self) -> Result<Vec<TransferRecord>> {
        let shared = self.shared.lock();
        let mut records = shared.transfers.clone();
        if let Some(tx) = &self.tx {
            for op in &tx.ops {
                if let Staged::Insert(record) = op {
                    records.push(record.clone());
                }
            }
        }
        Ok(records)
    }
}
