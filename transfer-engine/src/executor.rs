//! Transfer execution
//!
//! One transfer is one transaction: debit the sender, credit the receiver,
//! optionally append the audit record, commit. Any failure rolls the whole
//! transaction back and propagates unchanged, with no retries and no partial
//! recovery. Atomicity is delegated entirely to the store.

use crate::error::Result;
use crate::store::{Operation, Session};
use crate::types::{TransferRecord, TransferRequest};
use tracing::debug;

/// Apply one transfer atomically on the given session
///
/// Executed under `request.isolation`. The store's non-negativity constraint
/// applies at the debit step; a resulting negative balance aborts the
/// transaction with a constraint error. Serialization failures and deadlocks
/// are surfaced to the caller, which owns any retry policy.
pub async fn execute_transfer<S: Session>(session: &mut S, request: &TransferRequest) -> Result<()> {
    debug!(
        sender = %request.sender,
        receiver = %request.receiver,
        amount = %request.amount,
        isolation = ?request.isolation,
        "executing transfer"
    );

    session.begin(request.isolation).await?;

    match apply_steps(session, request).await {
        Ok(()) => {
            session.commit().await?;
            debug!(sender = %request.sender, receiver = %request.receiver, "transfer committed");
            Ok(())
        }
        Err(err) => {
            // Release the aborted transaction; the original error is the
            // one the caller classifies.
            let _ = session.rollback().await;
            Err(err)
        }
    }
}

async fn apply_steps<S: Session>(session: &mut S, request: &TransferRequest) -> Result<()> {
    session
        .execute(Operation::AdjustBalance {
            account: request.sender,
            delta: -request.amount,
        })
        .await?;

    session
        .execute(Operation::AdjustBalance {
            account: request.receiver,
            delta: request.amount,
        })
        .await?;

    if request.record_audit {
        session
            .execute(Operation::InsertTransfer(TransferRecord {
                from_account: request.sender,
                to_account: request.receiver,
                amount: request.amount,
            }))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemStore;
    use crate::store::TransferStore;
    use crate::types::{Account, AccountId, BalanceSnapshot, IsolationLevel};
    use rust_decimal::Decimal;

    fn seed() -> BalanceSnapshot {
        BalanceSnapshot::new(vec![
            Account { id: AccountId::new(1), balance: Decimal::from(1000) },
            Account { id: AccountId::new(2), balance: Decimal::from(1500) },
            Account { id: AccountId::new(3), balance: Decimal::from(2000) },
        ])
    }

    #[tokio::test]
    async fn test_transfer_moves_balances() {
        let store = MemStore::new(seed());
        let mut session = store.open_session().await.unwrap();

        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), Decimal::from(200));
        execute_transfer(&mut session, &req).await.unwrap();

        let snap = session.read_accounts().await.unwrap();
        assert_eq!(snap.balance_of(AccountId::new(1)), Some(Decimal::from(800)));
        assert_eq!(snap.balance_of(AccountId::new(2)), Some(Decimal::from(1700)));
        assert_eq!(snap.total(), seed().total());
    }

    #[tokio::test]
    async fn test_overdraft_rolls_back_whole_transfer() {
        let store = MemStore::new(seed());
        let mut session = store.open_session().await.unwrap();

        let req = TransferRequest::new(AccountId::new(1), AccountId::new(3), Decimal::from(5000));
        let err = execute_transfer(&mut session, &req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        // No partial debit is observable after the abort.
        let snap = session.read_accounts().await.unwrap();
        assert_eq!(snap, seed());
    }

    #[tokio::test]
    async fn test_audit_record_committed_with_balances() {
        let store = MemStore::new(seed());
        let mut session = store.open_session().await.unwrap();

        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), Decimal::from(200))
            .with_audit();
        execute_transfer(&mut session, &req).await.unwrap();

        let records = session.read_transfers().await.unwrap();
        assert_eq!(
            records,
            vec![TransferRecord {
                from_account: AccountId::new(1),
                to_account: AccountId::new(2),
                amount: Decimal::from(200),
            }]
        );
    }

    #[tokio::test]
    async fn test_no_audit_record_survives_abort() {
        let store = MemStore::new(BalanceSnapshot::new(vec![
            Account { id: AccountId::new(1), balance: Decimal::from(100) },
            Account { id: AccountId::new(2), balance: Decimal::from(100) },
        ]));
        let mut session = store.open_session().await.unwrap();

        // The debit step fails; the audit row must not survive the abort.
        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), Decimal::from(500))
            .with_isolation(IsolationLevel::Serializable)
            .with_audit();
        assert!(execute_transfer(&mut session, &req).await.is_err());

        assert!(session.read_transfers().await.unwrap().is_empty());
    }
}
