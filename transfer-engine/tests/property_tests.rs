//! Property-based tests for transfer invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Conservation: total funds are unchanged by any sequence of transfers
//! - Atomicity: a failed transfer leaves no partial effect
//! - Audit pairing: committed transfers and audit records stay in lockstep

use proptest::prelude::*;
use rust_decimal::Decimal;
use transfer_engine::{
    execute_transfer,
    memory::MemStore,
    types::{Account, AccountId, BalanceSnapshot, IsolationLevel, TransferRequest},
    ErrorKind, Session, TransferStore,
};

/// Strategy for account ids drawn from the seeded set
fn account_id_strategy() -> impl Strategy<Value = AccountId> {
    (1i64..=3).prop_map(AccountId::new)
}

/// Strategy for transfer amounts, including overdraft-sized ones
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=5000).prop_map(Decimal::from)
}

fn request_strategy() -> impl Strategy<Value = TransferRequest> {
    (
        account_id_strategy(),
        account_id_strategy(),
        amount_strategy(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(sender, receiver, amount, serializable, audit)| {
            let mut req = TransferRequest::new(sender, receiver, amount);
            if serializable {
                req = req.with_isolation(IsolationLevel::Serializable);
            }
            if audit {
                req = req.with_audit();
            }
            req
        })
}

fn seed() -> BalanceSnapshot {
    BalanceSnapshot::new(vec![
        Account { id: AccountId::new(1), balance: Decimal::from(1000) },
        Account { id: AccountId::new(2), balance: Decimal::from(1500) },
        Account { id: AccountId::new(3), balance: Decimal::from(2000) },
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: no sequence of sequential transfers changes total funds,
    /// and every failure is a constraint violation that leaves balances
    /// exactly where they were.
    #[test]
    fn prop_transfers_conserve_total(requests in proptest::collection::vec(request_strategy(), 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemStore::new(seed());
            let mut session = store.open_session().await.unwrap();

            for req in &requests {
                let before = session.read_accounts().await.unwrap();
                match execute_transfer(&mut session, req).await {
                    Ok(()) => {
                        let after = session.read_accounts().await.unwrap();
                        prop_assert_eq!(after.total(), before.total());
                    }
                    Err(err) => {
                        prop_assert_eq!(err.kind(), ErrorKind::Constraint);
                        let after = session.read_accounts().await.unwrap();
                        prop_assert_eq!(after, before);
                    }
                }
            }

            let final_snapshot = session.read_accounts().await.unwrap();
            prop_assert_eq!(final_snapshot.total(), seed().total());
            Ok(())
        })?;
    }

    /// Property: the audit log holds exactly one record per committed
    /// audited transfer, never one for an aborted transfer.
    #[test]
    fn prop_audit_records_match_commits(requests in proptest::collection::vec(request_strategy(), 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemStore::new(seed());
            let mut session = store.open_session().await.unwrap();

            let mut committed_audited = 0usize;
            for req in &requests {
                if execute_transfer(&mut session, req).await.is_ok() && req.record_audit {
                    committed_audited += 1;
                }
            }

            let records = session.read_transfers().await.unwrap();
            prop_assert_eq!(records.len(), committed_audited);
            Ok(())
        })?;
    }
}
