//! Conflict scenario runner
//!
//! One method per canonical scenario. Every scenario seeds the store with
//! the starting snapshot, drives one or more sessions, classifies each
//! session's result against the scenario's declared expected set, and
//! re-reads the invariant on a fresh session before any verdict. Concurrent
//! scenarios run their sessions as independent tasks and never serialize or
//! cancel them; the store's concurrency control produces the outcome.

use crate::error::Result;
use crate::outcome::{classify, ScenarioOutcome, SessionResult};
use crate::scenario::{
    overdraft_amount, standard_amount, starting_balances, ScenarioId, ACCOUNT_A, ACCOUNT_B,
    ACCOUNT_C,
};
use tracing::{info, warn};
use transfer_engine::invariant::check_balances;
use transfer_engine::{
    execute_transfer, ErrorKind, IsolationLevel, Operation, Provision, Session, StoreError,
    TransferRecord, TransferRequest, TransferStore,
};

/// Savepoint name used by the partial-rollback scenario
const SAVEPOINT: &str = "pre_transfer";

/// Drives the canonical scenarios against one store
pub struct ScenarioRunner<S> {
    store: S,
}

impl<S> ScenarioRunner<S>
where
    S: TransferStore + Provision,
{
    /// Create a runner over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run every scenario in order and collect the outcomes
    pub async fn run_all(&self) -> Result<Vec<ScenarioOutcome>> {
        let outcomes = vec![
            self.malformed_statement().await?,
            self.overdraft().await?,
            self.serializable_conflict().await?,
            self.savepoint_rollback().await?,
            self.default_isolation_conflict().await?,
            self.audited_transfer().await?,
        ];
        for outcome in &outcomes {
            if outcome.passed() {
                info!(scenario = %outcome.scenario, note = %outcome.note, "scenario passed");
            } else {
                warn!(
                    scenario = %outcome.scenario,
                    sessions = ?outcome.sessions,
                    invariant_held = outcome.invariant_held,
                    note = %outcome.note,
                    "scenario failed"
                );
            }
        }
        Ok(outcomes)
    }

    /// Scenario A: a malformed operation between debit and credit aborts
    /// the whole transaction; balances stay at the seed
    pub async fn malformed_statement(&self) -> Result<ScenarioOutcome> {
        let scenario = ScenarioId::MalformedStatement;
        self.store.seed(&starting_balances()).await?;

        let mut session = self.store.open_session().await?;
        let result = malformed_flow(&mut session).await;
        // The induced fault leaves the transaction aborted; release it.
        let _ = session.rollback().await;

        let sessions = vec![classify(result, scenario.expected_kinds(), true)];
        let invariant_held = self.invariant_holds().await?;
        Ok(ScenarioOutcome {
            scenario,
            sessions,
            invariant_held,
            note: "transaction rolled back in full".to_string(),
        })
    }

    /// Scenario B: an overdraft attempt trips the store's non-negativity
    /// constraint; balances stay at the seed
    pub async fn overdraft(&self) -> Result<ScenarioOutcome> {
        let scenario = ScenarioId::Overdraft;
        self.store.seed(&starting_balances()).await?;

        let mut session = self.store.open_session().await?;
        let request = TransferRequest::new(ACCOUNT_A, ACCOUNT_C, overdraft_amount());
        let result = execute_transfer(&mut session, &request).await;

        let sessions = vec![classify(result, scenario.expected_kinds(), true)];
        let invariant_held = self.invariant_holds().await?;
        Ok(ScenarioOutcome {
            scenario,
            sessions,
            invariant_held,
            note: "overdraft rejected atomically".to_string(),
        })
    }

    /// Scenario C: concurrent symmetric transfers under serializable
    /// isolation; either exactly one session takes a serialization failure
    /// or both commit a serial-equivalent result
    pub async fn serializable_conflict(&self) -> Result<ScenarioOutcome> {
        self.concurrent_pair(ScenarioId::SerializableConflict, IsolationLevel::Serializable)
            .await
    }

    /// Scenario D: an induced fault inside a transaction is recovered by
    /// rolling back to a savepoint; the commit restores the seed exactly
    pub async fn savepoint_rollback(&self) -> Result<ScenarioOutcome> {
        let scenario = ScenarioId::SavepointRollback;
        self.store.seed(&starting_balances()).await?;

        let mut session = self.store.open_session().await?;
        let session_result = match savepoint_flow(&mut session).await {
            Ok(result) => result,
            Err(err) => {
                let _ = session.rollback().await;
                SessionResult::UnexpectedError(err.kind())
            }
        };

        let invariant_held = self.invariant_holds().await?;
        Ok(ScenarioOutcome {
            scenario,
            sessions: vec![session_result],
            invariant_held,
            note: "fault handled inside the transaction; net effect is zero".to_string(),
        })
    }

    /// Scenario E: concurrent symmetric transfers under default isolation;
    /// at most one session is aborted as a deadlock victim
    pub async fn default_isolation_conflict(&self) -> Result<ScenarioOutcome> {
        self.concurrent_pair(ScenarioId::DefaultIsolationConflict, IsolationLevel::Default)
            .await
    }

    /// Scenario F: an audited transfer moves the balances and leaves
    /// exactly one matching record in the transfer log
    pub async fn audited_transfer(&self) -> Result<ScenarioOutcome> {
        let scenario = ScenarioId::AuditedTransfer;
        self.store.seed(&starting_balances()).await?;

        let mut session = self.store.open_session().await?;
        let request = TransferRequest::new(ACCOUNT_A, ACCOUNT_B, standard_amount()).with_audit();
        let result = execute_transfer(&mut session, &request).await;
        let sessions = vec![classify(result, scenario.expected_kinds(), false)];

        let mut check = self.store.open_session().await?;
        let expected = starting_balances().with_transfer(ACCOUNT_A, ACCOUNT_B, standard_amount());
        let balances_ok = check_balances(&mut check, &expected).await?;
        let records = check.read_transfers().await?;
        let audit_ok = records
            == vec![TransferRecord {
                from_account: ACCOUNT_A,
                to_account: ACCOUNT_B,
                amount: standard_amount(),
            }];

        let note = if audit_ok {
            "transfer committed with its audit record".to_string()
        } else {
            format!("audit log mismatch: {} records", records.len())
        };
        Ok(ScenarioOutcome {
            scenario,
            sessions,
            invariant_held: balances_ok && audit_ok,
            note,
        })
    }

    /// Shared driver for the two concurrent-conflict scenarios
    ///
    /// Both sessions run as independent tasks with audit records enabled;
    /// the audit log disambiguates which branch the store took, since the
    /// symmetric amounts make the "both committed" balances identical to
    /// the seed.
    async fn concurrent_pair(
        &self,
        scenario: ScenarioId,
        isolation: IsolationLevel,
    ) -> Result<ScenarioOutcome> {
        self.store.seed(&starting_balances()).await?;

        let forward = TransferRequest::new(ACCOUNT_A, ACCOUNT_B, standard_amount())
            .with_isolation(isolation)
            .with_audit();
        let backward = TransferRequest::new(ACCOUNT_B, ACCOUNT_A, standard_amount())
            .with_isolation(isolation)
            .with_audit();

        let first = self.store.open_session().await?;
        let second = self.store.open_session().await?;
        let task_one = tokio::spawn(run_session(first, forward));
        let task_two = tokio::spawn(run_session(second, backward));

        // Both tasks are always awaited; one session's failure is never
        // cause to cancel the sibling in flight.
        let result_one = task_one.await?;
        let result_two = task_two.await?;

        let expected = scenario.expected_kinds();
        let sessions = vec![
            classify(result_one, expected, false),
            classify(result_two, expected, false),
        ];
        let successes = sessions
            .iter()
            .filter(|r| matches!(r, SessionResult::Success))
            .count();

        let mut check = self.store.open_session().await?;
        let balances = check.read_accounts().await?;
        let records = check.read_transfers().await?;
        let seed = starting_balances();

        let (invariant_held, note) = match records.len() {
            2 if successes == 2 && balances == seed => (
                true,
                "both transfers committed; symmetric amounts net to zero".to_string(),
            ),
            1 if successes == 1 => {
                let record = &records[0];
                let expected_state =
                    seed.with_transfer(record.from_account, record.to_account, record.amount);
                (
                    balances == expected_state,
                    format!(
                        "only the {}->{} transfer committed",
                        record.from_account, record.to_account
                    ),
                )
            }
            n => (
                false,
                format!(
                    "no legitimate branch matches {} audit records with {} committed sessions",
                    n, successes
                ),
            ),
        };

        Ok(ScenarioOutcome {
            scenario,
            sessions,
            invariant_held,
            note,
        })
    }

    /// Re-read all balances on a fresh session and compare with the seed
    async fn invariant_holds(&self) -> Result<bool> {
        let mut session = self.store.open_session().await?;
        Ok(check_balances(&mut session, &starting_balances()).await?)
    }
}

/// Scenario A transaction body: debit, induced fault, credit
async fn malformed_flow<S: Session>(session: &mut S) -> std::result::Result<(), StoreError> {
    session.begin(IsolationLevel::Default).await?;
    session
        .execute(Operation::AdjustBalance {
            account: ACCOUNT_A,
            delta: -standard_amount(),
        })
        .await?;
    session.execute(Operation::Invalid).await?;
    session
        .execute(Operation::AdjustBalance {
            account: ACCOUNT_B,
            delta: standard_amount(),
        })
        .await?;
    session.commit().await
}

/// Scenario D transaction body: savepoint, sub-transfer, induced fault,
/// recovery, commit
///
/// The savepoint is taken at the start of the transaction so that rolling
/// back to it restores the pre-transaction state exactly; the commit then
/// makes the net-zero effect durable and no error reaches the caller.
async fn savepoint_flow<S: Session>(
    session: &mut S,
) -> std::result::Result<SessionResult, StoreError> {
    session.begin(IsolationLevel::Default).await?;
    session.savepoint(SAVEPOINT).await?;
    session
        .execute(Operation::AdjustBalance {
            account: ACCOUNT_B,
            delta: -standard_amount(),
        })
        .await?;
    session
        .execute(Operation::AdjustBalance {
            account: ACCOUNT_A,
            delta: standard_amount(),
        })
        .await?;

    match session.execute(Operation::Invalid).await {
        Ok(()) => {
            session.rollback().await?;
            Ok(SessionResult::MissingExpectedError)
        }
        Err(err) if err.kind() == ErrorKind::Syntax => {
            session.rollback_to(SAVEPOINT).await?;
            session.commit().await?;
            Ok(SessionResult::Success)
        }
        Err(err) => {
            let _ = session.rollback().await;
            Ok(SessionResult::UnexpectedError(err.kind()))
        }
    }
}

/// One spawned scenario session: owns its session for its whole lifetime
async fn run_session<S: Session + 'static>(
    mut session: S,
    request: TransferRequest,
) -> std::result::Result<(), StoreError> {
    execute_transfer(&mut session, &request).await
}
