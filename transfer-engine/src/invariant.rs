//! Ledger invariant checking
//!
//! After every scenario the full set of balances is re-read from the store
//! and compared for exact equality against a known snapshot. The check
//! never consults cached state: each call is a fresh round trip, so it
//! observes the store's current truth.

use crate::error::Result;
use crate::store::Session;
use crate::types::BalanceSnapshot;
use tracing::debug;

/// Read current balances and compare them exactly against `expected`
pub async fn check_balances<S: Session>(
    session: &mut S,
    expected: &BalanceSnapshot,
) -> Result<bool> {
    let actual = session.read_accounts().await?;
    let holds = actual == *expected;
    debug!(%actual, %expected, holds, "invariant check");
    Ok(holds)
}

/// Read current balances and report the first matching candidate
///
/// Used after nondeterministic scenarios where more than one final state is
/// legitimate; returns the index of the candidate that holds, or `None`
/// when none does (a harness failure for the caller to surface).
pub async fn match_candidates<S: Session>(
    session: &mut S,
    candidates: &[BalanceSnapshot],
) -> Result<Option<usize>> {
    let actual = session.read_accounts().await?;
    Ok(candidates.iter().position(|c| *c == actual))
}
