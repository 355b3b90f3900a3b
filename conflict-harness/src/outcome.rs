//! Scenario outcome classification
//!
//! A scenario produces one immutable [`ScenarioOutcome`]: one classified
//! result per session, whether the post-scenario invariant held, and a note
//! naming the branch that was observed. Presentation is external; these
//! values serialize cleanly for any reporting sink.

use crate::scenario::ScenarioId;
use serde::{Deserialize, Serialize};
use transfer_engine::{ErrorKind, StoreError};

/// Classified result of one session within a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionResult {
    /// The session's transaction committed
    Success,

    /// The session failed with an error kind the scenario declares expected
    Expected(ErrorKind),

    /// The session failed with a kind outside the scenario's expected set;
    /// the scenario's assumptions about the store are violated
    UnexpectedError(ErrorKind),

    /// The scenario demanded a classified error but the operation succeeded
    MissingExpectedError,
}

impl SessionResult {
    /// Whether this result is a harness failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SessionResult::UnexpectedError(_) | SessionResult::MissingExpectedError
        )
    }
}

/// Classify one session's outcome against a scenario's expected error set
///
/// `require_error` is set for scenarios where success itself would mean the
/// induced fault did not fire.
pub fn classify(
    result: std::result::Result<(), StoreError>,
    expected: &[ErrorKind],
    require_error: bool,
) -> SessionResult {
    match result {
        Ok(()) => {
            if require_error {
                SessionResult::MissingExpectedError
            } else {
                SessionResult::Success
            }
        }
        Err(err) => {
            let kind = err.kind();
            if expected.contains(&kind) {
                SessionResult::Expected(kind)
            } else {
                SessionResult::UnexpectedError(kind)
            }
        }
    }
}

/// Immutable record of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Which scenario ran
    pub scenario: ScenarioId,

    /// One classified result per session, in session order
    pub sessions: Vec<SessionResult>,

    /// Whether the post-scenario state matched a legitimate snapshot
    pub invariant_held: bool,

    /// Which branch was observed (for nondeterministic scenarios) or why
    /// the scenario failed
    pub note: String,
}

impl ScenarioOutcome {
    /// A scenario passes iff the invariant held and no session result is a
    /// harness failure
    pub fn passed(&self) -> bool {
        self.invariant_held && !self.sessions.iter().any(SessionResult::is_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_expected_error() {
        let result = classify(
            Err(StoreError::Constraint("overdraft".into())),
            &[ErrorKind::Constraint],
            true,
        );
        assert_eq!(result, SessionResult::Expected(ErrorKind::Constraint));
        assert!(!result.is_failure());
    }

    #[test]
    fn test_classify_unexpected_kind() {
        let result = classify(
            Err(StoreError::Deadlock("cycle".into())),
            &[ErrorKind::Serialization],
            false,
        );
        assert_eq!(result, SessionResult::UnexpectedError(ErrorKind::Deadlock));
        assert!(result.is_failure());
    }

    #[test]
    fn test_classify_missing_expected_error() {
        assert_eq!(
            classify(Ok(()), &[ErrorKind::Syntax], true),
            SessionResult::MissingExpectedError
        );
        assert_eq!(classify(Ok(()), &[ErrorKind::Syntax], false), SessionResult::Success);
    }

    #[test]
    fn test_outcome_passed() {
        let ok = ScenarioOutcome {
            scenario: ScenarioId::Overdraft,
            sessions: vec![SessionResult::Expected(ErrorKind::Constraint)],
            invariant_held: true,
            note: "balances unchanged".into(),
        };
        assert!(ok.passed());

        let bad_invariant = ScenarioOutcome {
            invariant_held: false,
            ..ok.clone()
        };
        assert!(!bad_invariant.passed());

        let bad_session = ScenarioOutcome {
            sessions: vec![SessionResult::UnexpectedError(ErrorKind::Internal)],
            ..ok
        };
        assert!(!bad_session.passed());
    }
}
