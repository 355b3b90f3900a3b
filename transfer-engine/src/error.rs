//! Error types for the transfer engine

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a transactional store
///
/// The five leading variants are the classification contract the conflict
/// harness matches on; `Internal` covers anything the store reports outside
/// that taxonomy and is always an unexpected outcome for a scenario.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed operation; aborts the enclosing transaction
    #[error("Syntax or statement error: {0}")]
    Syntax(String),

    /// A write would violate a store invariant (e.g. negative balance)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Conflict detected under strict isolation; transaction aborted
    #[error("Serialization failure: {0}")]
    Serialization(String),

    /// The store broke a cycle of waiting transactions by aborting this one
    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    /// Transport/session-level failure; fatal to the affected session
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error outside the five-kind taxonomy
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Classification kind for scenario matching
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Syntax(_) => ErrorKind::Syntax,
            StoreError::Constraint(_) => ErrorKind::Constraint,
            StoreError::Serialization(_) => ErrorKind::Serialization,
            StoreError::Deadlock(_) => ErrorKind::Deadlock,
            StoreError::Connection(_) => ErrorKind::Connection,
            StoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Error kind, detached from message payloads
///
/// Copyable value the scenario runner uses in expected-error sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Malformed operation
    Syntax,
    /// Store invariant violated by a write
    Constraint,
    /// Conflict under strict isolation
    Serialization,
    /// Aborted to break a wait cycle
    Deadlock,
    /// Session/transport failure
    Connection,
    /// Unclassified store error
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Constraint => "constraint",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Deadlock => "deadlock",
            ErrorKind::Connection => "connection",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.to_string()).unwrap_or_default();
                classify_sqlstate(&code, db.message())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Connection(err.to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

/// Map a SQLSTATE code to the engine's error taxonomy
///
/// Class 42 is syntax/access-rule, class 23 is integrity constraint,
/// 40001 is serialization_failure and 40P01 deadlock_detected. Class 08
/// covers connection exceptions.
pub fn classify_sqlstate(code: &str, message: &str) -> StoreError {
    match code {
        "40001" => StoreError::Serialization(message.to_string()),
        "40P01" => StoreError::Deadlock(message.to_string()),
        _ if code.starts_with("42") => StoreError::Syntax(message.to_string()),
        _ if code.starts_with("23") => StoreError::Constraint(message.to_string()),
        _ if code.starts_with("08") => StoreError::Connection(message.to_string()),
        _ => StoreError::Internal(format!("{} ({})", message, code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sqlstate_kinds() {
        assert_eq!(classify_sqlstate("42601", "syntax error").kind(), ErrorKind::Syntax);
        assert_eq!(classify_sqlstate("23514", "check violated").kind(), ErrorKind::Constraint);
        assert_eq!(classify_sqlstate("23503", "fk violated").kind(), ErrorKind::Constraint);
        assert_eq!(classify_sqlstate("40001", "could not serialize").kind(), ErrorKind::Serialization);
        assert_eq!(classify_sqlstate("40P01", "deadlock").kind(), ErrorKind::Deadlock);
        assert_eq!(classify_sqlstate("08006", "connection failure").kind(), ErrorKind::Connection);
        assert_eq!(classify_sqlstate("XX000", "???").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::Serialization.to_string(), "serialization");
        assert_eq!(ErrorKind::Deadlock.to_string(), "deadlock");
    }
}
