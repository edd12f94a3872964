//! Error types for library storage operations.

use std::fmt;

use thiserror::Error;

/// Structured classification for storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// `SQLite` returned busy/locked under concurrent access.
    BusyOrLocked,
    /// Constraint failure (unique/check/not-null).
    ConstraintViolation,
    /// Connection pool timed out or is closed.
    Pool,
    /// Unclassified database failure.
    Other,
}

impl StoreErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Pool,
            sqlx::Error::Database(database_error) => {
                let code = database_error.code();
                if matches!(code.as_deref(), Some("5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED")) {
                    Self::BusyOrLocked
                } else if database_error.is_unique_violation()
                    || database_error.is_check_violation()
                    || code
                        .as_deref()
                        .is_some_and(|value| value.starts_with("SQLITE_CONSTRAINT"))
                {
                    Self::ConstraintViolation
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::Pool => "pool",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Errors that can occur during library storage operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        /// Typed classification.
        kind: StoreErrorKind,
        /// Human-readable database error text.
        message: String,
    },

    /// Book is not in storage.
    #[error("book not found: {0}\n  Suggestion: Add it first with `bookshelf add <url>`")]
    BookNotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// Returns the typed database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::BookNotFound(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_database_message() {
        let err = StoreError::Database {
            kind: StoreErrorKind::BusyOrLocked,
            message: "database is locked".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("busy_or_locked"));
        assert!(msg.contains("database is locked"));
        assert_eq!(err.database_kind(), Some(StoreErrorKind::BusyOrLocked));
    }

    #[test]
    fn test_store_error_book_not_found_has_suggestion() {
        let err = StoreError::BookNotFound("https://example.com/b".to_string());
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/b"));
        assert!(msg.contains("Suggestion"));
        assert_eq!(err.database_kind(), None);
    }

    #[test]
    fn test_store_error_from_pool_timeout() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.database_kind(), Some(StoreErrorKind::Pool));
    }
}
