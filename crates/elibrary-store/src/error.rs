//! Error types for the storage layer.

use elibrary_core::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    /// The addressed row does not exist (or is not visible to the caller).
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A unique key is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A delete was refused because other rows still depend on the target.
    #[error("restricted: {0}")]
    Restricted(String),

    /// The guarded availability decrement found no copy left.
    #[error("no copies available for book {0}")]
    NoCopiesAvailable(Uuid),

    /// The loan was closed before this request got to it.
    #[error("loan already returned: {0}")]
    AlreadyReturned(Uuid),

    /// A lending or validation rule rejected the write.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A stored value could not be mapped back to a domain type.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for a missing row.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Maps a unique-constraint violation to [`StoreError::Conflict`] and
    /// passes every other database error through.
    pub(crate) fn unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(message.into())
            }
            _ => Self::Connection(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = StoreError::not_found("book", Uuid::nil());
        assert_eq!(
            err.to_string(),
            "book not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = StoreError::unique_violation(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn domain_errors_are_transparent() {
        let err: StoreError = DomainError::NoCopiesAvailable.into();
        assert_eq!(err.to_string(), DomainError::NoCopiesAvailable.to_string());
    }
}
