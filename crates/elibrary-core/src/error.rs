//! Domain rule violations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::BorrowStatus;

/// Result type alias for rule checks.
pub type DomainResult<T> = Result<T, DomainError>;

/// A request that breaks a domain rule. None of these are retried; the caller
/// gets the message and state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The member already holds the maximum number of active loans.
    #[error("borrow limit reached: {limit} active loans allowed")]
    BorrowLimitReached { limit: u32 },

    /// Every copy of the book is out on loan.
    #[error("book unavailable: no copies left to lend")]
    NoCopiesAvailable,

    /// The loan was already closed.
    #[error("loan already returned")]
    AlreadyReturned,

    /// Only loans in `Borrowed` status can be renewed.
    #[error("loan cannot be renewed in status {0}")]
    NotRenewable(BorrowStatus),

    /// Renewal requested after the due date.
    #[error("loan is overdue since {due_at}; return it instead of renewing")]
    LoanOverdue { due_at: DateTime<Utc> },

    /// The renewal cap has been used up.
    #[error("renewal limit reached: at most {limit} renewals allowed")]
    RenewalLimitReached { limit: u32 },
}

impl DomainError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::BorrowLimitReached { .. } => "BORROW_LIMIT_REACHED",
            Self::NoCopiesAvailable => "BOOK_UNAVAILABLE",
            Self::AlreadyReturned => "ALREADY_RETURNED",
            Self::NotRenewable(_) => "NOT_RENEWABLE",
            Self::LoanOverdue { .. } => "LOAN_OVERDUE",
            Self::RenewalLimitReached { .. } => "RENEWAL_LIMIT_REACHED",
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DomainError::validation("x"),
            DomainError::BorrowLimitReached { limit: 5 },
            DomainError::NoCopiesAvailable,
            DomainError::AlreadyReturned,
            DomainError::NotRenewable(BorrowStatus::Returned),
            DomainError::LoanOverdue { due_at: Utc::now() },
            DomainError::RenewalLimitReached { limit: 2 },
        ];
        let mut codes: Vec<_> = errors.iter().map(DomainError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_carry_limits() {
        let err = DomainError::BorrowLimitReached { limit: 5 };
        assert!(err.to_string().contains('5'));
    }
}
