//! Loan lifecycle rules.
//!
//! Every function here is pure: callers fetch the current rows, ask these
//! functions what the next state is, and persist the answer. Nothing in this
//! module touches storage or the clock; `now` is always passed in.

use chrono::{DateTime, Utc};

use crate::error::{DomainError, DomainResult};
use crate::policy::LendingPolicy;
use crate::types::{Borrow, BorrowStatus};

// ============================================================================
// Borrow
// ============================================================================

/// Checks whether a member with `active_loans` outstanding may open another
/// loan on a book with `available_copies` left.
///
/// The limit check comes first, matching the order members see errors in.
pub fn check_borrow(
    policy: &LendingPolicy,
    active_loans: i64,
    available_copies: i32,
) -> DomainResult<()> {
    check_borrow_limit(policy, active_loans)?;
    check_availability(available_copies)
}

/// Rejects a new loan once the member holds the maximum.
pub fn check_borrow_limit(policy: &LendingPolicy, active_loans: i64) -> DomainResult<()> {
    if active_loans >= i64::from(policy.max_active_borrows) {
        return Err(DomainError::BorrowLimitReached {
            limit: policy.max_active_borrows,
        });
    }
    Ok(())
}

/// Rejects a new loan when no copy is on the shelf.
pub fn check_availability(available_copies: i32) -> DomainResult<()> {
    if available_copies <= 0 {
        return Err(DomainError::NoCopiesAvailable);
    }
    Ok(())
}

/// Due date for a loan opened at `now`.
#[must_use]
pub fn due_date(policy: &LendingPolicy, now: DateTime<Utc>) -> DateTime<Utc> {
    extend(now, policy)
}

/// Adds one loan period, saturating at the latest representable instant.
fn extend(from: DateTime<Utc>, policy: &LendingPolicy) -> DateTime<Utc> {
    from.checked_add_signed(policy.loan_duration())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ============================================================================
// Return
// ============================================================================

/// Outcome of closing a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanClosure {
    pub returned_at: DateTime<Utc>,
    pub status: BorrowStatus,
}

/// Status stamped on return: `Overdue` strictly after the due date.
#[must_use]
pub fn return_status(due_at: DateTime<Utc>, returned_at: DateTime<Utc>) -> BorrowStatus {
    if returned_at > due_at {
        BorrowStatus::Overdue
    } else {
        BorrowStatus::Returned
    }
}

/// Closes an active loan at `now`.
pub fn close_loan(borrow: &Borrow, now: DateTime<Utc>) -> DomainResult<LoanClosure> {
    if borrow.returned_at.is_some() {
        return Err(DomainError::AlreadyReturned);
    }
    Ok(LoanClosure {
        returned_at: now,
        status: return_status(borrow.due_at, now),
    })
}

// ============================================================================
// Renew
// ============================================================================

/// Outcome of renewing a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renewal {
    pub due_at: DateTime<Utc>,
    pub renewal_count: i32,
    pub renewed_at: DateTime<Utc>,
}

/// Extends an active, not yet overdue loan by one loan period.
pub fn renew_loan(
    policy: &LendingPolicy,
    borrow: &Borrow,
    now: DateTime<Utc>,
) -> DomainResult<Renewal> {
    if borrow.returned_at.is_some() {
        return Err(DomainError::AlreadyReturned);
    }
    if borrow.status != BorrowStatus::Borrowed {
        return Err(DomainError::NotRenewable(borrow.status));
    }
    if now > borrow.due_at {
        return Err(DomainError::LoanOverdue {
            due_at: borrow.due_at,
        });
    }
    let count = u32::try_from(borrow.renewal_count).unwrap_or(0);
    if count >= policy.max_renewals {
        return Err(DomainError::RenewalLimitReached {
            limit: policy.max_renewals,
        });
    }
    Ok(Renewal {
        due_at: extend(borrow.due_at, policy),
        renewal_count: borrow.renewal_count + 1,
        renewed_at: now,
    })
}

// ============================================================================
// Copy counts
// ============================================================================

/// Validates a total copy count.
pub fn check_total_copies(total: i32) -> DomainResult<()> {
    if total < 0 {
        return Err(DomainError::validation("total_copies must not be negative"));
    }
    Ok(())
}

/// Available copies for a new title: omitted or zero means "all of them",
/// anything else is clamped into `[0, total]`.
#[must_use]
pub fn initial_available(total: i32, requested: Option<i32>) -> i32 {
    let requested = match requested {
        None | Some(0) => total,
        Some(n) => n,
    };
    requested.clamp(0, total.max(0))
}

/// Available copies after an edit, clamped into `[0, total]`.
#[must_use]
pub fn clamp_available(total: i32, requested: i32) -> i32 {
    requested.clamp(0, total.max(0))
}

// ============================================================================
// Tests
// ============================================================================
