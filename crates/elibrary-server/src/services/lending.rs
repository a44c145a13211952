//! Borrow, return and renew.
//!
//! The rule checks themselves live in `elibrary_core::lending`; this layer
//! stamps times, applies ownership and hands the write to the repository,
//! which re-checks limits under its own lock.

use chrono::{DateTime, Utc};
use elibrary_core::{BookId, Borrow, BorrowId, LendingPolicy, lending};
use elibrary_store::{LibraryRepository, LoanFilter, NewLoan};
use serde::Serialize;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};

/// A loan as shown to its borrower.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowView {
    #[serde(flatten)]
    pub borrow: Borrow,
    /// Still out and past its due date.
    pub overdue: bool,
}

impl BorrowView {
    pub fn new(borrow: Borrow, now: DateTime<Utc>) -> Self {
        let overdue = borrow.is_overdue(now);
        Self { borrow, overdue }
    }
}

/// Opens a loan for `user` on `book_id`, due one loan period from `now`.
pub async fn borrow(
    repo: &dyn LibraryRepository,
    policy: &LendingPolicy,
    user: &AuthenticatedUser,
    book_id: BookId,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> ApiResult<Borrow> {
    let loan = NewLoan {
        user_id: user.user_id,
        book_id,
        borrowed_at: now,
        due_at: lending::due_date(policy, now),
        notes: elibrary_core::catalog::non_blank(notes.as_deref()),
    };

    let borrow = repo.open_loan(&loan, policy).await?;

    tracing::info!(
        borrow_id = %borrow.id,
        user_id = %user.user_id,
        book_id = %book_id,
        due_at = %borrow.due_at,
        "Book borrowed"
    );

    Ok(borrow)
}

/// Closes one of the caller's loans. Someone else's loan is not found.
pub async fn return_book(
    repo: &dyn LibraryRepository,
    user: &AuthenticatedUser,
    id: BorrowId,
    now: DateTime<Utc>,
) -> ApiResult<Borrow> {
    let borrow = repo.close_loan(id, Some(user.user_id), now).await?;

    tracing::info!(
        borrow_id = %id,
        user_id = %user.user_id,
        status = %borrow.status,
        "Book returned"
    );

    Ok(borrow)
}

/// Extends a loan by one loan period. Owners and admins may renew.
pub async fn renew(
    repo: &dyn LibraryRepository,
    policy: &LendingPolicy,
    actor: &AuthenticatedUser,
    id: BorrowId,
    now: DateTime<Utc>,
) -> ApiResult<Borrow> {
    let existing = repo.get_loan(id).await?;
    if !actor.is_self_or_admin(existing.user_id) {
        return Err(ApiError::Forbidden(
            "Only the borrower or an admin can renew this loan".to_string(),
        ));
    }

    let borrow = repo.renew_loan(id, policy, now).await?;

    tracing::info!(
        borrow_id = %id,
        actor_id = %actor.user_id,
        renewal_count = borrow.renewal_count,
        due_at = %borrow.due_at,
        "Loan renewed"
    );

    Ok(borrow)
}

/// The caller's loans, newest first, flagged when overdue.
pub async fn my_borrows(
    repo: &dyn LibraryRepository,
    user: &AuthenticatedUser,
    now: DateTime<Utc>,
) -> ApiResult<Vec<BorrowView>> {
    let loans = repo.list_loans(&LoanFilter::for_user(user.user_id)).await?;
    Ok(loans
        .into_iter()
        .map(|borrow| BorrowView::new(borrow, now))
        .collect())
}

/// Every loan matching the filter, newest first.
pub async fn all_borrows(
    repo: &dyn LibraryRepository,
    filter: &LoanFilter,
    now: DateTime<Utc>,
) -> ApiResult<Vec<BorrowView>> {
    let loans = repo.list_loans(filter).await?;
    Ok(loans
        .into_iter()
        .map(|borrow| BorrowView::new(borrow, now))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use elibrary_core::{BorrowStatus, Role, UserId};

    fn loan(user_id: UserId, due_in_days: i64, returned: bool) -> Borrow {
        let now = Utc::now();
        Borrow {
            id: BorrowId::new(),
            user_id,
            book_id: BookId::new(),
            book_title: "Dune".to_string(),
            borrowed_at: now - Duration::days(20),
            due_at: now + Duration::days(due_in_days),
            returned_at: returned.then_some(now),
            status: if returned {
                BorrowStatus::Returned
            } else {
                BorrowStatus::Borrowed
            },
            notes: None,
            renewal_count: 0,
            last_renewed_at: None,
        }
    }

    #[test]
    fn test_view_flags_overdue_active_loans() {
        let user = UserId::new();
        let now = Utc::now();
        assert!(BorrowView::new(loan(user, -1, false), now).overdue);
        assert!(!BorrowView::new(loan(user, 3, false), now).overdue);
        assert!(!BorrowView::new(loan(user, -1, true), now).overdue);
    }

    #[test]
    fn test_view_serializes_flat() {
        let view = BorrowView::new(loan(UserId::new(), 3, false), Utc::now());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["book_title"], "Dune");
        assert_eq!(json["status"], "Borrowed");
        assert_eq!(json["overdue"], false);
    }

    #[tokio::test]
    async fn test_renew_unknown_loan_not_found() {
        let store = elibrary_store::MemoryStore::new();
        let stranger = AuthenticatedUser {
            user_id: UserId::new(),
            username: "stranger".to_string(),
            role: Role::User,
        };
        // Unknown loans are reported before ownership is considered.
        let err = renew(
            &store,
            &LendingPolicy::default(),
            &stranger,
            BorrowId::new(),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }
}
