//! Database models for the storage layer.
//!
//! Input types describe writes; `*Row` types map directly to query results
//! and are converted into `elibrary-core` domain types before leaving the
//! crate.

use chrono::{DateTime, Utc};
use elibrary_core::{
    Author, AuthorDetails, AuthorId, AuthorSummary, Book, BookId, Borrow, BorrowId, BorrowStatus,
    FinishedLoan, FollowedAuthor, Notification, NotificationId, NotificationKind, Review,
    ReviewId, Role, User, UserId,
};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;

// ============================================================================
// Inputs
// ============================================================================

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Input for creating or replacing an author. The store derives the
/// normalized name.
#[derive(Debug, Clone)]
pub struct AuthorInput {
    pub name: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

/// Input for creating or replacing a book. Copy counts are already
/// validated by the caller. When `available_copies` is `None` the store
/// keeps the row's current count, clamped into the new total, inside the
/// same write.
#[derive(Debug, Clone)]
pub struct BookInput {
    pub isbn: String,
    pub title: String,
    pub author_id: AuthorId,
    pub genre: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub total_copies: i32,
    pub available_copies: Option<i32>,
}

/// Input for opening a loan.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Input for a review upsert.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Input for one notification of a fan-out batch.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub book_id: Option<BookId>,
    pub author_id: Option<AuthorId>,
}

/// Filters for the loan overview. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    pub status: Option<BorrowStatus>,
    pub user_id: Option<UserId>,
    pub book_id: Option<BookId>,
}

impl LoanFilter {
    /// All loans of one user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Whether a loan passes the filter.
    pub fn matches(&self, borrow: &Borrow) -> bool {
        self.status.is_none_or(|s| s == borrow.status)
            && self.user_id.is_none_or(|u| u == borrow.user_id)
            && self.book_id.is_none_or(|b| b == borrow.book_id)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Database row for the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("user {}: {}", row.id, e)))?;
        Ok(Self {
            id: UserId::from_uuid(row.id),
            username: row.username,
            password_hash: row.password_hash,
            role,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            bio: row.bio,
            created: row.created,
        })
    }
}

/// Database row for the `authors` table.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorRow {
    pub id: Uuid,
    pub name: String,
    pub name_normalized: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: AuthorId::from_uuid(row.id),
            name: row.name,
            name_normalized: row.name_normalized,
            bio: row.bio,
            photo_url: row.photo_url,
            created: row.created,
        }
    }
}

/// Author listing row with its book count.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub books_count: i64,
}

impl From<AuthorSummaryRow> for AuthorSummary {
    fn from(row: AuthorSummaryRow) -> Self {
        Self {
            id: AuthorId::from_uuid(row.id),
            name: row.name,
            photo_url: row.photo_url,
            books_count: row.books_count,
        }
    }
}

/// Author page row with catalog statistics.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorDetailsRow {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub books_count: i64,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

impl From<AuthorDetailsRow> for AuthorDetails {
    fn from(row: AuthorDetailsRow) -> Self {
        Self {
            id: AuthorId::from_uuid(row.id),
            name: row.name,
            bio: row.bio,
            photo_url: row.photo_url,
            books_count: row.books_count,
            first_year: row.first_year,
            last_year: row.last_year,
        }
    }
}

/// Book row joined with its author name and review aggregates.
///
/// `total_count` is only selected by paged queries (`COUNT(*) OVER()`).
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub genre: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub average_rating: f64,
    pub review_count: i64,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub total_count: i64,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: BookId::from_uuid(row.id),
            isbn: row.isbn,
            title: row.title,
            author_id: AuthorId::from_uuid(row.author_id),
            author_name: row.author_name,
            genre: row.genre,
            published_year: row.published_year,
            description: row.description,
            cover_url: row.cover_url,
            total_copies: row.total_copies,
            available_copies: row.available_copies,
            average_rating: row.average_rating,
            review_count: row.review_count,
            created: row.created,
            updated: row.updated,
        }
    }
}

/// Loan row joined with the book title.
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    pub notes: Option<String>,
    pub renewal_count: i32,
    pub last_renewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BorrowRow> for Borrow {
    type Error = StoreError;

    fn try_from(row: BorrowRow) -> Result<Self, Self::Error> {
        let status: BorrowStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("borrow {}: {}", row.id, e)))?;
        Ok(Self {
            id: BorrowId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            book_id: BookId::from_uuid(row.book_id),
            book_title: row.book_title,
            borrowed_at: row.borrowed_at,
            due_at: row.due_at,
            returned_at: row.returned_at,
            status,
            notes: row.notes,
            renewal_count: row.renewal_count,
            last_renewed_at: row.last_renewed_at,
        })
    }
}

/// A returned loan with the genre of its book.
#[derive(Debug, Clone, FromRow)]
pub struct FinishedLoanRow {
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: DateTime<Utc>,
    pub genre: Option<String>,
}

impl From<FinishedLoanRow> for FinishedLoan {
    fn from(row: FinishedLoanRow) -> Self {
        Self {
            borrowed_at: row.borrowed_at,
            returned_at: row.returned_at,
            genre: row.genre,
        }
    }
}

/// Review row joined with the reviewer's username.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            book_id: BookId::from_uuid(row.book_id),
            username: row.username,
            rating: row.rating,
            comment: row.comment,
            created: row.created,
            updated: row.updated,
        }
    }
}

/// Followed author row.
#[derive(Debug, Clone, FromRow)]
pub struct FollowRow {
    pub author_id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
}

impl From<FollowRow> for FollowedAuthor {
    fn from(row: FollowRow) -> Self {
        Self {
            author_id: AuthorId::from_uuid(row.author_id),
            name: row.name,
            followed_at: row.created,
        }
    }
}

/// Database row for the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub book_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub is_read: bool,
    pub created: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = row
            .kind
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("notification {}: {}", row.id, e)))?;
        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            kind,
            title: row.title,
            body: row.body,
            book_id: row.book_id.map(BookId::from_uuid),
            author_id: row.author_id.map(AuthorId::from_uuid),
            is_read: row.is_read,
            created: row.created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrow_row(status: &str) -> BorrowRow {
        let now = Utc::now();
        BorrowRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            book_title: "Sapiens".to_string(),
            borrowed_at: now,
            due_at: now,
            returned_at: None,
            status: status.to_string(),
            notes: None,
            renewal_count: 0,
            last_renewed_at: None,
        }
    }

    #[test]
    fn borrow_row_converts() {
        let borrow = Borrow::try_from(borrow_row("Borrowed")).unwrap();
        assert_eq!(borrow.status, BorrowStatus::Borrowed);
        assert_eq!(borrow.book_title, "Sapiens");
    }

    #[test]
    fn borrow_row_with_unknown_status_is_invalid() {
        let err = Borrow::try_from(borrow_row("Lost")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn loan_filter_matches() {
        let borrow = Borrow::try_from(borrow_row("Returned")).unwrap();
        assert!(LoanFilter::default().matches(&borrow));
        assert!(LoanFilter::for_user(borrow.user_id).matches(&borrow));
        assert!(!LoanFilter::for_user(UserId::new()).matches(&borrow));

        let filter = LoanFilter {
            status: Some(BorrowStatus::Borrowed),
            ..Default::default()
        };
        assert!(!filter.matches(&borrow));
    }
}
