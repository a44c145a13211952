//! Repository traits: the seam between services and storage.
//!
//! Each table family gets its own trait. Both [`crate::Store`] (PostgreSQL)
//! and [`crate::MemoryStore`] implement all of them, and
//! [`LibraryRepository`] bundles them so the server can hold a single
//! `Arc<dyn LibraryRepository>`.
//!
//! Writes that touch more than one row are atomic: implementations run them
//! in one transaction (or under one lock) and apply the ownership rules
//! explicitly rather than relying on cascading foreign keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elibrary_core::{
    Author, AuthorDetails, AuthorId, AuthorSummary, Book, BookId, BookQuery, Borrow, BorrowId,
    FinishedLoan, FollowedAuthor, LendingPolicy, Notification, NotificationId, Page, Review,
    User, UserId,
};

use crate::error::StoreResult;
use crate::models::{
    AuthorInput, BookInput, LoanFilter, NewLoan, NewNotification, NewUser, ReviewInput,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user. A taken username is a conflict.
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    /// Exact (case-sensitive) username lookup.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Whether any account exists. Used by bootstrap seeding.
    async fn has_users(&self) -> StoreResult<bool>;

    /// Deletes a user with their notifications, follows, reviews and loans.
    /// Active loans return their copy to the shelf first.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Creates an author. A normalized-name collision is a conflict.
    async fn insert_author(&self, author: &AuthorInput) -> StoreResult<Author>;

    async fn get_author(&self, id: AuthorId) -> StoreResult<Author>;

    /// Lookup by normalized name (see [`elibrary_core::normalize_name`]).
    async fn find_author_by_name(&self, normalized: &str) -> StoreResult<Option<Author>>;

    /// Authors ordered by lowercased name, optionally filtered by a normalized
    /// substring, with book counts.
    async fn list_authors(&self, filter: Option<&str>, take: u32)
    -> StoreResult<Vec<AuthorSummary>>;

    async fn author_details(&self, id: AuthorId) -> StoreResult<AuthorDetails>;

    /// Replaces name, bio and photo. Taking another author's name is a conflict.
    async fn update_author(&self, id: AuthorId, author: &AuthorInput) -> StoreResult<Author>;

    /// Refused while any book references the author; otherwise removes the
    /// author's follows too.
    async fn delete_author(&self, id: AuthorId) -> StoreResult<()>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert_book(&self, book: &BookInput) -> StoreResult<Book>;

    async fn get_book(&self, id: BookId) -> StoreResult<Book>;

    /// Filtered listing ordered by lowercased title, then id.
    async fn search_books(&self, query: &BookQuery) -> StoreResult<Page<Book>>;

    async fn update_book(&self, id: BookId, book: &BookInput) -> StoreResult<Book>;

    /// Refused while the book has active loans; otherwise removes its
    /// reviews, returned loans and notifications.
    async fn delete_book(&self, id: BookId) -> StoreResult<()>;
}

#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Opens a loan and takes one copy off the shelf.
    ///
    /// The borrow limit and availability are checked against the policy
    /// while the member and book rows are locked, so concurrent requests
    /// cannot overshoot either.
    async fn open_loan(&self, loan: &NewLoan, policy: &LendingPolicy) -> StoreResult<Borrow>;

    async fn get_loan(&self, id: BorrowId) -> StoreResult<Borrow>;

    /// Closes a loan at `now` and puts the copy back. When `owner` is given,
    /// a loan belonging to someone else is reported as not found.
    async fn close_loan(
        &self,
        id: BorrowId,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> StoreResult<Borrow>;

    /// Extends a loan's due date by one loan period.
    async fn renew_loan(
        &self,
        id: BorrowId,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Borrow>;

    /// Loans matching the filter, newest first.
    async fn list_loans(&self, filter: &LoanFilter) -> StoreResult<Vec<Borrow>>;

    /// Returned loans of a user with the genre of each book.
    async fn finished_loans(&self, user: UserId) -> StoreResult<Vec<FinishedLoan>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Creates the user's review of a book, or updates rating and comment
    /// of the existing one.
    async fn upsert_review(&self, review: &ReviewInput) -> StoreResult<Review>;

    /// Reviews of a book, newest first.
    async fn list_reviews_for_book(&self, book: BookId) -> StoreResult<Vec<Review>>;

    /// Reviews written by a user, oldest first.
    async fn list_reviews_by_user(&self, user: UserId) -> StoreResult<Vec<Review>>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Returns `true` when a new follow was created, `false` when it existed.
    async fn follow_author(&self, user: UserId, author: AuthorId) -> StoreResult<bool>;

    /// Returns `false` when the user was not following the author.
    async fn unfollow_author(&self, user: UserId, author: AuthorId) -> StoreResult<bool>;

    /// Followed authors ordered by lowercased name.
    async fn list_follows(&self, user: UserId) -> StoreResult<Vec<FollowedAuthor>>;

    async fn list_followers(&self, author: AuthorId) -> StoreResult<Vec<UserId>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Inserts a fan-out batch atomically.
    async fn insert_notifications(
        &self,
        batch: &[NewNotification],
    ) -> StoreResult<Vec<Notification>>;

    /// Newest first.
    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
        limit: u32,
    ) -> StoreResult<Vec<Notification>>;

    /// Marks one of the user's notifications read. Someone else's
    /// notification is reported as not found.
    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> StoreResult<Notification>;

    /// Returns the number of notifications that changed.
    async fn mark_all_notifications_read(&self, user: UserId) -> StoreResult<u64>;
}

/// Everything the server needs from storage.
pub trait LibraryRepository:
    UserRepository
    + AuthorRepository
    + BookRepository
    + LoanRepository
    + ReviewRepository
    + FollowRepository
    + NotificationRepository
{
}

impl<T> LibraryRepository for T where
    T: UserRepository
        + AuthorRepository
        + BookRepository
        + LoanRepository
        + ReviewRepository
        + FollowRepository
        + NotificationRepository
{
}
