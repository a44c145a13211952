//! In-memory store.
//!
//! Implements every repository trait over hash maps behind one
//! `tokio::sync::Mutex`. Each operation takes the lock once, so multi-row
//! writes are as atomic here as they are in a PostgreSQL transaction. Used by
//! the API tests and by `STORAGE_BACKEND=memory` for local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elibrary_core::catalog::average_rating;
use elibrary_core::{
    Author, AuthorDetails, AuthorId, AuthorSummary, Book, BookId, BookQuery, Borrow, BorrowId,
    BorrowStatus, FinishedLoan, FollowedAuthor, LendingPolicy, Notification, NotificationId, Page,
    Review, ReviewId, User, UserId, lending, normalize_name,
};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    AuthorInput, BookInput, LoanFilter, NewLoan, NewNotification, NewUser, ReviewInput,
};
use crate::repository::{
    AuthorRepository, BookRepository, FollowRepository, LoanRepository, NotificationRepository,
    ReviewRepository, UserRepository,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    authors: HashMap<AuthorId, Author>,
    books: HashMap<BookId, Book>,
    borrows: HashMap<BorrowId, Borrow>,
    reviews: HashMap<ReviewId, Review>,
    follows: HashMap<(UserId, AuthorId), DateTime<Utc>>,
    notifications: HashMap<NotificationId, Notification>,
}

impl Tables {
    /// Book with its author name and review aggregates filled in.
    fn book_view(&self, book: &Book) -> Book {
        let ratings: Vec<i32> = self
            .reviews
            .values()
            .filter(|r| r.book_id == book.id)
            .map(|r| r.rating)
            .collect();
        let mut view = book.clone();
        if let Some(author) = self.authors.get(&book.author_id) {
            view.author_name = author.name.clone();
        }
        view.average_rating = average_rating(&ratings);
        view.review_count = ratings.len() as i64;
        view
    }

    fn borrow_view(&self, borrow: &Borrow) -> Borrow {
        let mut view = borrow.clone();
        if let Some(book) = self.books.get(&borrow.book_id) {
            view.book_title = book.title.clone();
        }
        view
    }

    fn review_view(&self, review: &Review) -> Review {
        let mut view = review.clone();
        if let Some(user) = self.users.get(&review.user_id) {
            view.username = user.username.clone();
        }
        view
    }

    fn books_by(&self, author: AuthorId) -> impl Iterator<Item = &Book> {
        self.books.values().filter(move |b| b.author_id == author)
    }

    fn name_taken(&self, normalized: &str, except: Option<AuthorId>) -> bool {
        self.authors
            .values()
            .any(|a| a.name_normalized == normalized && Some(a.id) != except)
    }

    fn active_loans(&self, user: UserId) -> i64 {
        self.borrows
            .values()
            .filter(|b| b.user_id == user && b.is_active())
            .count() as i64
    }
}

/// In-memory implementation of [`crate::LibraryRepository`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        let created = User {
            id: UserId::new(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            created: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let tables = self.tables.lock().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn has_users(&self) -> StoreResult<bool> {
        Ok(!self.tables.lock().await.users.is_empty())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::not_found("user", id));
        }

        let open: Vec<BookId> = tables
            .borrows
            .values()
            .filter(|b| b.user_id == id && b.is_active())
            .map(|b| b.book_id)
            .collect();
        for book_id in open {
            if let Some(book) = tables.books.get_mut(&book_id) {
                book.available_copies = (book.available_copies + 1).min(book.total_copies);
            }
        }

        tables.notifications.retain(|_, n| n.user_id != id);
        tables.follows.retain(|(user, _), _| *user != id);
        tables.reviews.retain(|_, r| r.user_id != id);
        tables.borrows.retain(|_, b| b.user_id != id);
        tables.users.remove(&id);
        Ok(())
    }
}

// ==================== Author Operations ====================

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn insert_author(&self, author: &AuthorInput) -> StoreResult<Author> {
        let mut tables = self.tables.lock().await;
        let name = author.name.trim();
        let normalized = normalize_name(name);
        if tables.name_taken(&normalized, None) {
            return Err(StoreError::Conflict(format!(
                "author '{}' already exists",
                name
            )));
        }
        let created = Author {
            id: AuthorId::new(),
            name: name.to_string(),
            name_normalized: normalized,
            bio: author.bio.clone(),
            photo_url: author.photo_url.clone(),
            created: Utc::now(),
        };
        tables.authors.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_author(&self, id: AuthorId) -> StoreResult<Author> {
        let tables = self.tables.lock().await;
        tables
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("author", id))
    }

    async fn find_author_by_name(&self, normalized: &str) -> StoreResult<Option<Author>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .authors
            .values()
            .find(|a| a.name_normalized == normalized)
            .cloned())
    }

    async fn list_authors(
        &self,
        filter: Option<&str>,
        take: u32,
    ) -> StoreResult<Vec<AuthorSummary>> {
        let tables = self.tables.lock().await;
        let needle = filter.map(normalize_name);
        let mut authors: Vec<&Author> = tables
            .authors
            .values()
            .filter(|a| {
                needle
                    .as_deref()
                    .is_none_or(|n| a.name_normalized.contains(n))
            })
            .collect();
        authors.sort_by_cached_key(|a| (a.name.to_lowercase(), a.id));

        Ok(authors
            .into_iter()
            .take(take as usize)
            .map(|a| AuthorSummary {
                id: a.id,
                name: a.name.clone(),
                photo_url: a.photo_url.clone(),
                books_count: tables.books_by(a.id).count() as i64,
            })
            .collect())
    }

    async fn author_details(&self, id: AuthorId) -> StoreResult<AuthorDetails> {
        let tables = self.tables.lock().await;
        let author = tables
            .authors
            .get(&id)
            .ok_or_else(|| StoreError::not_found("author", id))?;
        let years: Vec<i32> = tables.books_by(id).filter_map(|b| b.published_year).collect();
        Ok(AuthorDetails {
            id,
            name: author.name.clone(),
            bio: author.bio.clone(),
            photo_url: author.photo_url.clone(),
            books_count: tables.books_by(id).count() as i64,
            first_year: years.iter().copied().min(),
            last_year: years.iter().copied().max(),
        })
    }

    async fn update_author(&self, id: AuthorId, author: &AuthorInput) -> StoreResult<Author> {
        let mut tables = self.tables.lock().await;
        let name = author.name.trim();
        let normalized = normalize_name(name);
        if !tables.authors.contains_key(&id) {
            return Err(StoreError::not_found("author", id));
        }
        if tables.name_taken(&normalized, Some(id)) {
            return Err(StoreError::Conflict(format!(
                "another author is named '{}'",
                name
            )));
        }
        let entry = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("author", id))?;
        entry.name = name.to_string();
        entry.name_normalized = normalized;
        entry.bio = author.bio.clone();
        entry.photo_url = author.photo_url.clone();
        Ok(entry.clone())
    }

    async fn delete_author(&self, id: AuthorId) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.authors.contains_key(&id) {
            return Err(StoreError::not_found("author", id));
        }
        if tables.books_by(id).next().is_some() {
            return Err(StoreError::Restricted(format!(
                "author {} still has books in the catalog",
                id
            )));
        }
        tables.follows.retain(|(_, author), _| *author != id);
        for notification in tables.notifications.values_mut() {
            if notification.author_id == Some(id) {
                notification.author_id = None;
            }
        }
        tables.authors.remove(&id);
        Ok(())
    }
}

// ==================== Book Operations ====================

#[async_trait]
impl BookRepository for MemoryStore {
    async fn insert_book(&self, book: &BookInput) -> StoreResult<Book> {
        let mut tables = self.tables.lock().await;
        if !tables.authors.contains_key(&book.author_id) {
            return Err(StoreError::not_found("author", book.author_id));
        }
        let created = Book {
            id: BookId::new(),
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author_id: book.author_id,
            author_name: String::new(),
            genre: book.genre.clone(),
            published_year: book.published_year,
            description: book.description.clone(),
            cover_url: book.cover_url.clone(),
            total_copies: book.total_copies,
            available_copies: book.available_copies.unwrap_or(book.total_copies),
            average_rating: 0.0,
            review_count: 0,
            created: Utc::now(),
            updated: None,
        };
        tables.books.insert(created.id, created.clone());
        Ok(tables.book_view(&created))
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Book> {
        let tables = self.tables.lock().await;
        tables
            .books
            .get(&id)
            .map(|b| tables.book_view(b))
            .ok_or_else(|| StoreError::not_found("book", id))
    }

    async fn search_books(&self, query: &BookQuery) -> StoreResult<Page<Book>> {
        let tables = self.tables.lock().await;
        let mut matches: Vec<Book> = tables
            .books
            .values()
            .map(|b| tables.book_view(b))
            .filter(|b| {
                query.matches(
                    &b.title,
                    &b.author_name,
                    b.author_id,
                    &b.isbn,
                    b.genre.as_deref(),
                    b.available_copies,
                )
            })
            .collect();
        // Lowercased code-point order, like `LOWER(..) COLLATE "C"` in Postgres.
        matches.sort_by_cached_key(|b| (b.title.to_lowercase(), b.id));

        let total = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(query.pagination.offset() as usize)
            .take(query.pagination.limit() as usize)
            .collect();
        Ok(Page::new(items, total, query.pagination))
    }

    async fn update_book(&self, id: BookId, book: &BookInput) -> StoreResult<Book> {
        let mut tables = self.tables.lock().await;
        if !tables.authors.contains_key(&book.author_id) {
            return Err(StoreError::not_found("author", book.author_id));
        }
        let entry = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("book", id))?;
        entry.isbn = book.isbn.clone();
        entry.title = book.title.clone();
        entry.author_id = book.author_id;
        entry.genre = book.genre.clone();
        entry.published_year = book.published_year;
        entry.description = book.description.clone();
        entry.cover_url = book.cover_url.clone();
        entry.total_copies = book.total_copies;
        entry.available_copies = book
            .available_copies
            .unwrap_or(entry.available_copies)
            .clamp(0, book.total_copies.max(0));
        entry.updated = Some(Utc::now());
        let updated = entry.clone();
        Ok(tables.book_view(&updated))
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.books.contains_key(&id) {
            return Err(StoreError::not_found("book", id));
        }
        if tables
            .borrows
            .values()
            .any(|b| b.book_id == id && b.is_active())
        {
            return Err(StoreError::Restricted(format!(
                "book {} has copies out on loan",
                id
            )));
        }
        tables.reviews.retain(|_, r| r.book_id != id);
        tables.borrows.retain(|_, b| b.book_id != id);
        tables.notifications.retain(|_, n| n.book_id != Some(id));
        tables.books.remove(&id);
        Ok(())
    }
}

// ==================== Loan Operations ====================

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn open_loan(&self, loan: &NewLoan, policy: &LendingPolicy) -> StoreResult<Borrow> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&loan.user_id) {
            return Err(StoreError::not_found("user", loan.user_id));
        }
        lending::check_borrow_limit(policy, tables.active_loans(loan.user_id))?;

        let book = tables
            .books
            .get_mut(&loan.book_id)
            .ok_or_else(|| StoreError::not_found("book", loan.book_id))?;
        lending::check_availability(book.available_copies)?;
        book.available_copies -= 1;
        let book_title = book.title.clone();

        let borrow = Borrow {
            id: BorrowId::new(),
            user_id: loan.user_id,
            book_id: loan.book_id,
            book_title,
            borrowed_at: loan.borrowed_at,
            due_at: loan.due_at,
            returned_at: None,
            status: BorrowStatus::Borrowed,
            notes: loan.notes.clone(),
            renewal_count: 0,
            last_renewed_at: None,
        };
        tables.borrows.insert(borrow.id, borrow.clone());
        Ok(borrow)
    }

    async fn get_loan(&self, id: BorrowId) -> StoreResult<Borrow> {
        let tables = self.tables.lock().await;
        tables
            .borrows
            .get(&id)
            .map(|b| tables.borrow_view(b))
            .ok_or_else(|| StoreError::not_found("borrow", id))
    }

    async fn close_loan(
        &self,
        id: BorrowId,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> StoreResult<Borrow> {
        let mut tables = self.tables.lock().await;
        let borrow = tables
            .borrows
            .get_mut(&id)
            .filter(|b| owner.is_none_or(|user| user == b.user_id))
            .ok_or_else(|| StoreError::not_found("borrow", id))?;

        let closure = lending::close_loan(borrow, now)?;
        borrow.returned_at = Some(closure.returned_at);
        borrow.status = closure.status;
        let closed = borrow.clone();

        if let Some(book) = tables.books.get_mut(&closed.book_id) {
            book.available_copies = (book.available_copies + 1).min(book.total_copies);
        }
        Ok(tables.borrow_view(&closed))
    }

    async fn renew_loan(
        &self,
        id: BorrowId,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Borrow> {
        let mut tables = self.tables.lock().await;
        let borrow = tables
            .borrows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("borrow", id))?;

        let renewal = lending::renew_loan(policy, borrow, now)?;
        borrow.due_at = renewal.due_at;
        borrow.renewal_count = renewal.renewal_count;
        borrow.last_renewed_at = Some(renewal.renewed_at);
        let renewed = borrow.clone();
        Ok(tables.borrow_view(&renewed))
    }

    async fn list_loans(&self, filter: &LoanFilter) -> StoreResult<Vec<Borrow>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<Borrow> = tables
            .borrows
            .values()
            .filter(|b| filter.matches(b))
            .map(|b| tables.borrow_view(b))
            .collect();
        loans.sort_by(|a, b| b.borrowed_at.cmp(&a.borrowed_at));
        Ok(loans)
    }

    async fn finished_loans(&self, user: UserId) -> StoreResult<Vec<FinishedLoan>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<FinishedLoan> = tables
            .borrows
            .values()
            .filter(|b| b.user_id == user)
            .filter_map(|b| {
                let returned_at = b.returned_at?;
                Some(FinishedLoan {
                    borrowed_at: b.borrowed_at,
                    returned_at,
                    genre: tables.books.get(&b.book_id).and_then(|bk| bk.genre.clone()),
                })
            })
            .collect();
        loans.sort_by_key(|l| l.returned_at);
        Ok(loans)
    }
}

// ==================== Review Operations ====================

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn upsert_review(&self, review: &ReviewInput) -> StoreResult<Review> {
        let mut tables = self.tables.lock().await;
        if !tables.books.contains_key(&review.book_id) {
            return Err(StoreError::not_found("book", review.book_id));
        }
        let now = Utc::now();
        let existing = tables
            .reviews
            .values_mut()
            .find(|r| r.user_id == review.user_id && r.book_id == review.book_id);

        let stored = match existing {
            Some(r) => {
                r.rating = review.rating;
                r.comment = review.comment.clone();
                r.updated = Some(now);
                r.clone()
            }
            None => {
                let created = Review {
                    id: ReviewId::new(),
                    user_id: review.user_id,
                    book_id: review.book_id,
                    username: String::new(),
                    rating: review.rating,
                    comment: review.comment.clone(),
                    created: now,
                    updated: None,
                };
                tables.reviews.insert(created.id, created.clone());
                created
            }
        };
        Ok(tables.review_view(&stored))
    }

    async fn list_reviews_for_book(&self, book: BookId) -> StoreResult<Vec<Review>> {
        let tables = self.tables.lock().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.book_id == book)
            .map(|r| tables.review_view(r))
            .collect();
        reviews.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(reviews)
    }

    async fn list_reviews_by_user(&self, user: UserId) -> StoreResult<Vec<Review>> {
        let tables = self.tables.lock().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.user_id == user)
            .map(|r| tables.review_view(r))
            .collect();
        reviews.sort_by_key(|r| r.created);
        Ok(reviews)
    }
}

// ==================== Follow Operations ====================

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn follow_author(&self, user: UserId, author: AuthorId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.authors.contains_key(&author) {
            return Err(StoreError::not_found("author", author));
        }
        if tables.follows.contains_key(&(user, author)) {
            return Ok(false);
        }
        tables.follows.insert((user, author), Utc::now());
        Ok(true)
    }

    async fn unfollow_author(&self, user: UserId, author: AuthorId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.follows.remove(&(user, author)).is_some())
    }

    async fn list_follows(&self, user: UserId) -> StoreResult<Vec<FollowedAuthor>> {
        let tables = self.tables.lock().await;
        let mut follows: Vec<FollowedAuthor> = tables
            .follows
            .iter()
            .filter(|((u, _), _)| *u == user)
            .filter_map(|((_, author_id), created)| {
                tables.authors.get(author_id).map(|a| FollowedAuthor {
                    author_id: a.id,
                    name: a.name.clone(),
                    followed_at: *created,
                })
            })
            .collect();
        follows.sort_by_cached_key(|f| (f.name.to_lowercase(), f.author_id));
        Ok(follows)
    }

    async fn list_followers(&self, author: AuthorId) -> StoreResult<Vec<UserId>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .keys()
            .filter(|(_, a)| *a == author)
            .map(|(u, _)| *u)
            .collect())
    }
}

// ==================== Notification Operations ====================

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notifications(
        &self,
        batch: &[NewNotification],
    ) -> StoreResult<Vec<Notification>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let created: Vec<Notification> = batch
            .iter()
            .map(|item| Notification {
                id: NotificationId::new(),
                user_id: item.user_id,
                kind: item.kind,
                title: item.title.clone(),
                body: item.body.clone(),
                book_id: item.book_id,
                author_id: item.author_id,
                is_read: false,
                created: now,
            })
            .collect();
        for notification in &created {
            tables
                .notifications
                .insert(notification.id, notification.clone());
        }
        Ok(created)
    }

    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
        limit: u32,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created.cmp(&a.created));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> StoreResult<Notification> {
        let mut tables = self.tables.lock().await;
        let notification = tables
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == user)
            .ok_or_else(|| StoreError::not_found("notification", id))?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn mark_all_notifications_read(&self, user: UserId) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut changed = 0;
        for notification in tables.notifications.values_mut() {
            if notification.user_id == user && !notification.is_read {
                notification.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
