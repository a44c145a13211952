//! Core data types for the eLibrary lending service.
//!
//! These are the domain shapes shared by the store, the HTTP server and the
//! pure rule modules. Rows coming out of the database are converted into these
//! types at the repository boundary, so nothing above the store sees SQL types.
//!
//! All types derive `Debug`, `Clone`, `Serialize`, and `Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier gets `new`, `from_uuid`, `as_uuid`, `Display`, `FromStr`
/// and transparent serde so that it travels as a plain UUID string on the wire.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random identifier using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a library member or administrator.
    UserId
);
uuid_id!(
    /// Unique identifier for a catalog title.
    BookId
);
uuid_id!(
    /// Unique identifier for an author record.
    AuthorId
);
uuid_id!(
    /// Unique identifier for a loan record.
    BorrowId
);
uuid_id!(
    /// Unique identifier for a review.
    ReviewId
);
uuid_id!(
    /// Unique identifier for a notification.
    NotificationId
);

// ============================================================================
// Enumerations
// ============================================================================

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Account role. Admins manage the catalog and see every loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "User" => Ok(Self::User),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Loan status. A loan is `Borrowed` until it is returned; the return stamps
/// either `Returned` or `Overdue` depending on the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl BorrowStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Borrowed => "Borrowed",
            Self::Returned => "Returned",
            Self::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorrowStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Borrowed" => Ok(Self::Borrowed),
            "Returned" => Ok(Self::Returned),
            "Overdue" => Ok(Self::Overdue),
            other => Err(ParseEnumError {
                kind: "borrow status",
                value: other.to_string(),
            }),
        }
    }
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A followed author has a new title in the catalog.
    AuthorNewBook,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorNewBook => "author_new_book",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author_new_book" => Ok(Self::AuthorNewBook),
            other => Err(ParseEnumError {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Core Domain Types
// ============================================================================

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2 PHC string. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created: DateTime<Utc>,
}

/// An author record. `name_normalized` is the case-insensitive dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub name_normalized: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub created: DateTime<Utc>,
}

/// An author as shown in pickers and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub name: String,
    pub photo_url: Option<String>,
    pub books_count: i64,
}

/// Author page: the record plus catalog statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorDetails {
    pub id: AuthorId,
    pub name: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub books_count: i64,
    /// Earliest published year across the author's books.
    pub first_year: Option<i32>,
    /// Latest published year across the author's books.
    pub last_year: Option<i32>,
}

/// A catalog title with its read-time projections.
///
/// `author_name` is resolved from the referenced author when the row is read;
/// it is not stored on the book. `average_rating` and `review_count` are
/// aggregated from reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub author_id: AuthorId,
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
}

impl Book {
    /// Whether at least one copy can be lent right now.
    #[must_use]
    pub fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }
}

/// A loan record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrow {
    pub id: BorrowId,
    pub user_id: UserId,
    pub book_id: BookId,
    /// Title of the borrowed book, projected at read time.
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub notes: Option<String>,
    pub renewal_count: i32,
    pub last_renewed_at: Option<DateTime<Utc>>,
}

impl Borrow {
    /// An active loan has not been returned yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Active and past its due date.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.due_at
    }
}

/// A rating (1..=5) with an optional comment. One per (user, book).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    /// Reviewer username, projected at read time.
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
}

/// An author the user follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowedAuthor {
    pub author_id: AuthorId,
    pub name: String,
    pub followed_at: DateTime<Utc>,
}

/// A message delivered to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub book_id: Option<BookId>,
    pub author_id: Option<AuthorId>,
    pub is_read: bool,
    pub created: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn book_id_display_fromstr() {
        let id = BookId::new();
        let parsed: BookId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_serialize_as_plain_uuid() {
        let id = UserId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn borrow_status_parse_and_display() {
        for status in [
            BorrowStatus::Borrowed,
            BorrowStatus::Returned,
            BorrowStatus::Overdue,
        ] {
            assert_eq!(status.as_str().parse::<BorrowStatus>().unwrap(), status);
        }
        assert!("Lost".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn notification_kind_wire_name() {
        let json = serde_json::to_string(&NotificationKind::AuthorNewBook).unwrap();
        assert_eq!(json, "\"author_new_book\"");
        assert_eq!(
            "author_new_book".parse::<NotificationKind>().unwrap(),
            NotificationKind::AuthorNewBook
        );
    }

    #[test]
    fn user_password_hash_not_serialized() {
        let user = User {
            id: UserId::new(),
            username: "reader".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::User,
            display_name: None,
            avatar_url: None,
            bio: None,
            created: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("reader"));
    }

    #[test]
    fn borrow_overdue_only_while_active() {
        let now = Utc::now();
        let mut borrow = Borrow {
            id: BorrowId::new(),
            user_id: UserId::new(),
            book_id: BookId::new(),
            book_title: "Sapiens".to_string(),
            borrowed_at: now - Duration::days(20),
            due_at: now - Duration::days(6),
            returned_at: None,
            status: BorrowStatus::Borrowed,
            notes: None,
            renewal_count: 0,
            last_renewed_at: None,
        };
        assert!(borrow.is_active());
        assert!(borrow.is_overdue(now));

        borrow.returned_at = Some(now);
        assert!(!borrow.is_overdue(now));
    }
}
