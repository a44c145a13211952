//! Reviews, author follows and notification inboxes.

use elibrary_core::catalog::{
    DEFAULT_NOTIFICATION_TAKE, MAX_NOTIFICATION_TAKE, RATING_RANGE, clamp_take, non_blank,
    normalize_name,
};
use elibrary_core::{
    Author, AuthorId, BookId, FollowedAuthor, Notification, NotificationId, Review, UserId,
};
use elibrary_store::{LibraryRepository, ReviewInput};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// Reviews
// ============================================================================

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub book_id: BookId,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Creates the caller's review of a book or replaces its rating and comment.
pub async fn upsert_review(
    repo: &dyn LibraryRepository,
    user_id: UserId,
    request: ReviewRequest,
) -> ApiResult<Review> {
    if !RATING_RANGE.contains(&request.rating) {
        return Err(ApiError::validation(format!(
            "rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }
    repo.get_book(request.book_id).await?;

    let review = repo
        .upsert_review(&ReviewInput {
            user_id,
            book_id: request.book_id,
            rating: request.rating,
            comment: non_blank(request.comment.as_deref()),
        })
        .await?;

    tracing::info!(
        review_id = %review.id,
        user_id = %user_id,
        book_id = %request.book_id,
        rating = review.rating,
        "Review saved"
    );
    Ok(review)
}

/// Reviews of a book, newest first.
pub async fn reviews_for_book(repo: &dyn LibraryRepository, book_id: BookId) -> ApiResult<Vec<Review>> {
    Ok(repo.list_reviews_for_book(book_id).await?)
}

// ============================================================================
// Follows
// ============================================================================

/// Body of `POST /api/follows`: an author id or an author name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowRequest {
    pub author_id: Option<AuthorId>,
    pub author_name: Option<String>,
}

/// How a client names an author in follow requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorKey {
    Id(AuthorId),
    Name(String),
}

impl AuthorKey {
    /// A path segment is an id when it parses as a UUID and a name otherwise.
    pub fn parse(key: &str) -> Self {
        match Uuid::parse_str(key.trim()) {
            Ok(id) => Self::Id(AuthorId::from_uuid(id)),
            Err(_) => Self::Name(key.to_string()),
        }
    }
}

impl TryFrom<FollowRequest> for AuthorKey {
    type Error = ApiError;

    fn try_from(request: FollowRequest) -> Result<Self, Self::Error> {
        if let Some(id) = request.author_id.filter(|id| !id.0.is_nil()) {
            return Ok(Self::Id(id));
        }
        non_blank(request.author_name.as_deref())
            .map(Self::Name)
            .ok_or_else(|| ApiError::validation("author_id or author_name is required"))
    }
}

async fn find_author(repo: &dyn LibraryRepository, key: &AuthorKey) -> ApiResult<Author> {
    match key {
        AuthorKey::Id(id) => Ok(repo.get_author(*id).await?),
        AuthorKey::Name(name) => repo
            .find_author_by_name(&normalize_name(name))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("author '{}' not found", name.trim()))),
    }
}

/// Follows an author. Following twice is not an error.
pub async fn follow(
    repo: &dyn LibraryRepository,
    user_id: UserId,
    key: AuthorKey,
) -> ApiResult<Author> {
    let author = find_author(repo, &key).await?;
    let created = repo.follow_author(user_id, author.id).await?;
    tracing::info!(user_id = %user_id, author_id = %author.id, created, "Author followed");
    Ok(author)
}

pub async fn unfollow(repo: &dyn LibraryRepository, user_id: UserId, key: AuthorKey) -> ApiResult<()> {
    let author = find_author(repo, &key).await?;
    if !repo.unfollow_author(user_id, author.id).await? {
        return Err(ApiError::NotFound(format!(
            "not following author '{}'",
            author.name
        )));
    }
    tracing::info!(user_id = %user_id, author_id = %author.id, "Author unfollowed");
    Ok(())
}

pub async fn follows(repo: &dyn LibraryRepository, user_id: UserId) -> ApiResult<Vec<FollowedAuthor>> {
    Ok(repo.list_follows(user_id).await?)
}

// ============================================================================
// Notifications
// ============================================================================

/// Query string of `GET /api/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListParams {
    #[serde(default)]
    pub unread_only: bool,
    pub take: Option<u32>,
}

pub async fn notifications(
    repo: &dyn LibraryRepository,
    user_id: UserId,
    params: NotificationListParams,
) -> ApiResult<Vec<Notification>> {
    let take = clamp_take(params.take, DEFAULT_NOTIFICATION_TAKE, MAX_NOTIFICATION_TAKE);
    Ok(repo
        .list_notifications(user_id, params.unread_only, take)
        .await?)
}

pub async fn mark_read(
    repo: &dyn LibraryRepository,
    user_id: UserId,
    id: NotificationId,
) -> ApiResult<Notification> {
    Ok(repo.mark_notification_read(user_id, id).await?)
}

/// Returns how many notifications changed.
pub async fn mark_all_read(repo: &dyn LibraryRepository, user_id: UserId) -> ApiResult<u64> {
    let updated = repo.mark_all_notifications_read(user_id).await?;
    tracing::debug!(user_id = %user_id, updated, "Marked notifications read");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_key_parse() {
        let id = Uuid::new_v4();
        assert_eq!(
            AuthorKey::parse(&id.to_string()),
            AuthorKey::Id(AuthorId::from_uuid(id))
        );
        assert_eq!(
            AuthorKey::parse("Jane Austen"),
            AuthorKey::Name("Jane Austen".to_string())
        );
    }

    #[test]
    fn test_follow_request_prefers_id() {
        let id = AuthorId::new();
        let key = AuthorKey::try_from(FollowRequest {
            author_id: Some(id),
            author_name: Some("ignored".to_string()),
        })
        .unwrap();
        assert_eq!(key, AuthorKey::Id(id));
    }

    #[test]
    fn test_follow_request_nil_id_falls_back_to_name() {
        let key = AuthorKey::try_from(FollowRequest {
            author_id: Some(AuthorId::from_uuid(Uuid::nil())),
            author_name: Some("  Ursula K. Le Guin ".to_string()),
        })
        .unwrap();
        assert_eq!(key, AuthorKey::Name("Ursula K. Le Guin".to_string()));
    }

    #[test]
    fn test_follow_request_requires_author() {
        let err = AuthorKey::try_from(FollowRequest::default()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let store = elibrary_store::MemoryStore::new();
        let err = upsert_review(
            &store,
            UserId::new(),
            ReviewRequest {
                book_id: BookId::new(),
                rating: 6,
                comment: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
