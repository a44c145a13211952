//! Books and authors: search, admin edits and the new-book fan-out.

use elibrary_core::catalog::{
    DEFAULT_AUTHOR_TAKE, MAX_AUTHOR_TAKE, clamp_take, non_blank, normalize_name,
};
use elibrary_core::{
    Author, AuthorDetails, AuthorId, AuthorSummary, Book, BookId, BookQuery, NotificationKind,
    Page, Pagination, lending,
};
use elibrary_store::{AuthorInput, BookInput, LibraryRepository, NewNotification, StoreError};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::events::NotificationBroadcaster;

// ============================================================================
// Request Types
// ============================================================================

/// Query string of `GET /api/books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookSearchParams {
    /// Free text over title, author, isbn and genre.
    pub q: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<AuthorId>,
    pub genre: Option<String>,
    #[serde(default)]
    pub available_only: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl BookSearchParams {
    pub fn into_query(self) -> BookQuery {
        BookQuery {
            text: self.q,
            author: self.author,
            author_id: self.author_id,
            genre: self.genre,
            available_only: self.available_only,
            pagination: Pagination::new(self.page, self.page_size),
        }
        .normalized()
    }
}

/// Body of book create and update.
///
/// The author is given either by id or by name; a name that matches no
/// author creates one.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRequest {
    pub isbn: String,
    pub title: String,
    pub author_id: Option<AuthorId>,
    #[serde(alias = "author")]
    pub author_name: Option<String>,
    pub genre: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub total_copies: i32,
    pub available_copies: Option<i32>,
}

/// Body of author create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRequest {
    pub name: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthorRequest {
    fn validate(&self) -> ApiResult<AuthorInput> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("author name is required"));
        }
        Ok(AuthorInput {
            name: name.to_string(),
            bio: non_blank(self.bio.as_deref()),
            photo_url: non_blank(self.photo_url.as_deref()),
        })
    }
}

/// Query string of `GET /api/authors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorListParams {
    pub q: Option<String>,
    pub take: Option<u32>,
}

// ============================================================================
// Books
// ============================================================================

pub async fn search_books(
    repo: &dyn LibraryRepository,
    params: BookSearchParams,
) -> ApiResult<Page<Book>> {
    let query = params.into_query();
    Ok(repo.search_books(&query).await?)
}

pub async fn get_book(repo: &dyn LibraryRepository, id: BookId) -> ApiResult<Book> {
    Ok(repo.get_book(id).await?)
}

/// Creates a book and notifies everyone following its author.
pub async fn create_book(
    repo: &dyn LibraryRepository,
    broadcaster: &NotificationBroadcaster,
    request: BookRequest,
) -> ApiResult<Book> {
    check_book_fields(&request)?;
    let author = resolve_author(repo, &request).await?;
    let available = lending::initial_available(request.total_copies, request.available_copies);
    let input = book_input(&request, author.id, Some(available));

    let book = repo.insert_book(&input).await?;
    tracing::info!(
        book_id = %book.id,
        author_id = %author.id,
        total_copies = book.total_copies,
        "Book created"
    );

    notify_followers(repo, broadcaster, &author, &book).await?;
    Ok(book)
}

/// Replaces a book's fields. Available copies are clamped into the new total;
/// when the request omits them the store clamps the row's live count, so a
/// loan opened meanwhile is not undone.
pub async fn update_book(
    repo: &dyn LibraryRepository,
    id: BookId,
    request: BookRequest,
) -> ApiResult<Book> {
    check_book_fields(&request)?;
    // 404 before an author can be created for a missing book.
    repo.get_book(id).await?;
    let author = resolve_author(repo, &request).await?;
    let available = request
        .available_copies
        .map(|n| lending::clamp_available(request.total_copies, n));
    let input = book_input(&request, author.id, available);

    let book = repo.update_book(id, &input).await?;
    tracing::info!(book_id = %id, "Book updated");
    Ok(book)
}

pub async fn delete_book(repo: &dyn LibraryRepository, id: BookId) -> ApiResult<()> {
    repo.delete_book(id).await?;
    tracing::info!(book_id = %id, "Book deleted");
    Ok(())
}

/// Field checks that must pass before any author is looked up or created.
fn check_book_fields(request: &BookRequest) -> ApiResult<()> {
    if request.isbn.trim().is_empty() {
        return Err(ApiError::validation("isbn is required"));
    }
    if request.title.trim().is_empty() {
        return Err(ApiError::validation("title is required"));
    }
    lending::check_total_copies(request.total_copies)?;
    Ok(())
}

fn book_input(request: &BookRequest, author_id: AuthorId, available: Option<i32>) -> BookInput {
    BookInput {
        isbn: request.isbn.trim().to_string(),
        title: request.title.trim().to_string(),
        author_id,
        genre: non_blank(request.genre.as_deref()),
        published_year: request.published_year,
        description: non_blank(request.description.as_deref()),
        cover_url: non_blank(request.cover_url.as_deref()),
        total_copies: request.total_copies,
        available_copies: available,
    }
}

/// Finds the book's author by id, or by name creating it when missing.
async fn resolve_author(repo: &dyn LibraryRepository, request: &BookRequest) -> ApiResult<Author> {
    if let Some(id) = request.author_id {
        return Ok(repo.get_author(id).await?);
    }

    let name = non_blank(request.author_name.as_deref())
        .ok_or_else(|| ApiError::validation("author_id or author_name is required"))?;
    find_or_create_author(repo, &name).await
}

pub async fn find_or_create_author(repo: &dyn LibraryRepository, name: &str) -> ApiResult<Author> {
    let normalized = normalize_name(name);
    if let Some(author) = repo.find_author_by_name(&normalized).await? {
        return Ok(author);
    }

    let input = AuthorInput {
        name: name.trim().to_string(),
        bio: None,
        photo_url: None,
    };
    match repo.insert_author(&input).await {
        Ok(author) => {
            tracing::info!(author_id = %author.id, name = %author.name, "Author created from book");
            Ok(author)
        }
        // Lost a race with a concurrent insert of the same name.
        Err(StoreError::Conflict(_)) => repo
            .find_author_by_name(&normalized)
            .await?
            .ok_or_else(|| ApiError::Internal(format!("author '{name}' vanished after conflict"))),
        Err(e) => Err(e.into()),
    }
}

async fn notify_followers(
    repo: &dyn LibraryRepository,
    broadcaster: &NotificationBroadcaster,
    author: &Author,
    book: &Book,
) -> ApiResult<()> {
    let followers = repo.list_followers(author.id).await?;
    if followers.is_empty() {
        return Ok(());
    }

    let batch: Vec<NewNotification> = followers
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            kind: NotificationKind::AuthorNewBook,
            title: format!("New book by {}", author.name),
            body: format!("\"{}\" is now in the catalog.", book.title),
            book_id: Some(book.id),
            author_id: Some(author.id),
        })
        .collect();

    let stored = repo.insert_notifications(&batch).await?;
    let pushed = broadcaster.publish_notifications(&stored).await;

    tracing::info!(
        book_id = %book.id,
        author_id = %author.id,
        followers = stored.len(),
        pushed,
        "Notified followers of new book"
    );
    Ok(())
}

// ============================================================================
// Authors
// ============================================================================

pub async fn list_authors(
    repo: &dyn LibraryRepository,
    params: AuthorListParams,
) -> ApiResult<Vec<AuthorSummary>> {
    let filter = non_blank(params.q.as_deref()).map(|q| normalize_name(&q));
    let take = clamp_take(params.take, DEFAULT_AUTHOR_TAKE, MAX_AUTHOR_TAKE);
    Ok(repo.list_authors(filter.as_deref(), take).await?)
}

pub async fn author_details(repo: &dyn LibraryRepository, id: AuthorId) -> ApiResult<AuthorDetails> {
    Ok(repo.author_details(id).await?)
}

pub async fn create_author(
    repo: &dyn LibraryRepository,
    request: AuthorRequest,
) -> ApiResult<Author> {
    let input = request.validate()?;
    let author = repo.insert_author(&input).await?;
    tracing::info!(author_id = %author.id, name = %author.name, "Author created");
    Ok(author)
}

pub async fn update_author(
    repo: &dyn LibraryRepository,
    id: AuthorId,
    request: AuthorRequest,
) -> ApiResult<Author> {
    let input = request.validate()?;
    let author = repo.update_author(id, &input).await?;
    tracing::info!(author_id = %id, "Author updated");
    Ok(author)
}

pub async fn delete_author(repo: &dyn LibraryRepository, id: AuthorId) -> ApiResult<()> {
    repo.delete_author(id).await?;
    tracing::info!(author_id = %id, "Author deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elibrary_core::catalog::DEFAULT_PAGE_SIZE;

    #[test]
    fn test_search_params_from_query_string() {
        let params: BookSearchParams =
            serde_urlencoded::from_str("q=%20dune%20&available_only=true&page=2&page_size=500")
                .unwrap();
        let query = params.into_query();
        assert_eq!(query.text.as_deref(), Some("dune"));
        assert!(query.available_only);
        assert_eq!(query.pagination.page, 2);
        assert_eq!(query.pagination.page_size, 100);
    }

    #[test]
    fn test_search_params_defaults() {
        let query = BookSearchParams::default().into_query();
        assert_eq!(query.pagination.page, 1);
        assert_eq!(query.pagination.page_size, DEFAULT_PAGE_SIZE);
        assert!(query.text.is_none());
    }

    #[test]
    fn test_book_request_accepts_author_alias() {
        let request: BookRequest = serde_json::from_str(
            r#"{"isbn":"1","title":"Emma","author":"Jane Austen","total_copies":2}"#,
        )
        .unwrap();
        assert_eq!(request.author_name.as_deref(), Some("Jane Austen"));
        assert!(request.available_copies.is_none());
    }

    #[test]
    fn test_book_input_validation() {
        let mut request = BookRequest {
            isbn: " 978 ".to_string(),
            title: "  ".to_string(),
            author_id: None,
            author_name: Some("X".to_string()),
            genre: Some(" ".to_string()),
            published_year: None,
            description: None,
            cover_url: None,
            total_copies: 1,
            available_copies: None,
        };
        assert!(check_book_fields(&request).is_err());

        request.title = " Emma ".to_string();
        check_book_fields(&request).unwrap();
        let input = book_input(&request, AuthorId::new(), Some(1));
        assert_eq!(input.isbn, "978");
        assert_eq!(input.title, "Emma");
        assert!(input.genre.is_none());

        request.total_copies = -1;
        let err = check_book_fields(&request).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_author_request_rejects_blank_name() {
        let request = AuthorRequest {
            name: "   ".to_string(),
            bio: None,
            photo_url: None,
        };
        assert!(request.validate().is_err());
    }
}
