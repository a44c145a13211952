//! First-start seeding: the administrator account and a sample catalog.

use elibrary_core::{BookQuery, Role};
use elibrary_store::NewUser;

use crate::auth;
use crate::error::ApiResult;
use crate::services::catalog::{self, BookRequest};
use crate::state::AppState;

/// Title, author, genre, copies, isbn.
const SAMPLE_BOOKS: &[(&str, &str, &str, i32, &str)] = &[
    ("Pride and Prejudice", "Jane Austen", "Classic", 3, "9780141439600"),
    (
        "Sapiens",
        "Yuval Noah Harari",
        "History",
        2,
        "9780553386790",
    ),
];

/// Runs every configured seeding step.
pub async fn run(state: &AppState) -> ApiResult<()> {
    seed_admin(state).await?;
    if state.config().seed_sample_books {
        seed_sample_books(state).await?;
    }
    Ok(())
}

/// Creates the configured administrator when no account exists yet.
///
/// Returns whether an account was created.
pub async fn seed_admin(state: &AppState) -> ApiResult<bool> {
    let config = state.config();
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(false);
    };

    if state.repo().has_users().await? {
        tracing::debug!("Accounts exist, skipping admin bootstrap");
        return Ok(false);
    }

    let user = state
        .repo()
        .insert_user(&NewUser {
            username: username.trim().to_string(),
            password_hash: auth::hash_password(password)?,
            role: Role::Admin,
            display_name: Some("Administrator".to_string()),
            avatar_url: None,
            bio: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Bootstrapped admin account");
    Ok(true)
}

/// Adds the sample titles when the catalog is empty.
///
/// Returns how many books were created.
pub async fn seed_sample_books(state: &AppState) -> ApiResult<usize> {
    let existing = state.repo().search_books(&BookQuery::default()).await?;
    if existing.total > 0 {
        return Ok(0);
    }

    for &(title, author, genre, copies, isbn) in SAMPLE_BOOKS {
        catalog::create_book(
            state.repo(),
            state.broadcaster(),
            BookRequest {
                isbn: isbn.to_string(),
                title: title.to_string(),
                author_id: None,
                author_name: Some(author.to_string()),
                genre: Some(genre.to_string()),
                published_year: None,
                description: None,
                cover_url: None,
                total_copies: copies,
                available_copies: None,
            },
        )
        .await?;
    }

    tracing::info!(count = SAMPLE_BOOKS.len(), "Seeded sample books");
    Ok(SAMPLE_BOOKS.len())
}
