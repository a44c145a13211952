//! Route definitions for the HTTP API.

pub mod auth;
pub mod authors;
pub mod books;
pub mod borrows;
pub mod follows;
pub mod health;
pub mod notifications;
pub mod profile;
pub mod reviews;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(users::routes())
        .merge(books::routes())
        .merge(authors::routes())
        .merge(follows::routes())
        .merge(borrows::routes())
        .merge(reviews::routes())
        .merge(notifications::routes())
        .merge(profile::routes())
        .with_state(state)
}
