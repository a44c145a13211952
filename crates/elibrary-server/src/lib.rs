//! elibrary-server: HTTP API server for the eLibrary lending service
//!
//! This crate provides:
//! - REST API endpoints for the catalog, loans, reviews, follows and profiles
//! - JWT authentication with argon2 password hashing
//! - Server-Sent Events (SSE) for live notifications
//! - First-start seeding of the admin account and a sample catalog
//!
//! # Architecture
//!
//! Routes parse requests and delegate to `services`, which talk to storage
//! through `elibrary_store::LibraryRepository`. The server is built on Axum
//! with a middleware stack for:
//! - Request tracing and logging
//! - CORS handling
//! - Request ID generation
//! - JSON error responses
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use elibrary_server::{AppState, ServerConfig, routes};
//! use elibrary_store::MemoryStore;
//!
//! let config = ServerConfig::from_env()?;
//! let state = AppState::new(Arc::new(MemoryStore::new()), config);
//! let app = routes::build_router(state);
//! ```

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

// Re-exports for convenience
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use events::NotificationBroadcaster;
pub use state::AppState;

// Re-export dependent crates
pub use elibrary_core;
pub use elibrary_store;
