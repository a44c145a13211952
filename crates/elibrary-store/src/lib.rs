//! elibrary-store: Storage layer for the eLibrary lending service
//!
//! This crate provides:
//! - Repository traits, one per table family, bundled as [`LibraryRepository`]
//! - PostgreSQL storage ([`Store`]) with embedded migrations
//! - An in-memory implementation ([`MemoryStore`]) for tests and local runs
//!
//! # Usage
//!
//! ```rust,ignore
//! use elibrary_store::{BookRepository, Store, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let store = Store::connect(config).await?;
//!
//! let page = store.search_books(&BookQuery::default()).await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{
    AuthorInput, BookInput, LoanFilter, NewLoan, NewNotification, NewUser, ReviewInput,
};
pub use repository::{
    AuthorRepository, BookRepository, FollowRepository, LibraryRepository, LoanRepository,
    NotificationRepository, ReviewRepository, UserRepository,
};
pub use store::{Store, StoreConfig};

// Re-export elibrary-core for downstream crates
pub use elibrary_core;
