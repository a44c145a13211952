//! Request-independent operations behind the routes.
//!
//! Every function takes the repository as `&dyn LibraryRepository`, so the
//! same code runs against PostgreSQL and the in-memory store.

pub mod catalog;
pub mod lending;
pub mod profile;
pub mod social;
