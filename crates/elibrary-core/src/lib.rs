//! Core domain for the eLibrary lending service.
//!
//! This crate holds the shared types and the pure rules of the library:
//! loan lifecycle arithmetic, catalog search helpers and reader profile
//! computation. It performs no I/O.

pub mod catalog;
pub mod error;
pub mod lending;
pub mod policy;
pub mod profile;
pub mod types;

pub use catalog::{BookQuery, Page, Pagination, normalize_name};
pub use error::{DomainError, DomainResult};
pub use policy::LendingPolicy;
pub use profile::{Badge, FinishedLoan, ReadingProfile, ReadingStats, ReviewActivity};
pub use types::*;
