//! Catalog search helpers: name normalization, paging and rating math.

use serde::{Deserialize, Serialize};

use crate::types::AuthorId;

/// Default page size for book listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default and ceiling for author listings.
pub const DEFAULT_AUTHOR_TAKE: u32 = 200;
pub const MAX_AUTHOR_TAKE: u32 = 500;

/// Default and ceiling for notification listings.
pub const DEFAULT_NOTIFICATION_TAKE: u32 = 50;
pub const MAX_NOTIFICATION_TAKE: u32 = 200;

// ============================================================================
// Names
// ============================================================================

/// Dedup key for author names: trimmed and lowercased.
///
/// "  Jane Austen " and "jane austen" normalize to the same key.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive substring test used by the in-memory store.
#[must_use]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Escapes `%`, `_` and `\` so user text is matched literally by `LIKE`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Trims optional text, mapping blank strings to `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Paging
// ============================================================================

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Builds a page request, forcing `page >= 1` and clamping the size to
    /// `[1, MAX_PAGE_SIZE]`.
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            total,
            items,
            page: pagination.page,
            page_size: pagination.page_size,
        }
    }
}

/// Clamps an optional `take` to `[1, max]`, falling back to `default`.
#[must_use]
pub fn clamp_take(take: Option<u32>, default: u32, max: u32) -> u32 {
    take.unwrap_or(default).clamp(1, max)
}

// ============================================================================
// Book search
// ============================================================================

/// Filters for a book listing. Text fields are matched case-insensitively
/// as substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Free text over title, author name, isbn and genre.
    pub text: Option<String>,
    /// Substring of the author's name.
    pub author: Option<String>,
    pub author_id: Option<AuthorId>,
    /// Substring of the genre.
    pub genre: Option<String>,
    /// Only titles with at least one copy on the shelf.
    pub available_only: bool,
    pub pagination: Pagination,
}

impl BookQuery {
    /// Trims the text filters and drops blank ones.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.text = non_blank(self.text.as_deref());
        self.author = non_blank(self.author.as_deref());
        self.genre = non_blank(self.genre.as_deref());
        self
    }

    /// Whether a book with the given fields passes the filters.
    ///
    /// Used by the in-memory store; the postgres store expresses the same
    /// predicate in SQL.
    #[must_use]
    pub fn matches(
        &self,
        title: &str,
        author_name: &str,
        author_id: AuthorId,
        isbn: &str,
        genre: Option<&str>,
        available_copies: i32,
    ) -> bool {
        let genre = genre.unwrap_or_default();
        if let Some(text) = &self.text {
            let hit = contains_ci(title, text)
                || contains_ci(author_name, text)
                || contains_ci(isbn, text)
                || contains_ci(genre, text);
            if !hit {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !contains_ci(author_name, author) {
                return false;
            }
        }
        if let Some(id) = self.author_id {
            if id != author_id {
                return false;
            }
        }
        if let Some(wanted) = &self.genre {
            if !contains_ci(genre, wanted) {
                return false;
            }
        }
        !self.available_only || available_copies > 0
    }
}

// ============================================================================
// Ratings
// ============================================================================

/// Rounds half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of the ratings rounded to 2 decimals, 0 when there are none.
#[must_use]
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    round_to(sum as f64 / ratings.len() as f64, 2)
}

/// Valid review ratings.
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

// ============================================================================
// Tests
// ============================================================================
