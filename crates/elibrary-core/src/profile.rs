//! Reader statistics and achievement badges.
//!
//! Everything is derived from finished loans and the reader's own reviews;
//! nothing here is stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::round_to;

/// Number of genres reported in the profile.
pub const TOP_GENRE_LIMIT: usize = 5;

const BOOKS_READ_THRESHOLD: usize = 5;
const HOURS_READ_THRESHOLD: f64 = 10.0;

/// A loan that has been returned, with the genre of its book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedLoan {
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: DateTime<Utc>,
    pub genre: Option<String>,
}

impl FinishedLoan {
    /// Time the book was out, in hours. Never negative.
    #[must_use]
    pub fn hours(&self) -> f64 {
        let seconds = (self.returned_at - self.borrowed_at).num_seconds().max(0);
        seconds as f64 / 3600.0
    }
}

/// A review the reader wrote, reduced to what the profile needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewActivity {
    pub rating: i32,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u32,
}

/// Aggregate reading numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub books_read: u32,
    /// Rounded to 1 decimal.
    pub hours_read: f64,
    /// Mean of the reader's own ratings, rounded to 1 decimal.
    pub average_rating: f64,
    pub reviews_written: u32,
    pub top_genres: Vec<GenreCount>,
}

/// An achievement and when it was first earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub code: String,
    pub name: String,
    pub description: String,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
}

impl Badge {
    fn new(
        code: &'static str,
        name: &'static str,
        description: &'static str,
        achieved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            achieved: achieved_at.is_some(),
            achieved_at,
        }
    }
}

/// Stats plus badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProfile {
    pub stats: ReadingStats,
    pub badges: Vec<Badge>,
}

/// Computes the reader profile.
///
/// Loans are scanned in return order so each badge records the return that
/// first crossed its threshold; input order does not matter.
#[must_use]
pub fn compute_profile(loans: &[FinishedLoan], reviews: &[ReviewActivity]) -> ReadingProfile {
    let mut ordered: Vec<&FinishedLoan> = loans.iter().collect();
    ordered.sort_by_key(|loan| loan.returned_at);

    let mut total_hours = 0.0;
    let mut bookworm_at = None;
    let mut timekeeper_at = None;
    for (index, loan) in ordered.iter().enumerate() {
        total_hours += loan.hours();
        if bookworm_at.is_none() && index + 1 >= BOOKS_READ_THRESHOLD {
            bookworm_at = Some(loan.returned_at);
        }
        if timekeeper_at.is_none() && total_hours >= HOURS_READ_THRESHOLD {
            timekeeper_at = Some(loan.returned_at);
        }
    }

    let critic_at = reviews.iter().map(|r| r.created).min();

    let average_rating = if reviews.is_empty() {
        0.0
    } else {
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        round_to(sum as f64 / reviews.len() as f64, 1)
    };

    let stats = ReadingStats {
        books_read: u32::try_from(loans.len()).unwrap_or(u32::MAX),
        hours_read: round_to(total_hours, 1),
        average_rating,
        reviews_written: u32::try_from(reviews.len()).unwrap_or(u32::MAX),
        top_genres: top_genres(loans),
    };

    let badges = vec![
        Badge::new("books_5", "Bookworm I", "Read 5 books", bookworm_at),
        Badge::new("hours_10", "Timekeeper I", "Read for 10 hours", timekeeper_at),
        Badge::new(
            "first_review",
            "Critic I",
            "Write your first review",
            critic_at,
        ),
    ];

    ReadingProfile { stats, badges }
}

/// Non-empty genres ranked by frequency, then name.
#[must_use]
pub fn top_genres(loans: &[FinishedLoan]) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for genre in loans
        .iter()
        .filter_map(|loan| loan.genre.as_deref())
        .map(str::trim)
        .filter(|g| !g.is_empty())
    {
        *counts.entry(genre).or_default() += 1;
    }

    let mut ranked: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    ranked.truncate(TOP_GENRE_LIMIT);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    }

    fn finished(day: i64, hours: i64, genre: Option<&str>) -> FinishedLoan {
        let borrowed_at = base() + Duration::days(day);
        FinishedLoan {
            borrowed_at,
            returned_at: borrowed_at + Duration::hours(hours),
            genre: genre.map(str::to_string),
        }
    }

    fn badge<'a>(profile: &'a ReadingProfile, code: &str) -> &'a Badge {
        profile.badges.iter().find(|b| b.code == code).unwrap()
    }

    #[test]
    fn empty_profile() {
        let profile = compute_profile(&[], &[]);
        assert_eq!(profile.stats.books_read, 0);
        assert_eq!(profile.stats.hours_read, 0.0);
        assert_eq!(profile.stats.average_rating, 0.0);
        assert!(profile.stats.top_genres.is_empty());
        assert_eq!(profile.badges.len(), 3);
        assert!(profile.badges.iter().all(|b| !b.achieved));
    }

    #[test]
    fn top_genres_rank_by_count_then_name() {
        let loans = vec![
            finished(0, 1, Some("Sci-Fi")),
            finished(1, 1, Some("History")),
            finished(2, 1, Some("Sci-Fi")),
            finished(3, 1, Some("  ")),
            finished(4, 1, None),
            finished(5, 1, Some("Art")),
        ];
        let genres = top_genres(&loans);
        assert_eq!(genres[0].genre, "Sci-Fi");
        assert_eq!(genres[0].count, 2);
        assert_eq!(genres[1].genre, "Art");
        assert_eq!(genres[2].genre, "History");
        assert_eq!(genres.len(), 3);
    }

    #[test]
    fn top_genres_truncated() {
        let names = ["A", "B", "C", "D", "E", "F", "G"];
        let loans: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, g)| finished(i as i64, 1, Some(g)))
            .collect();
        assert_eq!(top_genres(&loans).len(), TOP_GENRE_LIMIT);
    }

    #[test]
    fn bookworm_awarded_at_fifth_return() {
        let loans: Vec<_> = (0..6).map(|d| finished(d, 1, None)).collect();
        let profile = compute_profile(&loans, &[]);
        let bookworm = badge(&profile, "books_5");
        assert!(bookworm.achieved);
        assert_eq!(bookworm.achieved_at, Some(loans[4].returned_at));
        assert_eq!(profile.stats.books_read, 6);
    }

    #[test]
    fn bookworm_uses_return_order_not_input_order() {
        let mut loans: Vec<_> = (0..5).map(|d| finished(d, 1, None)).collect();
        loans.reverse();
        let profile = compute_profile(&loans, &[]);
        assert_eq!(
            badge(&profile, "books_5").achieved_at,
            Some(loans[0].returned_at)
        );
    }

    #[test]
    fn timekeeper_awarded_when_running_total_reaches_ten() {
        let loans = vec![
            finished(0, 4, None),
            finished(1, 5, None),
            finished(2, 1, None),
            finished(3, 8, None),
        ];
        let profile = compute_profile(&loans, &[]);
        let timekeeper = badge(&profile, "hours_10");
        assert_eq!(timekeeper.achieved_at, Some(loans[2].returned_at));
        assert_eq!(profile.stats.hours_read, 18.0);
        assert!(!badge(&profile, "books_5").achieved);
    }

    #[test]
    fn hours_rounded_to_one_decimal() {
        let borrowed_at = base();
        let loans = vec![FinishedLoan {
            borrowed_at,
            returned_at: borrowed_at + Duration::minutes(100),
            genre: None,
        }];
        let profile = compute_profile(&loans, &[]);
        assert_eq!(profile.stats.hours_read, 1.7);
    }

    #[test]
    fn critic_uses_earliest_review() {
        let reviews = vec![
            ReviewActivity {
                rating: 5,
                created: base() + Duration::days(3),
            },
            ReviewActivity {
                rating: 4,
                created: base() + Duration::days(1),
            },
            ReviewActivity {
                rating: 4,
                created: base() + Duration::days(2),
            },
        ];
        let profile = compute_profile(&[], &reviews);
        let critic = badge(&profile, "first_review");
        assert_eq!(critic.name, "Critic I");
        assert_eq!(critic.achieved_at, Some(base() + Duration::days(1)));
        assert_eq!(profile.stats.average_rating, 4.3);
        assert_eq!(profile.stats.reviews_written, 3);
    }
}
