//! Reader profile: the account plus statistics and badges derived from
//! finished loans and written reviews.

use elibrary_core::profile::compute_profile;
use elibrary_core::{Badge, ReadingStats, ReviewActivity, User, UserId};
use elibrary_store::LibraryRepository;
use serde::Serialize;

use crate::error::ApiResult;

/// Body of `GET /api/profile/me`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: ReadingStats,
    pub badges: Vec<Badge>,
}

pub async fn reader_profile(
    repo: &dyn LibraryRepository,
    user_id: UserId,
) -> ApiResult<ProfileResponse> {
    let user = repo.get_user(user_id).await?;
    let loans = repo.finished_loans(user_id).await?;
    let reviews: Vec<ReviewActivity> = repo
        .list_reviews_by_user(user_id)
        .await?
        .into_iter()
        .map(|review| ReviewActivity {
            rating: review.rating,
            created: review.created,
        })
        .collect();

    let profile = compute_profile(&loans, &reviews);
    tracing::debug!(
        user_id = %user_id,
        books_read = profile.stats.books_read,
        "Computed reader profile"
    );

    Ok(ProfileResponse {
        user,
        stats: profile.stats,
        badges: profile.badges,
    })
}
