// Core match-making exports
pub mod actions;
pub mod error;
pub mod filters;
pub mod pairing;
pub mod preferences;
pub mod recommend;

use std::future::Future;
use std::time::Duration;

pub use actions::{upsert_profile_match, ActionOptions, MatchActionEngine};
pub use error::MatchError;
pub use filters::{age_on, birth_date_window, candidate_query, matches_candidate_query};
pub use pairing::CanonicalPair;
pub use preferences::PreferenceService;
pub use recommend::{clamp_page, RecommendOptions, RecommendationEngine};

use crate::models::{HistoryFilter, MatchAction};

/// Parse a like/pass action, rejecting anything else
pub fn parse_match_action(value: &str) -> Result<MatchAction, MatchError> {
    value.parse().map_err(MatchError::InvalidMatchAction)
}

/// Parse a history filter (liked, passed or mutual)
pub fn parse_history_filter(value: &str) -> Result<HistoryFilter, MatchError> {
    value.parse().map_err(MatchError::InvalidMatchAction)
}

/// Run `operation` under an optional deadline.
///
/// On expiry the operation future is dropped, which rolls back any
/// transaction it still holds open.
pub(crate) async fn with_deadline<T, F>(limit: Option<Duration>, operation: F) -> Result<T, MatchError>
where
    F: Future<Output = Result<T, MatchError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| MatchError::Timeout)?,
        None => operation.await,
    }
}
