use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{candidate_query, with_deadline, MatchError};
use crate::models::{HistoryFilter, Pagination, Profile, ProfileCard, ProfilePage};
use crate::services::{
    MutualMatchStore, PhotoResolver, PreferenceStore, ProfileMatchStore, ProfileStore, StoreError, Stores,
};

#[derive(Debug, Clone, Copy)]
pub struct RecommendOptions {
    pub default_limit: i64,
    pub max_limit: i64,
    pub photo_url_expiry: Duration,
    pub operation_timeout: Option<Duration>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            photo_url_expiry: Duration::from_secs(3600),
            operation_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Clamp client pagination: a non-positive limit becomes `default_limit`,
/// anything above `max_limit` is capped and a negative offset becomes 0.
pub fn clamp_page(limit: i64, offset: i64, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let limit = if limit <= 0 { default_limit } else { limit.min(max_limit) };
    (limit.max(1), offset.max(0))
}

/// A history entry points either at a profile or at a user
#[derive(Debug, Clone, Copy)]
enum ProfileRef {
    Profile(i64),
    User(Uuid),
}

/// Builds the recommendation feed and the like/pass/mutual history lists
#[derive(Clone)]
pub struct RecommendationEngine {
    profiles: Arc<dyn ProfileStore>,
    preferences: Arc<dyn PreferenceStore>,
    profile_matches: Arc<dyn ProfileMatchStore>,
    mutual_matches: Arc<dyn MutualMatchStore>,
    photos: Arc<dyn PhotoResolver>,
    options: RecommendOptions,
}

impl RecommendationEngine {
    pub fn new<T>(stores: &Stores<T>, photos: Arc<dyn PhotoResolver>) -> Self {
        Self {
            profiles: Arc::clone(&stores.profiles),
            preferences: Arc::clone(&stores.preferences),
            profile_matches: Arc::clone(&stores.profile_matches),
            mutual_matches: Arc::clone(&stores.mutual_matches),
            photos,
            options: RecommendOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RecommendOptions) -> Self {
        self.options = options;
        self
    }

    /// Profiles on the opposite side that satisfy the actor's partner
    /// preferences and that the actor has not acted on yet, ordered by
    /// profile id.
    pub async fn recommend_user_profiles(
        &self,
        actor_user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<ProfilePage, MatchError> {
        with_deadline(
            self.options.operation_timeout,
            self.recommend(actor_user_id, limit, offset),
        )
        .await
    }

    async fn recommend(&self, actor_user_id: Uuid, limit: i64, offset: i64) -> Result<ProfilePage, MatchError> {
        let (limit, offset) = clamp_page(limit, offset, self.options.default_limit, self.options.max_limit);
        let actor = self.actor_profile(actor_user_id).await?;

        let preference = self
            .preferences
            .get_by_profile_id(actor.id)
            .await?
            .ok_or(MatchError::PartnerPreferencesNotFound(actor_user_id))?;

        // Everything the actor already liked or passed, plus the actor
        let mut exclude = self.profile_matches.list_targets(actor.id, None).await?;
        exclude.push(actor.id);
        exclude.sort_unstable();
        exclude.dedup();

        let today = Utc::now().date_naive();
        let query = candidate_query(&actor, &preference, exclude, today, limit, offset);
        let page = self.profiles.search_candidates(&query).await?;

        debug!(
            "Found {} candidates for profile {} ({} total)",
            page.profiles.len(),
            actor.id,
            page.total_count
        );

        Ok(ProfilePage {
            profiles: self.to_cards(&page.profiles, today).await,
            pagination: Pagination::new(limit, offset, page.total_count),
        })
    }

    /// Profiles the actor liked or passed, or whose users are mutually
    /// matched with the actor. Profiles deleted since are skipped.
    pub async fn get_profiles_by_match_action(
        &self,
        actor_user_id: Uuid,
        filter: HistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<ProfilePage, MatchError> {
        with_deadline(
            self.options.operation_timeout,
            self.history(actor_user_id, filter, limit, offset),
        )
        .await
    }

    async fn history(
        &self,
        actor_user_id: Uuid,
        filter: HistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<ProfilePage, MatchError> {
        let (limit, offset) = clamp_page(limit, offset, self.options.default_limit, self.options.max_limit);
        let actor = self.actor_profile(actor_user_id).await?;

        let refs: Vec<ProfileRef> = match filter {
            HistoryFilter::Mutual => self
                .mutual_matches
                .list_counterparts(actor.user_id)
                .await?
                .into_iter()
                .map(ProfileRef::User)
                .collect(),
            HistoryFilter::Liked | HistoryFilter::Passed => self
                .profile_matches
                .list_targets(actor.id, Some(filter == HistoryFilter::Liked))
                .await?
                .into_iter()
                .map(ProfileRef::Profile)
                .collect(),
        };

        let total_count = refs.len() as i64;
        let window: Vec<ProfileRef> = refs
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        let lookups = join_all(window.into_iter().map(|r| self.load(r))).await;
        let profiles: Vec<Profile> = lookups
            .into_iter()
            .filter_map(|(r, lookup)| match lookup {
                Ok(Some(profile)) => Some(profile),
                Ok(None) => {
                    debug!("Skipping {:?} in {} history: profile not found", r, filter);
                    None
                }
                Err(e) => {
                    debug!("Skipping {:?} in {} history: {}", r, filter, e);
                    None
                }
            })
            .collect();

        let today = Utc::now().date_naive();
        Ok(ProfilePage {
            profiles: self.to_cards(&profiles, today).await,
            pagination: Pagination::new(limit, offset, total_count),
        })
    }

    async fn actor_profile(&self, actor_user_id: Uuid) -> Result<Profile, MatchError> {
        self.profiles
            .get_by_user_id(actor_user_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(format!("no profile for user {}", actor_user_id)))
    }

    async fn load(&self, r: ProfileRef) -> (ProfileRef, Result<Option<Profile>, StoreError>) {
        let lookup = match r {
            ProfileRef::Profile(id) => self.profiles.get_by_id(id).await,
            ProfileRef::User(user_id) => self.profiles.get_by_user_id(user_id).await,
        };
        (r, lookup)
    }

    async fn to_cards(&self, profiles: &[Profile], today: NaiveDate) -> Vec<ProfileCard> {
        let urls = join_all(profiles.iter().map(|p| self.photo_url(p))).await;

        profiles
            .iter()
            .zip(urls)
            .map(|(profile, url)| ProfileCard::from_profile(profile, today, url))
            .collect()
    }

    async fn photo_url(&self, profile: &Profile) -> Option<String> {
        let key = profile.photo_key.as_deref()?;

        match self.photos.get_download_url(key, self.options.photo_url_expiry).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Failed to resolve photo for profile {}: {}", profile.id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 0, 20, 100), (20, 0));
        assert_eq!(clamp_page(-5, -1, 20, 100), (20, 0));
        assert_eq!(clamp_page(500, 40, 20, 100), (100, 40));
        assert_eq!(clamp_page(7, 3, 20, 100), (7, 3));
        assert_eq!(clamp_page(7, i64::MAX, 20, 100), (7, i64::MAX));
    }
}
