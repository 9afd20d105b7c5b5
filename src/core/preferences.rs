use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::MatchError;
use crate::models::{check_preference_ranges, NewPartnerPreference, PartnerPreference, PartnerPreferencePatch, Profile};
use crate::services::{PreferenceStore, ProfileStore, StoreError, Stores};

/// Read, create and patch a member's partner preferences
#[derive(Clone)]
pub struct PreferenceService {
    profiles: Arc<dyn ProfileStore>,
    preferences: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new<T>(stores: &Stores<T>) -> Self {
        Self {
            profiles: Arc::clone(&stores.profiles),
            preferences: Arc::clone(&stores.preferences),
        }
    }

    pub async fn get_preferences(&self, user_id: Uuid) -> Result<PartnerPreference, MatchError> {
        let profile = self.profile(user_id).await?;

        self.preferences
            .get_by_profile_id(profile.id)
            .await?
            .ok_or(MatchError::PartnerPreferencesNotFound(user_id))
    }

    pub async fn create_preferences(
        &self,
        user_id: Uuid,
        new: &NewPartnerPreference,
    ) -> Result<PartnerPreference, MatchError> {
        validate_ranges(new.min_age, new.max_age, new.min_height_cm, new.max_height_cm)?;
        let profile = self.profile(user_id).await?;

        let created = self.preferences.create(profile.id, new).await.map_err(|e| match e {
            StoreError::Conflict(_) => MatchError::PartnerPreferencesAlreadyExist(user_id),
            StoreError::Rejected(reason) => MatchError::InvalidPreferences(reason),
            other => other.into(),
        })?;

        info!("Created partner preferences for profile {}", profile.id);
        Ok(created)
    }

    /// Apply a partial update. The merged ranges are validated here for an
    /// early answer and again by the store against the row it locks, so
    /// concurrent patches cannot combine into an inverted range. An empty
    /// patch returns the stored preferences unchanged.
    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        patch: &PartnerPreferencePatch,
    ) -> Result<PartnerPreference, MatchError> {
        let profile = self.profile(user_id).await?;

        let mut merged = self
            .preferences
            .get_by_profile_id(profile.id)
            .await?
            .ok_or(MatchError::PartnerPreferencesNotFound(user_id))?;

        if patch.is_empty() {
            return Ok(merged);
        }

        patch.apply_to(&mut merged);
        validate_ranges(merged.min_age, merged.max_age, merged.min_height_cm, merged.max_height_cm)?;

        let updated = self.preferences.update(profile.id, patch).await.map_err(|e| match e {
            StoreError::NotFound(_) => MatchError::PartnerPreferencesNotFound(user_id),
            StoreError::Rejected(reason) => MatchError::InvalidPreferences(reason),
            other => other.into(),
        })?;

        info!("Updated partner preferences for profile {}", profile.id);
        Ok(updated)
    }

    async fn profile(&self, user_id: Uuid) -> Result<Profile, MatchError> {
        self.profiles
            .get_by_user_id(user_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(format!("no profile for user {}", user_id)))
    }
}

fn validate_ranges(min_age: i32, max_age: i32, min_height_cm: i32, max_height_cm: i32) -> Result<(), MatchError> {
    check_preference_ranges(min_age, max_age, min_height_cm, max_height_cm).map_err(MatchError::InvalidPreferences)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ranges() {
        assert!(validate_ranges(21, 30, 150, 180).is_ok());
        assert!(validate_ranges(30, 30, 160, 160).is_ok());
        assert!(matches!(validate_ranges(31, 30, 150, 180), Err(MatchError::InvalidPreferences(_))));
        assert!(matches!(validate_ranges(21, 30, 190, 180), Err(MatchError::InvalidPreferences(_))));
        assert!(matches!(validate_ranges(-1, 30, 150, 180), Err(MatchError::InvalidPreferences(_))));
    }
}
