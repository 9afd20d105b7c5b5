use thiserror::Error;
use uuid::Uuid;

use crate::services::StoreError;

/// Errors surfaced by the match-making core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid match action: {0}")]
    InvalidMatchAction(String),

    #[error("Partner preferences not found for user {0}")]
    PartnerPreferencesNotFound(Uuid),

    #[error("Partner preferences already exist for user {0}")]
    PartnerPreferencesAlreadyExist(Uuid),

    #[error("Invalid partner preferences: {0}")]
    InvalidPreferences(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
