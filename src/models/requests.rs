use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{NewPartnerPreference, PartnerPreferencePatch};

/// Request to like or pass on a profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordActionRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[validate(range(min = 1))]
    #[serde(alias = "target_profile_id", rename = "targetProfileId")]
    pub target_profile_id: i64,
    #[validate(length(min = 1))]
    pub action: String,
}

/// Query string for the recommendation feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Query string for match history listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    pub action: String,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Identifies the member whose preferences are read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}

/// Create partner preferences; preference fields sit next to `userId`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePreferencesRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub preferences: NewPartnerPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePreferencesRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub patch: PartnerPreferencePatch,
}
