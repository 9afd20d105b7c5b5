use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{EducationLevel, MaritalStatus, ProfessionType, Profile};

/// Profile as shown in recommendation and history lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCard {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub age: i32,
    pub height_cm: i32,
    pub community: String,
    pub marital_status: MaritalStatus,
    pub profession: String,
    pub profession_type: ProfessionType,
    pub education_level: EducationLevel,
    pub district: String,
    pub photo_url: Option<String>,
}

impl ProfileCard {
    pub fn from_profile(profile: &Profile, today: NaiveDate, photo_url: Option<String>) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            name: profile.name.clone(),
            age: profile.age_on(today),
            height_cm: profile.height_cm,
            community: profile.community.clone(),
            marital_status: profile.marital_status,
            profession: profile.profession.clone(),
            profession_type: profile.profession_type,
            education_level: profile.education_level,
            district: profile.district.clone(),
            photo_url,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total_count: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64, total_count: i64) -> Self {
        Self {
            limit,
            offset,
            total_count,
            has_more: offset.saturating_add(limit) < total_count,
        }
    }
}

/// A page of profile cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePage {
    pub profiles: Vec<ProfileCard>,
    pub pagination: Pagination,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Record action response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActionResponse {
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more() {
        assert!(Pagination::new(10, 0, 11).has_more);
        assert!(!Pagination::new(10, 0, 10).has_more);
        assert!(!Pagination::new(10, 20, 5).has_more);
    }

    #[test]
    fn test_has_more_with_extreme_offset() {
        assert!(!Pagination::new(20, i64::MAX, 5).has_more);
        assert!(!Pagination::new(i64::MAX, i64::MAX, i64::MAX).has_more);
    }
}
