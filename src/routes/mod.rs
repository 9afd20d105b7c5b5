// Route exports
pub mod matches;
pub mod preferences;

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::core::{MatchActionEngine, MatchError, PreferenceService, RecommendationEngine};
use crate::models::ErrorResponse;
use crate::services::{PostgresStore, TransactionCoordinator};

/// Application state shared across all handlers
pub struct AppState<T> {
    pub actions: MatchActionEngine<T>,
    pub recommendations: RecommendationEngine,
    pub preferences: PreferenceService,
    /// Present when the Postgres backend is in use; drives the health check
    pub postgres: Option<Arc<PostgresStore>>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            recommendations: self.recommendations.clone(),
            preferences: self.preferences.clone(),
            postgres: self.postgres.clone(),
        }
    }
}

pub fn configure_routes<T: TransactionCoordinator + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure::<T>)
            .configure(preferences::configure::<T>),
    );
}

/// Translate a core error into its HTTP response
pub fn error_response(err: &MatchError) -> HttpResponse {
    let (status, error) = match err {
        MatchError::ProfileNotFound(_) => (StatusCode::NOT_FOUND, "profile_not_found"),
        MatchError::PartnerPreferencesNotFound(_) => (StatusCode::NOT_FOUND, "partner_preferences_not_found"),
        MatchError::InvalidMatchAction(_) => (StatusCode::BAD_REQUEST, "invalid_match_action"),
        MatchError::InvalidPreferences(_) => (StatusCode::BAD_REQUEST, "invalid_preferences"),
        MatchError::PartnerPreferencesAlreadyExist(_) => (StatusCode::CONFLICT, "partner_preferences_already_exist"),
        MatchError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        MatchError::Store(e) => {
            tracing::error!("Store failure: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

/// 400 response for request bodies that fail validation
pub fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
