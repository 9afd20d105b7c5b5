use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use super::{error_response, validation_error, AppState};
use crate::core::{parse_history_filter, parse_match_action};
use crate::models::{HealthResponse, HistoryQuery, RecommendQuery, RecordActionRequest, RecordActionResponse};
use crate::services::TransactionCoordinator;

/// Configure all match-related routes
pub fn configure<T: TransactionCoordinator + 'static>(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check::<T>))
        .route("/matches/action", web::post().to(record_action::<T>))
        .route("/matches/recommendations", web::get().to(recommendations::<T>))
        .route("/matches/history", web::get().to(history::<T>));
}

/// Health check endpoint
async fn health_check<T>(state: web::Data<AppState<T>>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Like or pass on a profile
///
/// POST /api/v1/matches/action
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid",
///   "targetProfileId": 42,
///   "action": "like|pass"
/// }
/// ```
async fn record_action<T: TransactionCoordinator>(
    state: web::Data<AppState<T>>,
    req: web::Json<RecordActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for record_action request: {:?}", errors);
        return validation_error(errors);
    }

    let action = match parse_match_action(&req.action) {
        Ok(action) => action,
        Err(e) => return error_response(&e),
    };

    match state
        .actions
        .record_match_action(req.user_id, req.target_profile_id, action)
        .await
    {
        Ok(accepted) => HttpResponse::Ok().json(RecordActionResponse { accepted }),
        Err(e) => {
            tracing::info!(
                "Rejected {} from user {} on profile {}: {}",
                action,
                req.user_id,
                req.target_profile_id,
                e
            );
            error_response(&e)
        }
    }
}

/// Recommendation feed
///
/// GET /api/v1/matches/recommendations?userId={uuid}&limit=20&offset=0
async fn recommendations<T>(state: web::Data<AppState<T>>, query: web::Query<RecommendQuery>) -> impl Responder {
    match state
        .recommendations
        .recommend_user_profiles(query.user_id, query.limit, query.offset)
        .await
    {
        Ok(page) => {
            tracing::debug!(
                "Returning {} recommendations for user {} ({} total)",
                page.profiles.len(),
                query.user_id,
                page.pagination.total_count
            );
            HttpResponse::Ok().json(page)
        }
        Err(e) => error_response(&e),
    }
}

/// Match history
///
/// GET /api/v1/matches/history?userId={uuid}&action=liked|passed|mutual&limit=20&offset=0
async fn history<T>(state: web::Data<AppState<T>>, query: web::Query<HistoryQuery>) -> impl Responder {
    let filter = match parse_history_filter(&query.action) {
        Ok(filter) => filter,
        Err(e) => return error_response(&e),
    };

    match state
        .recommendations
        .get_profiles_by_match_action(query.user_id, filter, query.limit, query.offset)
        .await
    {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MatchActionEngine, PreferenceService, RecommendationEngine};
    use crate::routes::configure_routes;
    use crate::services::{InMemoryStore, LogEventPublisher, StaticPhotoResolver, Stores};
    use actix_web::{test, App};
    use std::sync::Arc;

    fn state() -> AppState<InMemoryStore> {
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
        AppState {
            actions: MatchActionEngine::new(&stores, Arc::new(LogEventPublisher)),
            recommendations: RecommendationEngine::new(&stores, Arc::new(StaticPhotoResolver::new("http://cdn.test"))),
            preferences: PreferenceService::new(&stores),
            postgres: None,
        }
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["status"], "healthy");
    }

    #[actix_web::test]
    async fn test_unknown_action_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/action")
            .set_json(serde_json::json!({
                "userId": "6f1c1c6e-9d4a-4c55-9a59-8d1f2a7b0c11",
                "targetProfileId": 5,
                "action": "superlike"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_missing_actor_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/matches/history?userId=6f1c1c6e-9d4a-4c55-9a59-8d1f2a7b0c11&action=liked")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
