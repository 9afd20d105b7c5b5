use actix_web::{web, HttpResponse, Responder};

use super::{error_response, AppState};
use crate::models::{CreatePreferencesRequest, PreferenceQuery, UpdatePreferencesRequest};
use crate::services::TransactionCoordinator;

pub fn configure<T: TransactionCoordinator + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/preferences")
            .route(web::get().to(get_preferences::<T>))
            .route(web::post().to(create_preferences::<T>))
            .route(web::patch().to(update_preferences::<T>)),
    );
}

/// GET /api/v1/preferences?userId={uuid}
async fn get_preferences<T>(state: web::Data<AppState<T>>, query: web::Query<PreferenceQuery>) -> impl Responder {
    match state.preferences.get_preferences(query.user_id).await {
        Ok(preferences) => HttpResponse::Ok().json(preferences),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/preferences
async fn create_preferences<T>(
    state: web::Data<AppState<T>>,
    req: web::Json<CreatePreferencesRequest>,
) -> impl Responder {
    match state
        .preferences
        .create_preferences(req.user_id, &req.preferences)
        .await
    {
        Ok(preferences) => HttpResponse::Created().json(preferences),
        Err(e) => error_response(&e),
    }
}

/// PATCH /api/v1/preferences; only the fields present are changed
async fn update_preferences<T>(
    state: web::Data<AppState<T>>,
    req: web::Json<UpdatePreferencesRequest>,
) -> impl Responder {
    match state.preferences.update_preferences(req.user_id, &req.patch).await {
        Ok(preferences) => HttpResponse::Ok().json(preferences),
        Err(e) => error_response(&e),
    }
}
