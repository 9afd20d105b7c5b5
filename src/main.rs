use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lume_match::config::{LoggingSettings, Settings, StorageBackend};
use lume_match::core::{MatchActionEngine, PreferenceService, RecommendationEngine};
use lume_match::routes::{self, AppState};
use lume_match::services::{
    AppwritePhotoResolver, CachedPhotoResolver, EventPublisher, InMemoryStore, LogEventPublisher, PhotoResolver,
    PostgresStore, RedisEventPublisher, StaticPhotoResolver, Stores, TransactionCoordinator,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_publisher(settings: &Settings) -> Arc<dyn EventPublisher> {
    match &settings.events.redis_url {
        Some(url) => match RedisEventPublisher::new(url).await {
            Ok(publisher) => {
                info!("Publishing match events to Redis");
                Arc::new(publisher)
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), match events will only be logged", e);
                Arc::new(LogEventPublisher)
            }
        },
        None => {
            info!("No Redis URL configured, match events will only be logged");
            Arc::new(LogEventPublisher)
        }
    }
}

fn build_photo_resolver(settings: &Settings) -> std::io::Result<Arc<dyn PhotoResolver>> {
    let photos = &settings.photos;

    let inner: Arc<dyn PhotoResolver> = match photos.appwrite() {
        Some((endpoint, api_key, project_id, bucket_id)) => {
            let resolver = AppwritePhotoResolver::new(
                endpoint.to_string(),
                api_key.to_string(),
                project_id.to_string(),
                bucket_id.to_string(),
                Duration::from_secs(photos.request_timeout_secs),
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

            info!("Resolving photos through Appwrite bucket {}", bucket_id);
            Arc::new(resolver)
        }
        None => {
            warn!("Appwrite not configured, serving photos from {}", photos.static_base_url);
            Arc::new(StaticPhotoResolver::new(photos.static_base_url.clone()))
        }
    };

    let ttl_secs = photos
        .cache_ttl_secs
        .min(settings.matching.photo_url_expiry_secs.saturating_sub(60).max(1));

    info!("Photo URL cache initialized ({} entries, TTL: {}s)", photos.cache_size, ttl_secs);
    Ok(Arc::new(CachedPhotoResolver::new(inner, photos.cache_size, Duration::from_secs(ttl_secs))))
}

async fn serve<T: TransactionCoordinator + 'static>(
    settings: Settings,
    stores: Stores<T>,
    postgres: Option<Arc<PostgresStore>>,
) -> std::io::Result<()> {
    let events = build_publisher(&settings).await;
    let photos = build_photo_resolver(&settings)?;

    let app_state = AppState {
        actions: MatchActionEngine::new(&stores, events).with_options(settings.matching.action_options()),
        recommendations: RecommendationEngine::new(&stores, photos)
            .with_options(settings.matching.recommend_options()),
        preferences: PreferenceService::new(&stores),
        postgres,
    };

    info!(
        "Match engines initialized (recheck_reverse_like: {}, max_limit: {})",
        settings.matching.recheck_reverse_like, settings.matching.max_limit
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes::<T>)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_tracing(&settings.logging);
    info!("Starting Lume Match service...");

    match settings.storage.backend {
        StorageBackend::Postgres => {
            let postgres = match PostgresStore::from_settings(&settings.database).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
                }
            };

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                settings.database.max_connections
            );

            let stores = Stores::from_backend(postgres.clone());
            serve(settings, stores, Some(postgres)).await
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
            serve(settings, stores, None).await
        }
    }
}
