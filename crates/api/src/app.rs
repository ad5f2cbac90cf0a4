use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{FeedbackStore, LocationStore};
use persistence::repositories::{FeedbackRepository, LocationRepository};
use persistence::MemoryStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, request_span, require_client_key,
    ClientKeys, RateLimiterState,
};
use crate::routes::{feedback, health, locations};

#[derive(Clone)]
pub struct AppState {
    pub locations: Arc<dyn LocationStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub config: Arc<Config>,
    pub client_keys: Arc<ClientKeys>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

/// Store backends for the two relay collections.
#[derive(Clone)]
pub struct Stores {
    pub locations: Arc<dyn LocationStore>,
    pub feedback: Arc<dyn FeedbackStore>,
}

/// Failure while preparing the configured store.
#[derive(Debug, thiserror::Error)]
pub enum StoreSetupError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl Stores {
    /// Both collections in one process-local [`MemoryStore`].
    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            locations: store.clone(),
            feedback: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            locations: Arc::new(LocationRepository::new(pool.clone())),
            feedback: Arc::new(FeedbackRepository::new(pool)),
        }
    }

    /// Builds the stores selected by the database url, migrating Postgres
    /// before use.
    pub async fn connect(config: &persistence::db::DatabaseConfig) -> Result<Self, StoreSetupError> {
        if config.is_memory() {
            info!("Using in-memory store; data is lost on restart");
            return Ok(Self::memory());
        }

        let pool = persistence::db::create_pool(config).await?;

        info!("Running database migrations...");
        persistence::db::run_migrations(&pool).await?;
        info!("Migrations completed");

        Ok(Self::postgres(pool))
    }
}

pub fn create_app(config: Config, stores: Stores) -> Router {
    let config = Arc::new(config);

    // Rate limiting is enabled when rate_limit_per_minute > 0
    let rate_limiter = if config.security.rate_limit_per_minute > 0 {
        Some(Arc::new(RateLimiterState::new(
            config.security.rate_limit_per_minute,
        )))
    } else {
        None
    };

    let state = AppState {
        locations: stores.locations,
        feedback: stores.feedback,
        config: config.clone(),
        client_keys: Arc::new(ClientKeys::new(&config.security.client_keys)),
        rate_limiter,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Relay routes (require a client key)
    // Middleware order: auth runs first, then rate limiting (which needs the identity)
    let relay_routes = Router::new()
        .route("/PostLocationByInstanceId", post(locations::post_location))
        .route("/GetLocationByInstanceId", post(locations::get_locations))
        .route(
            "/CheckDistanceByInstanceId",
            post(locations::check_distance),
        )
        .route("/PostComment", post(feedback::post_comment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_client_key,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(relay_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}
