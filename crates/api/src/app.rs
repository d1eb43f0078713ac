use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::services::{KeyedTranslationClient, PooledTranslationProvider, TranslationPipeline};
use persistence::repositories::{
    ApiKeyCredentialRepository, ContentRepository, ProductTranslationRepository, QuotaRepository,
    TranslationJobRepository, TranslationLogRepository,
};
use sqlx::PgPool;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_admin, trace_id};
use crate::routes::{api_keys, health, product_translations, translations};
use crate::services::ProductTranslationService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub pipeline: Arc<TranslationPipeline>,
    /// Key pool used by queue jobs and the product path.
    pub provider: Arc<PooledTranslationProvider>,
    pub product_translator: Arc<ProductTranslationService>,
}

/// Wires repositories, the key pool and the pipeline around one translation
/// client.
pub fn build_state(
    config: Config,
    pool: PgPool,
    client: Arc<dyn KeyedTranslationClient>,
) -> AppState {
    let config = Arc::new(config);
    let settings = config.pipeline_settings();

    let provider = Arc::new(PooledTranslationProvider::new(
        Arc::new(ApiKeyCredentialRepository::new(pool.clone())),
        client,
        config.deepl.configured_key().map(str::to_string),
        config.translation.default_key_mode,
        Arc::new(AtomicUsize::new(0)),
    ));

    let pipeline = Arc::new(TranslationPipeline::new(
        Arc::new(TranslationJobRepository::new(pool.clone())),
        Arc::new(QuotaRepository::new(pool.clone())),
        Arc::new(ContentRepository::new(pool.clone())),
        provider.clone(),
        settings,
    ));

    let product_translator = Arc::new(ProductTranslationService::new(
        ContentRepository::new(pool.clone()),
        ProductTranslationRepository::new(pool.clone()),
        TranslationLogRepository::new(pool.clone()),
        provider.clone(),
        pipeline.clone(),
        config.translation.default_key_mode,
    ));

    AppState {
        pool,
        config,
        pipeline,
        provider,
        product_translator,
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
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

    // Translation back office (require admin API key)
    let admin_routes = Router::new()
        // Job queue
        .route(
            "/api/v1/admin/translations/schedule",
            post(translations::schedule_content),
        )
        .route(
            "/api/v1/admin/translations/schedule-all",
            post(translations::schedule_all_existing),
        )
        .route(
            "/api/v1/admin/translations/process",
            post(translations::process_pending_batch),
        )
        .route(
            "/api/v1/admin/translations/priority/:language",
            post(translations::start_priority).get(translations::get_priority_status),
        )
        .route(
            "/api/v1/admin/translations/overview",
            get(translations::get_overview),
        )
        .route(
            "/api/v1/admin/translations/recent",
            get(translations::get_recent),
        )
        .route(
            "/api/v1/admin/translations/status",
            get(translations::check_status),
        )
        .route(
            "/api/v1/admin/translations/quota",
            get(translations::get_quota),
        )
        // Product path
        .route(
            "/api/v1/admin/products/:product_id/translate",
            post(product_translations::translate_product),
        )
        .route(
            "/api/v1/admin/products/:product_id/translations",
            get(product_translations::list_product_translations),
        )
        .route(
            "/api/v1/admin/translation-logs",
            get(product_translations::list_translation_logs),
        )
        // API key pool
        .route(
            "/api/v1/admin/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api/v1/admin/api-keys/:id", delete(api_keys::delete_api_key))
        .route(
            "/api/v1/admin/api-keys/:id/primary",
            post(api_keys::set_primary),
        )
        .route("/api/v1/admin/api-keys/:id/active", post(api_keys::set_active))
        .route("/api/v1/admin/api-keys/:id/test", post(api_keys::test_api_key))
        .route(
            "/api/v1/admin/api-keys/:id/refresh",
            post(api_keys::refresh_usage),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
