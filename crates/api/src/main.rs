use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use dealer_translate_api::app::{build_state, create_app};
use dealer_translate_api::config::Config;
use dealer_translate_api::jobs::{JobScheduler, StaleClaimRecoveryJob, TranslationBatchJob};
use dealer_translate_api::middleware::{init_logging, init_metrics};
use dealer_translate_api::services::DeeplClient;

/// Upper bound on waiting for background jobs at shutdown.
const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting dealer translation service v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let client = DeeplClient::new(
        &config.deepl,
        Duration::from_secs(config.translation.request_timeout_secs),
    )
    .context("Failed to build translation API client")?;

    let addr = config.socket_addr()?;
    let state = build_state(config, pool, Arc::new(client));

    let mut scheduler = JobScheduler::new();
    let translation = &state.config.translation;
    scheduler.register(StaleClaimRecoveryJob::new(
        state.pipeline.clone(),
        translation.stale_claim_minutes,
    ));
    if translation.background_enabled {
        scheduler.register(TranslationBatchJob::new(
            state.pipeline.clone(),
            translation.batch_size,
            translation.batch_interval_secs,
        ));
    } else {
        info!("Background batch processing disabled");
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
