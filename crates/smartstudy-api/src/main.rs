// SmartStudy API server
// Decision: Postgres when DATABASE_URL is set, in-memory stores otherwise
// Decision: A missing model API key is a startup error, not a per-request one

use anyhow::{Context, Result};
use smartstudy_api::{
    auth::AuthState, build_router, AppState, HealthState, ServerConfig,
};
use smartstudy_core::memory::{InMemoryEventStore, InMemoryTaskStore};
use smartstudy_core::{Assistant, EventStore, LlmDriver, TaskStore};
use smartstudy_openai::OpenAiCompatibleDriver;
use smartstudy_storage::{Database, PgEventStore, PgTaskStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "smartstudy_api=debug,smartstudy_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("smartstudy-api starting...");

    let config = ServerConfig::from_env().context("Invalid server configuration")?;

    let (events, tasks, storage): (Arc<dyn EventStore>, Arc<dyn TaskStore>, &'static str) =
        match config.database_url.as_deref() {
            Some(url) => {
                let db = Database::from_url(url).await?;
                db.migrate().await?;
                tracing::info!("Connected to database");
                (
                    Arc::new(PgEventStore::new(db.clone())),
                    Arc::new(PgTaskStore::new(db)),
                    "postgres",
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores; data is lost on restart");
                (
                    Arc::new(InMemoryEventStore::new()),
                    Arc::new(InMemoryTaskStore::new()),
                    "memory",
                )
            }
        };

    let driver = OpenAiCompatibleDriver::from_env().context("Failed to configure LLM driver")?;
    tracing::info!(
        api_url = %driver.api_url(),
        model = %config.assistant.model,
        "LLM driver configured"
    );
    let driver: Arc<dyn LlmDriver> = Arc::new(driver);

    tracing::info!(mode = config.auth.mode.as_str(), "Authentication configured");
    let auth_state = AuthState::new(&config.auth);

    let health_state = HealthState {
        auth_mode: config.auth.mode.as_str(),
        storage,
        model: config.assistant.model.clone(),
    };

    let assistant = Assistant::new(driver, events, tasks, config.assistant.clone());
    let state = AppState::new(assistant, auth_state);

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }

    let app = build_router(
        state,
        health_state,
        &config.api_prefix,
        config.cors_origins.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
