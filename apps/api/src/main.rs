mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod scheduler;
mod state;
mod summaries;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::scheduler::DailySummaryScheduler;
use crate::state::AppState;
use crate::summaries::service::SummaryService;
use crate::summaries::store::{PgSummaryStore, SummaryStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting investment summary service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store: Arc<dyn SummaryStore> = Arc::new(PgSummaryStore::new(db));

    // Initialize Gemini client
    let gemini = GeminiClient::new(&config.gemini)?;
    info!("Gemini client initialized (model: {})", gemini.model());

    // Schedule the daily summary job
    let service = SummaryService::new(
        store.clone(),
        Arc::new(gemini),
        config.schedule.generation_timeout,
    );
    let daily = Arc::new(DailySummaryScheduler::new(service, &config.schedule));
    let _job_scheduler = daily.start().await?;

    // Build app state
    let state = AppState {
        store,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the mobile client's web host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
