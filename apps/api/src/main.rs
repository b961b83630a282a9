mod config;
mod discovery;
mod errors;
mod lifecycle;
mod llm_client;
mod models;
mod outreach;
mod routes;
mod state;
mod store;
mod tailoring;
#[cfg(test)]
mod testkit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{load_base_profile, load_preferences, Config};
use crate::discovery::search::{JobSearch, SerpApiClient};
use crate::llm_client::{GenerationGate, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hunter API v{}", env!("CARGO_PKG_VERSION"));

    // Profiles are validated up front; a bad document aborts startup.
    let preferences = Arc::new(load_preferences(&config.preferences_path)?);
    let base_profile = Arc::new(load_base_profile(&config.base_profile_path)?);
    info!(
        "Loaded {} search queries, {} scoring criteria, {} experience entries",
        preferences.search_queries.len(),
        preferences.scoring.criteria.len(),
        base_profile.experience.len()
    );

    // Persistence
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // Model access: one client behind the bounded gate
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let gate = Arc::new(GenerationGate::new(
        Arc::new(llm),
        config.max_concurrent_generations,
        Duration::from_secs(config.generation_timeout_secs),
    ));

    let search: Option<Arc<dyn JobSearch>> = match &config.serpapi_api_key {
        Some(key) => Some(Arc::new(SerpApiClient::new(
            key.clone(),
            config.search_results_per_query,
        )?)),
        None => {
            warn!("SERPAPI_API_KEY not set; discovery is disabled");
            None
        }
    };

    let state = AppState {
        store,
        gate,
        search,
        preferences,
        base_profile,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
