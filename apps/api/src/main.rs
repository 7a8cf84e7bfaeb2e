mod admin;
mod config;
mod errors;
mod feed;
mod github;
mod models;
mod routes;
mod scheduler;
mod settings;
mod state;
mod store;
mod summarizer;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::feed::FeedController;
use crate::github::GithubClient;
use crate::routes::build_router;
use crate::scheduler::{EnrichmentDeps, EnrichmentScheduler};
use crate::settings::SettingsStore;
use crate::state::AppState;
use crate::store::{ItemStore, SharedStore};
use crate::summarizer::SummaryClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RepoPulse API v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.data_dir)?;

    // Runtime settings (API keys, token, locale) + persisted item collection
    let settings = Arc::new(SettingsStore::load(
        Some(config.data_dir.join("settings.json")),
        config.github_token.clone(),
    ));
    let store = SharedStore::new(ItemStore::restore(config.data_dir.join("items.json")));

    // Outbound clients
    let github = Arc::new(GithubClient::new());
    let llm = SummaryClient::new();

    // The single enrichment drain task
    let scheduler = EnrichmentScheduler::new();
    tokio::spawn(scheduler.clone().run(EnrichmentDeps {
        store: store.clone(),
        settings: settings.clone(),
        readme_source: github.clone(),
        summarizer: Arc::new(llm.clone()),
    }));

    // Anything the last session left unenriched goes straight back in line
    let pending = store.read().fallback_ids();
    if !pending.is_empty() {
        info!(
            "Re-enqueueing {} item(s) still carrying fallback summaries",
            pending.len()
        );
        scheduler.enqueue_discovered(pending);
    }

    let feed = Arc::new(FeedController::new(
        Some(config.data_dir.join("last_fetch.json")),
        github.clone(),
        store.clone(),
        scheduler.clone(),
        settings.clone(),
    ));

    // Initial discovery runs in the background so startup never blocks on
    // the network; a restored feed just refreshes silently.
    {
        let feed = feed.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.refresh().await {
                warn!("Startup refresh failed: {e}");
            }
        });
    }

    // Build app state
    let state = AppState {
        settings,
        store,
        feed,
        scheduler,
        llm,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
