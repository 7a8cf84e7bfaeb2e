use std::sync::Arc;

use crate::feed::FeedController;
use crate::scheduler::EnrichmentScheduler;
use crate::settings::SharedSettings;
use crate::store::SharedStore;
use crate::summarizer::SummaryClient;

/// Shared application state injected into all route handlers via Axum
/// extractors. Constructed once in `main` and threaded down — nothing in the
/// pipeline reaches for ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub settings: SharedSettings,
    pub store: SharedStore,
    pub feed: Arc<FeedController>,
    pub scheduler: EnrichmentScheduler,
    pub llm: SummaryClient,
}
