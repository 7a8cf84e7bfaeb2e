use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::feed::{FeedStatus, LoadOutcome};
use crate::models::item::{DisplayItem, ItemId};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<DisplayItem>,
    pub total: usize,
    pub is_scouting: bool,
    #[serde(flatten)]
    pub status: FeedStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub inserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
    #[serde(flatten)]
    pub status: FeedStatus,
}

/// GET /api/v1/feed
pub async fn handle_get_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> Json<FeedResponse> {
    let items: Vec<DisplayItem> = {
        let store = state.store.read();
        store
            .items()
            .iter()
            .filter(|item| matches_category(item, params.category.as_deref()))
            .filter(|item| matches_query(item, params.q.as_deref()))
            .cloned()
            .collect()
    };

    Json(FeedResponse {
        total: items.len(),
        items,
        is_scouting: state.scheduler.is_scouting(),
        status: state.feed.status(),
    })
}

/// POST /api/v1/feed/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
) -> Result<Json<LoadResponse>, AppError> {
    let outcome = state.feed.refresh().await?;
    Ok(Json(load_response(outcome, &state)))
}

/// POST /api/v1/feed/next
pub async fn handle_load_next(
    State(state): State<AppState>,
) -> Result<Json<LoadResponse>, AppError> {
    let outcome = state.feed.load_next().await?;
    Ok(Json(load_response(outcome, &state)))
}

/// GET /api/v1/items/:id
///
/// Opening a detail view on an item still carrying its fallback summary
/// jumps it to the head of the enrichment queue.
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DisplayItem>, AppError> {
    let id: ItemId = id.parse().map_err(AppError::Validation)?;

    let item = state
        .store
        .read()
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))?;

    if matches!(&item, DisplayItem::Repo(_)) && item.summary().is_fallback() {
        state.scheduler.enqueue_priority(id);
    }

    Ok(Json(item))
}

fn load_response(outcome: LoadOutcome, state: &AppState) -> LoadResponse {
    let (inserted, skipped) = match outcome {
        LoadOutcome::Loaded { inserted } => (inserted, None),
        LoadOutcome::AlreadyLoading => (0, Some("alreadyLoading")),
        LoadOutcome::Exhausted => (0, Some("exhausted")),
    };
    LoadResponse {
        inserted,
        skipped,
        status: state.feed.status(),
    }
}

fn matches_category(item: &DisplayItem, category: Option<&str>) -> bool {
    match category.map(str::trim) {
        None | Some("") | Some("all") => true,
        Some(category) => item.summary().category.trim() == category,
    }
}

fn matches_query(item: &DisplayItem, query: Option<&str>) -> bool {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = query.to_lowercase();

    let summary = item.summary();
    if summary.catchy_title.to_lowercase().contains(&needle)
        || summary.introduction.to_lowercase().contains(&needle)
    {
        return true;
    }
    match item {
        DisplayItem::Repo(item) => item.repo.full_name.to_lowercase().contains(&needle),
        DisplayItem::Custom(item) => item.original_url.to_lowercase().contains(&needle),
    }
}
