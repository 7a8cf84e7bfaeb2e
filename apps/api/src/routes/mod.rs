pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::admin::handlers as admin;
use crate::feed::handlers as feed;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feed
        .route("/api/v1/feed", get(feed::handle_get_feed))
        .route("/api/v1/feed/refresh", post(feed::handle_refresh))
        .route("/api/v1/feed/next", post(feed::handle_load_next))
        // Items
        .route(
            "/api/v1/items/:id",
            get(feed::handle_get_item).delete(admin::handle_delete_item),
        )
        .route("/api/v1/items/:id/summary", put(admin::handle_update_summary))
        .route(
            "/api/v1/items/:id/regenerate",
            post(admin::handle_regenerate),
        )
        .route("/api/v1/items/bulk-delete", post(admin::handle_bulk_delete))
        .route("/api/v1/custom", post(admin::handle_create_custom))
        // Settings & tooling
        .route(
            "/api/v1/settings",
            get(admin::handle_get_settings).put(admin::handle_update_settings),
        )
        .route("/api/v1/keys/validate", post(admin::handle_validate_key))
        .route("/api/v1/translate", post(admin::handle_translate))
        .with_state(state)
}
