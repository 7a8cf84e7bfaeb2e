//! Content-management handlers: summary edits, regeneration, deletion,
//! custom items, settings, key validation, and translation.
//!
//! Regeneration runs the summary client directly, outside the enrichment
//! queue — the user is waiting on the response, and the prior summary is
//! recorded into the item's version history before being overwritten.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::item::{CustomItem, DisplayItem, ItemId};
use crate::models::keys::{AiProvider, KeyStatus};
use crate::models::locale::Locale;
use crate::models::summary::{Provenance, Summary};
use crate::settings::Settings;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Item management
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/v1/items/:id/summary
pub async fn handle_update_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut summary): Json<Summary>,
) -> Result<Json<DisplayItem>, AppError> {
    let id: ItemId = id.parse().map_err(AppError::Validation)?;
    // A manual edit is authoritative content, never a placeholder.
    summary.provenance = Provenance::Generated;

    if !state.store.write().record_new_summary(id, summary) {
        return Err(AppError::NotFound(format!("Item {id} not found")));
    }
    fetch_item(&state, id)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    #[serde(default)]
    pub custom_instruction: Option<String>,
}

/// POST /api/v1/items/:id/regenerate
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RegenerateRequest>,
) -> Result<Json<DisplayItem>, AppError> {
    let id: ItemId = id.parse().map_err(AppError::Validation)?;

    let (name, source_text) = {
        let store = state.store.read();
        match store.get(id) {
            Some(DisplayItem::Repo(item)) => (
                item.repo.name.clone(),
                item.readme_content
                    .clone()
                    .or_else(|| item.repo.description.clone())
                    .unwrap_or_default(),
            ),
            Some(DisplayItem::Custom(_)) => {
                return Err(AppError::Validation(
                    "Only repository items can be regenerated".to_string(),
                ))
            }
            None => return Err(AppError::NotFound(format!("Item {id} not found"))),
        }
    };

    let config = state.settings.enrichment_config();
    let summary = state
        .llm
        .generate_summary(
            &name,
            &source_text,
            &config.api_keys,
            config.fallback_model.as_deref(),
            req.custom_instruction.as_deref(),
            config.locale,
        )
        .await
        .ok_or(AppError::SummaryExhausted)?;

    state.store.write().record_new_summary(id, summary);
    fetch_item(&state, id)
}

/// DELETE /api/v1/items/:id
pub async fn handle_delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: ItemId = id.parse().map_err(AppError::Validation)?;
    if state.store.write().remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Item {id} not found")))
    }
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Serialize)]
pub struct BulkDeleteResponse {
    pub removed: usize,
}

/// POST /api/v1/items/bulk-delete
pub async fn handle_bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let mut ids = HashSet::new();
    for raw in &req.ids {
        ids.insert(raw.parse::<ItemId>().map_err(AppError::Validation)?);
    }
    let removed = state.store.write().remove_many(&ids);
    Ok(Json(BulkDeleteResponse { removed }))
}

// ────────────────────────────────────────────────────────────────────────────
// Custom items
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomRequest {
    pub url: String,
    pub raw_text: String,
    pub instruction: String,
}

/// POST /api/v1/custom
pub async fn handle_create_custom(
    State(state): State<AppState>,
    Json(req): Json<CreateCustomRequest>,
) -> Result<(StatusCode, Json<DisplayItem>), AppError> {
    if req.raw_text.trim().is_empty() {
        return Err(AppError::Validation("rawText must not be empty".to_string()));
    }

    let config = state.settings.enrichment_config();
    let summary = state
        .llm
        .summarize_scraped(
            &req.raw_text,
            &req.instruction,
            &config.api_keys,
            config.fallback_model.as_deref(),
            config.locale,
        )
        .await
        .ok_or(AppError::SummaryExhausted)?;

    let item = CustomItem {
        id: Uuid::new_v4(),
        original_url: req.url,
        ai_summary: summary,
        created_at: Utc::now(),
    };
    state.store.write().insert_custom(item.clone());

    Ok((StatusCode::CREATED, Json(DisplayItem::Custom(item))))
}

// ────────────────────────────────────────────────────────────────────────────
// Settings, keys, translation
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.snapshot())
}

/// PUT /api/v1/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Json<Settings> {
    state.settings.update(settings);
    Json(state.settings.snapshot())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyRequest {
    pub key: String,
    pub provider: AiProvider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// When set, the matching settings entry's status is updated in place.
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyResponse {
    pub valid: bool,
    pub checked_at: chrono::DateTime<Utc>,
}

/// POST /api/v1/keys/validate
pub async fn handle_validate_key(
    State(state): State<AppState>,
    Json(req): Json<ValidateKeyRequest>,
) -> Json<ValidateKeyResponse> {
    let valid = state
        .llm
        .validate_key(
            &req.key,
            req.provider,
            req.base_url.as_deref(),
            req.model.as_deref(),
        )
        .await;

    let checked_at = Utc::now();
    if let Some(id) = &req.id {
        let status = if valid { KeyStatus::Valid } else { KeyStatus::Invalid };
        state.settings.set_key_status(id, status, checked_at);
    }

    Json(ValidateKeyResponse { valid, checked_at })
}

#[derive(Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target: Locale,
}

#[derive(Serialize)]
pub struct TranslateResponse {
    pub translated: String,
}

/// POST /api/v1/translate
pub async fn handle_translate(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, AppError> {
    let config = state.settings.enrichment_config();
    let translated = state
        .llm
        .translate(
            &req.text,
            req.target,
            &config.api_keys,
            config.fallback_model.as_deref(),
        )
        .await
        .ok_or(AppError::SummaryExhausted)?;
    Ok(Json(TranslateResponse { translated }))
}

fn fetch_item(state: &AppState, id: ItemId) -> Result<Json<DisplayItem>, AppError> {
    state
        .store
        .read()
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regenerate_request_tolerates_missing_body_fields() {
        let req: RegenerateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.custom_instruction.is_none());

        let req: RegenerateRequest =
            serde_json::from_str(r#"{"customInstruction": "shorter"}"#).unwrap();
        assert_eq!(req.custom_instruction.as_deref(), Some("shorter"));
    }

    #[test]
    fn test_validate_key_request_deserializes() {
        let req: ValidateKeyRequest = serde_json::from_str(
            r#"{"key": "sk-x", "provider": "openai", "baseUrl": "https://api.deepseek.com"}"#,
        )
        .unwrap();
        assert_eq!(req.provider, AiProvider::OpenAi);
        assert_eq!(req.base_url.as_deref(), Some("https://api.deepseek.com"));
        assert!(req.id.is_none());
    }

    #[test]
    fn test_translate_request_parses_locale() {
        let req: TranslateRequest =
            serde_json::from_str(r##"{"text": "# hi", "target": "zh-CN"}"##).unwrap();
        assert_eq!(req.target, Locale::ZhCn);
    }
}
