//! Runtime-mutable settings, persisted as a JSON document and edited through
//! the admin API.
//!
//! Environment config (`config.rs`) is immutable per process; everything the
//! admin can change at runtime — API keys, GitHub token, locale, site fields —
//! lives here.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::keys::ApiKeyEntry;
use crate::models::locale::Locale;

const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub version: u32,
    pub site_name: String,
    pub language: Locale,
    /// Ordered by failover priority.
    pub api_keys: Vec<ApiKeyEntry>,
    /// Settings-level model, used when a key names none of its own.
    pub fallback_model: Option<String>,
    pub github_token: Option<String>,
    pub is_search_enabled: bool,
    pub footer_text: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            site_name: "RepoPulse".to_string(),
            language: Locale::default(),
            api_keys: Vec::new(),
            fallback_model: None,
            github_token: None,
            is_search_enabled: true,
            footer_text: "© RepoPulse. All Rights Reserved.".to_string(),
        }
    }
}

/// Everything one enrichment tick needs from settings, snapshotted so the
/// scheduler never holds the lock across an await.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub api_keys: Vec<ApiKeyEntry>,
    pub fallback_model: Option<String>,
    pub github_token: Option<String>,
    pub locale: Locale,
}

pub struct SettingsStore {
    current: RwLock<Settings>,
    path: Option<PathBuf>,
}

pub type SharedSettings = Arc<SettingsStore>;

impl SettingsStore {
    /// Loads persisted settings (or defaults), seeding the GitHub token from
    /// the environment when the document carries none.
    pub fn load(path: Option<PathBuf>, env_github_token: Option<String>) -> Self {
        let mut settings = path
            .as_ref()
            .and_then(|p| match fs::read_to_string(p) {
                Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                    Ok(parsed) if parsed.version == SETTINGS_VERSION => Some(parsed),
                    Ok(parsed) => {
                        warn!("Discarding settings with unknown version {}", parsed.version);
                        None
                    }
                    Err(e) => {
                        warn!("Discarding malformed settings at {}: {e}", p.display());
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();

        if settings.github_token.as_deref().map_or(true, str::is_empty) {
            settings.github_token = env_github_token.filter(|t| !t.is_empty());
        }

        info!(
            "Settings loaded: {} API key(s), locale {:?}, GitHub token {}",
            settings.api_keys.len(),
            settings.language,
            if settings.github_token.is_some() { "configured" } else { "absent" },
        );

        Self {
            current: RwLock::new(settings),
            path,
        }
    }

    pub fn in_memory(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
            path: None,
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.read().clone()
    }

    pub fn locale(&self) -> Locale {
        self.read().language
    }

    pub fn github_token(&self) -> Option<String> {
        self.read()
            .github_token
            .clone()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn enrichment_config(&self) -> EnrichmentConfig {
        let settings = self.read();
        EnrichmentConfig {
            api_keys: settings.api_keys.clone(),
            fallback_model: settings.fallback_model.clone(),
            github_token: settings
                .github_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
            locale: settings.language,
        }
    }

    /// Replaces the document and persists it. The version field is pinned to
    /// the current format regardless of what the caller sent.
    pub fn update(&self, mut new: Settings) {
        new.version = SETTINGS_VERSION;
        {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            *guard = new.clone();
        }
        self.persist(&new);
    }

    /// Patches one key entry's validation status in place.
    pub fn set_key_status(
        &self,
        key_id: &str,
        status: crate::models::keys::KeyStatus,
        checked_at: chrono::DateTime<chrono::Utc>,
    ) {
        let updated = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            let mut touched = false;
            for entry in &mut guard.api_keys {
                if entry.id == key_id {
                    entry.status = status;
                    entry.last_checked = Some(checked_at);
                    touched = true;
                }
            }
            touched.then(|| guard.clone())
        };
        if let Some(settings) = updated {
            self.persist(&settings);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, settings: &Settings) {
        let Some(path) = &self.path else {
            return;
        };
        match serde_json::to_string_pretty(settings) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("Failed to write settings to {}: {e}", path.display());
                }
            }
            Err(e) => warn!("Failed to serialize settings: {e}"),
        }
    }
}
