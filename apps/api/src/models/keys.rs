//! API key configuration records.
//!
//! Keys are an ordered list; list order defines failover priority in the
//! summary generation chain. Mutated only through the settings API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider family a key belongs to. Each family has its own wire shape but
/// is dispatched uniformly by the summary client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

/// Validation state of a configured key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Valid,
    Invalid,
    #[default]
    Unchecked,
}

/// One configured provider key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyEntry {
    pub id: String,
    /// Display name chosen by the user; shows up in failover warnings.
    pub name: String,
    pub key: String,
    pub provider: AiProvider,
    /// Custom endpoint base, honored by OpenAI-compatible providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model this key should use, overriding the global fallback model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default)]
    pub status: KeyStatus,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}
