//! The structured summary attached to every display item.
//!
//! Invariant: a `Summary` is always present on a displayed item. Items are
//! born with a deterministic fallback synthesized from the descriptor's own
//! fields and upgraded in place when enrichment completes.

use serde::{Deserialize, Serialize};

use crate::models::locale::Locale;
use crate::models::repo::RepoDescriptor;

/// How many topic strings the fallback lifts into `core_features`.
const FALLBACK_FEATURE_LIMIT: usize = 3;

/// Where a summary came from.
///
/// Defaults to `Generated` so provider JSON — which never carries the field —
/// parses straight into the enriched state; fallback construction sets
/// `Fallback` explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Fallback,
    #[default]
    Generated,
}

/// Structured enrichment output for one item.
///
/// `catchy_title` and `introduction` are required at parse time; the
/// remaining fields default so a slightly short provider response still
/// yields a displayable summary (best-effort parsing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub catchy_title: String,
    #[serde(default)]
    pub category: String,
    pub introduction: String,
    #[serde(default)]
    pub core_features: Vec<String>,
    #[serde(default)]
    pub tech_stack: String,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Summary {
    /// True while the item still carries its placeholder summary.
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Synthesizes the placeholder summary from a descriptor's own fields.
///
/// Pure and deterministic: name as title, primary language as category and
/// tech stack, short description as introduction, topics as features.
pub fn fallback_summary(repo: &RepoDescriptor, locale: Locale) -> Summary {
    let core_features = if repo.topics.is_empty() {
        vec![locale.default_feature_line().to_string()]
    } else {
        repo.topics
            .iter()
            .take(FALLBACK_FEATURE_LIMIT)
            .cloned()
            .collect()
    };

    Summary {
        catchy_title: repo.name.clone(),
        category: repo
            .language
            .clone()
            .unwrap_or_else(|| "GitHub".to_string()),
        introduction: repo
            .description
            .clone()
            .unwrap_or_else(|| locale.no_description_line().to_string()),
        core_features,
        tech_stack: repo
            .language
            .clone()
            .unwrap_or_else(|| locale.unknown_label().to_string()),
        provenance: Provenance::Fallback,
    }
}

/// Timestamped prior version of a summary, kept when the user edits or
/// regenerates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryVersion {
    pub summary: Summary,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}
