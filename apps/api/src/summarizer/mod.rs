//! Summary Generation Client — the single point of entry for all language
//! model calls.
//!
//! Every operation walks the configured key list in order and fails over to
//! the next key on any error: auth failure, transport failure, malformed
//! JSON, schema violation. This is a failover chain, not a retry-with-backoff
//! chain — a key is tried once per call. When the whole chain exhausts, the
//! operation yields `None` and the caller keeps whatever it already had.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, warn};

pub mod prompts;
pub mod providers;

use crate::models::keys::{AiProvider, ApiKeyEntry};
use crate::models::locale::Locale;
use crate::models::summary::Summary;
use providers::{send_request, ProviderError, ProviderRequest, ResponseMode};

/// Built-in defaults, used when neither the key nor the settings name a model.
const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Provider calls get a generous timeout; a hung call fails one scheduler
/// tick instead of stalling the drain loop forever.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Seam for the enrichment scheduler; lets tests substitute a scripted
/// generator.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate_summary(
        &self,
        project_name: &str,
        source_text: &str,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
        custom_instruction: Option<&str>,
        locale: Locale,
    ) -> Option<Summary>;
}

#[derive(Clone)]
pub struct SummaryClient {
    http: Client,
}

impl SummaryClient {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Converts a repository README (or short description) into a structured
    /// summary. Returns `None` when no key succeeds; the caller falls back.
    pub async fn generate_summary(
        &self,
        project_name: &str,
        source_text: &str,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
        custom_instruction: Option<&str>,
        locale: Locale,
    ) -> Option<Summary> {
        let prompt = prompts::summary_prompt(project_name, source_text, locale, custom_instruction);
        self.summary_chain(&prompt, keys, fallback_model, locale)
            .await
    }

    /// Summarizes scraped text under a free-form instruction (custom items).
    pub async fn summarize_scraped(
        &self,
        raw_text: &str,
        instruction: &str,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
        locale: Locale,
    ) -> Option<Summary> {
        let prompt = prompts::scraped_prompt(raw_text, instruction, locale);
        self.summary_chain(&prompt, keys, fallback_model, locale)
            .await
    }

    /// Translates Markdown text into the target locale. Single string
    /// output, no structured parsing.
    pub async fn translate(
        &self,
        text: &str,
        target: Locale,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
    ) -> Option<String> {
        if keys.is_empty() {
            warn!("No API keys configured; cannot translate");
            return None;
        }

        let prompt = prompts::translate_prompt(text, target);
        for key in keys {
            let request = ProviderRequest {
                api_key: &key.key,
                base_url: key.base_url.as_deref(),
                model: effective_model(key, fallback_model),
                system: None,
                prompt: &prompt,
                mode: ResponseMode::Text,
            };
            match send_request(&self.http, key.provider, &request).await {
                Ok(text) => return Some(text),
                Err(e) => warn!(
                    "Translation with key \"{}\" ({:?}) failed: {e}",
                    key.name, key.provider
                ),
            }
        }
        None
    }

    /// Issues one minimal completion to check a key. Success or failure
    /// only; response content is not inspected.
    pub async fn validate_key(
        &self,
        api_key: &str,
        provider: AiProvider,
        base_url: Option<&str>,
        model: Option<&str>,
    ) -> bool {
        if api_key.is_empty() {
            return false;
        }

        let request = ProviderRequest {
            api_key,
            base_url,
            model: model.unwrap_or(default_model(provider)),
            system: None,
            prompt: "hi",
            mode: ResponseMode::Text,
        };
        match send_request(&self.http, provider, &request).await {
            Ok(_) => true,
            Err(e) => {
                warn!("API key validation failed: {e}");
                false
            }
        }
    }

    async fn summary_chain(
        &self,
        prompt: &str,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
        locale: Locale,
    ) -> Option<Summary> {
        if keys.is_empty() {
            warn!("No API keys configured; skipping summary generation");
            return None;
        }

        let categories = locale.categories();
        for key in keys {
            let request = ProviderRequest {
                api_key: &key.key,
                base_url: key.base_url.as_deref(),
                model: effective_model(key, fallback_model),
                system: Some(prompts::SUMMARY_SYSTEM),
                prompt,
                mode: ResponseMode::Json {
                    categories: Some(categories),
                },
            };

            let outcome = match send_request(&self.http, key.provider, &request).await {
                Ok(raw) => parse_summary(&raw),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(summary) => return Some(summary),
                Err(e) => warn!(
                    "API key \"{}\" ({:?}) failed, trying next key: {e}",
                    key.name, key.provider
                ),
            }
        }

        error!("Summary generation exhausted all {} keys", keys.len());
        None
    }
}

impl Default for SummaryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummaryGenerator for SummaryClient {
    async fn generate_summary(
        &self,
        project_name: &str,
        source_text: &str,
        keys: &[ApiKeyEntry],
        fallback_model: Option<&str>,
        custom_instruction: Option<&str>,
        locale: Locale,
    ) -> Option<Summary> {
        SummaryClient::generate_summary(
            self,
            project_name,
            source_text,
            keys,
            fallback_model,
            custom_instruction,
            locale,
        )
        .await
    }
}

/// Effective model for a key: the key's own model, else the settings-level
/// fallback, else the provider's built-in default.
fn effective_model<'a>(key: &'a ApiKeyEntry, fallback_model: Option<&'a str>) -> &'a str {
    key.default_model
        .as_deref()
        .filter(|m| !m.is_empty())
        .or_else(|| fallback_model.filter(|m| !m.is_empty()))
        .unwrap_or(default_model(key.provider))
}

fn default_model(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Gemini => GEMINI_DEFAULT_MODEL,
        AiProvider::OpenAi => OPENAI_DEFAULT_MODEL,
    }
}

/// Parses raw provider output into a Summary, rejecting structurally empty
/// results so the chain falls over to the next key.
fn parse_summary(raw: &str) -> Result<Summary, ProviderError> {
    let text = strip_json_fences(raw);
    let summary: Summary = serde_json::from_str(text)?;
    if summary.catchy_title.trim().is_empty() || summary.introduction.trim().is_empty() {
        return Err(ProviderError::MalformedSummary);
    }
    Ok(summary)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
