//! Provider strategies — one wire shape per provider family behind a single
//! dispatch function.
//!
//! Gemini gets a structured response schema (the category enum is enforced
//! server-side); OpenAI-compatible endpoints get JSON-object mode and rely on
//! best-effort parsing. Both return the raw response text; parsing and
//! validation stay provider-agnostic in the client.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::keys::AiProvider;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
const GEMINI_DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("summary is missing required fields")]
    MalformedSummary,
}

/// What shape of response the caller wants.
#[derive(Debug, Clone, Copy)]
pub enum ResponseMode<'a> {
    /// Free-form text (translation, key validation).
    Text,
    /// A JSON object; when a category enumeration is given, providers with
    /// schema support constrain the `category` field to it.
    Json {
        categories: Option<&'a [&'a str]>,
    },
}

/// One normalized outbound request, dispatched by provider tag.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub api_key: &'a str,
    pub base_url: Option<&'a str>,
    pub model: &'a str,
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub mode: ResponseMode<'a>,
}

/// Sends one request to the provider a key belongs to and returns the raw
/// response text.
pub async fn send_request(
    http: &Client,
    provider: AiProvider,
    request: &ProviderRequest<'_>,
) -> Result<String, ProviderError> {
    match provider {
        AiProvider::Gemini => call_gemini(http, request).await,
        AiProvider::OpenAi => call_openai_compatible(http, request).await,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

async fn call_openai_compatible(
    http: &Client,
    request: &ProviderRequest<'_>,
) -> Result<String, ProviderError> {
    let base = normalize_base_url(request.base_url.unwrap_or(OPENAI_DEFAULT_BASE));
    let endpoint = format!("{base}/chat/completions");
    let body = openai_body(request);

    let response = http
        .post(&endpoint)
        .bearer_auth(request.api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ChatResponse = response.json().await?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyContent)
}

fn openai_body(request: &ProviderRequest<'_>) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "temperature": TEMPERATURE,
    });

    if matches!(request.mode, ResponseMode::Json { .. }) {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

/// Users enter the "base" base URL; the standard path layout expects a
/// trailing `/v1` segment, so append one unless it is already there.
fn normalize_base_url(raw: &str) -> String {
    let clean = raw.trim_end_matches('/');
    if clean.contains("/v1") {
        clean.to_string()
    } else {
        format!("{clean}/v1")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Google Gemini
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

async fn call_gemini(
    http: &Client,
    request: &ProviderRequest<'_>,
) -> Result<String, ProviderError> {
    let base = request
        .base_url
        .unwrap_or(GEMINI_DEFAULT_BASE)
        .trim_end_matches('/');
    let endpoint = format!("{base}/v1beta/models/{}:generateContent", request.model);
    let body = gemini_body(request);

    let response = http
        .post(&endpoint)
        .header("x-goog-api-key", request.api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: GeminiResponse = response.json().await?;
    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyContent)
}

fn gemini_body(request: &ProviderRequest<'_>) -> Value {
    let mut body = json!({
        "contents": [{"parts": [{"text": request.prompt}]}],
    });

    match request.mode {
        ResponseMode::Text => {}
        ResponseMode::Json { categories } => {
            let mut config = json!({"responseMimeType": "application/json"});
            if let Some(categories) = categories {
                config["responseSchema"] = summary_schema(categories);
            }
            body["generationConfig"] = config;
        }
    }
    body
}

/// Response schema matching the Summary shape, with the category constrained
/// to the active locale's enumeration.
fn summary_schema(categories: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "catchyTitle": {"type": "STRING"},
            "category": {"type": "STRING", "enum": categories},
            "introduction": {"type": "STRING"},
            "coreFeatures": {"type": "ARRAY", "items": {"type": "STRING"}},
            "techStack": {"type": "STRING"}
        },
        "required": ["catchyTitle", "category", "introduction", "coreFeatures", "techStack"]
    })
}
