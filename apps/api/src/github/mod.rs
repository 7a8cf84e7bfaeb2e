//! Repository Source Client — the only module that talks to the GitHub API.
//!
//! Two operations: paginated "created in the last week, hottest first"
//! search, and raw README retrieval. Rate-limit exhaustion is a distinct
//! error so callers can pause polling and prompt for a token instead of
//! retrying blindly.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub mod readme;

pub use readme::extract_preview_image;

use crate::models::repo::RepoDescriptor;

const GITHUB_API_URL: &str = "https://api.github.com";
const SEARCH_ACCEPT: &str = "application/vnd.github.v3+json";
/// Raw media type returns the decoded README body directly, no base64.
const README_ACCEPT: &str = "application/vnd.github.v3.raw";
const USER_AGENT: &str = concat!("repopulse-api/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Search window: repositories created within the trailing week.
const CREATED_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub API rate limit exceeded")]
    RateLimited,

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct RepoPage {
    pub items: Vec<RepoDescriptor>,
    pub has_more: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<RepoDescriptor>,
}

/// Seam for the pagination controller; lets tests feed pages without a
/// network.
#[async_trait]
pub trait RepoSearch: Send + Sync {
    async fn list_recent(
        &self,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<RepoPage, GithubError>;
}

/// Seam for the enrichment scheduler's README fetch.
#[async_trait]
pub trait ReadmeSource: Send + Sync {
    async fn fetch_readme(&self, full_name: &str, token: Option<&str>) -> Option<String>;
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: String,
}

impl GithubClient {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_URL)
    }

    /// Client against a non-default API root (GitHub Enterprise, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    /// Fetches one page of repositories created within the trailing week,
    /// sorted by stars descending.
    pub async fn list_recent(
        &self,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<RepoPage, GithubError> {
        let query = format!("created:>{}", one_week_ago());
        let url = format!("{}/search/repositories", self.base_url);

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, SEARCH_ACCEPT)
            .query(&[
                ("q", query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
            ])
            .query(&[("per_page", per_page), ("page", page)]);

        if let Some(token) = auth_token(token) {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN && rate_limit_exhausted(&response) {
            return Err(GithubError::RateLimited);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: SearchResponse = response.json().await?;
        Ok(RepoPage {
            has_more: page_has_more(page, per_page, data.total_count),
            items: data.items,
        })
    }

    /// Fetches a repository's README as raw text.
    ///
    /// Returns `None` for 404 (no README is a normal condition) and for any
    /// other failure — this call must never surface an error to the feed.
    pub async fn fetch_readme(&self, full_name: &str, token: Option<&str>) -> Option<String> {
        let url = format!("{}/repos/{}/readme", self.base_url, full_name);

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, README_ACCEPT);

        if let Some(token) = auth_token(token) {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("README request for {full_name} failed: {e}");
                return None;
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("README not found for {full_name}");
            return None;
        }
        if !status.is_success() {
            warn!("README fetch for {full_name} returned {status}");
            return None;
        }

        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to read README body for {full_name}: {e}");
                None
            }
        }
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoSearch for GithubClient {
    async fn list_recent(
        &self,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<RepoPage, GithubError> {
        GithubClient::list_recent(self, page, per_page, token).await
    }
}

#[async_trait]
impl ReadmeSource for GithubClient {
    async fn fetch_readme(&self, full_name: &str, token: Option<&str>) -> Option<String> {
        GithubClient::fetch_readme(self, full_name, token).await
    }
}

/// `has_more` per the search API contract: more pages exist while the items
/// seen so far fall short of the reported total.
fn page_has_more(page: u32, per_page: u32, total_count: u64) -> bool {
    (page as u64) * (per_page as u64) < total_count
}

/// Lower bound of the search window, formatted for a `created:>` qualifier.
fn one_week_ago() -> String {
    (Utc::now() - Duration::days(CREATED_WINDOW_DAYS))
        .format("%Y-%m-%d")
        .to_string()
}

/// A 403 whose remaining-quota header reads zero — or that carries no such
/// header, which is how secondary limits arrive — counts as rate limiting.
fn rate_limit_exhausted(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map_or(true, |remaining| remaining == "0")
}

fn auth_token(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|t| !t.is_empty())
}
