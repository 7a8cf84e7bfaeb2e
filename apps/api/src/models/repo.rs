use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository owner as reported by the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Immutable snapshot of a repository from the GitHub search API.
///
/// Fetched fresh on every page request and never mutated afterwards — all
/// app-side bookkeeping lives on `DisplayItem`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
