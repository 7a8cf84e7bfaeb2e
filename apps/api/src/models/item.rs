//! Display items — the unit held in the item store.
//!
//! A tagged union over the two content sources: repositories discovered via
//! the GitHub search API and custom items produced from scraped text. The
//! serialized form uses a `sourceType` discriminator so snapshots stay
//! readable by anything that consumed the feed before.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::repo::RepoDescriptor;
use crate::models::summary::{Summary, SummaryVersion};

/// Identity of a display item, unique within the store.
///
/// GitHub items reuse the platform's numeric repository id; custom items get
/// a generated UUID. Untagged serde keeps snapshots as plain numbers/strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Repo(u64),
    Custom(Uuid),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Repo(id) => write!(f, "{id}"),
            ItemId::Custom(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for ItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(numeric) = s.parse::<u64>() {
            return Ok(ItemId::Repo(numeric));
        }
        Uuid::parse_str(s)
            .map(ItemId::Custom)
            .map_err(|_| format!("'{s}' is not a repository id or item UUID"))
    }
}

/// A discovered repository plus its enrichment bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoItem {
    #[serde(flatten)]
    pub repo: RepoDescriptor,
    pub ai_summary: Summary,
    /// Position in the discovery order at collection time.
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Raw long-form description; `None` until enrichment fetched it (or the
    /// repository simply has none).
    #[serde(default)]
    pub readme_content: Option<String>,
    pub collected_at: DateTime<Utc>,
    /// Prior summary versions, newest last. Non-empty means the user edited
    /// or regenerated this item.
    #[serde(default)]
    pub modification_history: Vec<SummaryVersion>,
}

/// An item produced from scraped text rather than repository discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomItem {
    pub id: Uuid,
    pub original_url: String,
    pub ai_summary: Summary,
    pub created_at: DateTime<Utc>,
}

/// The unit held in the item store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "sourceType")]
pub enum DisplayItem {
    #[serde(rename = "github")]
    Repo(RepoItem),
    #[serde(rename = "custom")]
    Custom(CustomItem),
}

impl DisplayItem {
    pub fn id(&self) -> ItemId {
        match self {
            DisplayItem::Repo(item) => ItemId::Repo(item.repo.id),
            DisplayItem::Custom(item) => ItemId::Custom(item.id),
        }
    }

    pub fn summary(&self) -> &Summary {
        match self {
            DisplayItem::Repo(item) => &item.ai_summary,
            DisplayItem::Custom(item) => &item.ai_summary,
        }
    }

    /// True when the user has edited or regenerated this item's summary.
    /// Custom items carry no history and always report false.
    pub fn is_edited(&self) -> bool {
        match self {
            DisplayItem::Repo(item) => !item.modification_history.is_empty(),
            DisplayItem::Custom(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::locale::Locale;
    use crate::models::repo::RepoOwner;
    use crate::models::summary::fallback_summary;

    fn repo_item(id: u64) -> RepoItem {
        let repo = RepoDescriptor {
            id,
            name: "foo".to_string(),
            full_name: "bar/foo".to_string(),
            owner: RepoOwner {
                login: "bar".to_string(),
                avatar_url: None,
            },
            html_url: "https://github.com/bar/foo".to_string(),
            description: Some("desc".to_string()),
            stargazers_count: 10,
            forks_count: 1,
            language: Some("Rust".to_string()),
            topics: vec![],
            updated_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        };
        RepoItem {
            ai_summary: fallback_summary(&repo, Locale::En),
            repo,
            rank: 1,
            image_url: None,
            readme_content: None,
            collected_at: Utc::now(),
            modification_history: vec![],
        }
    }

    #[test]
    fn test_display_item_tagged_by_source_type() {
        let item = DisplayItem::Repo(repo_item(42));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["sourceType"], "github");
        // Flattened descriptor fields stay at the top level.
        assert_eq!(json["full_name"], "bar/foo");
        assert_eq!(json["aiSummary"]["catchyTitle"], "foo");

        let custom = DisplayItem::Custom(CustomItem {
            id: Uuid::new_v4(),
            original_url: "https://example.com/post".to_string(),
            ai_summary: serde_json::from_value(json["aiSummary"].clone()).unwrap(),
            created_at: Utc::now(),
        });
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["sourceType"], "custom");
    }

    #[test]
    fn test_display_item_round_trips() {
        let item = DisplayItem::Repo(repo_item(42));
        let json = serde_json::to_string(&item).unwrap();
        let back: DisplayItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), ItemId::Repo(42));
        assert!(back.summary().is_fallback());
    }

    #[test]
    fn test_item_id_parses_numeric_then_uuid() {
        assert_eq!("12345".parse::<ItemId>().unwrap(), ItemId::Repo(12345));

        let uuid = Uuid::new_v4();
        assert_eq!(
            uuid.to_string().parse::<ItemId>().unwrap(),
            ItemId::Custom(uuid)
        );

        assert!("not-an-id".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_item_id_display_round_trips() {
        let repo = ItemId::Repo(99);
        assert_eq!(repo.to_string().parse::<ItemId>().unwrap(), repo);

        let custom = ItemId::Custom(Uuid::new_v4());
        assert_eq!(custom.to_string().parse::<ItemId>().unwrap(), custom);
    }

    #[test]
    fn test_is_edited_tracks_history() {
        let mut item = repo_item(1);
        assert!(!DisplayItem::Repo(item.clone()).is_edited());

        item.modification_history.push(SummaryVersion {
            summary: item.ai_summary.clone(),
            modified_at: Utc::now(),
        });
        assert!(DisplayItem::Repo(item).is_edited());
    }
}
