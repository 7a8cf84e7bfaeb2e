//! Item Store — the ordered, capped, persisted collection of display items.
//!
//! The store is the only mutable shared resource in the service. Mutations
//! are synchronous critical sections (no awaiting while a guard is held) and
//! each one rewrites the on-disk snapshot before returning, so a crash never
//! loses more than the in-flight mutation.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::item::{CustomItem, DisplayItem, ItemId, RepoItem};
use crate::models::locale::Locale;
use crate::models::repo::RepoDescriptor;
use crate::models::summary::{fallback_summary, Summary, SummaryVersion};

/// Bump when the snapshot layout changes; unknown versions are discarded.
const SNAPSHOT_VERSION: u32 = 1;

/// Persistence cap. Applies only to the serialized snapshot — the live
/// in-memory list is never truncated.
pub const MAX_STORED_ITEMS: usize = 100;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    items: Vec<DisplayItem>,
}

pub struct ItemStore {
    items: Vec<DisplayItem>,
    path: Option<PathBuf>,
    cap: usize,
}

impl ItemStore {
    /// In-memory store with no persistence (tests, tooling).
    pub fn in_memory() -> Self {
        Self {
            items: Vec::new(),
            path: None,
            cap: MAX_STORED_ITEMS,
        }
    }

    /// Loads the persisted snapshot, or starts empty when the file is
    /// missing, malformed, or from an unknown format version.
    pub fn restore(path: PathBuf) -> Self {
        let items = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                    info!("Restored {} items from {}", snapshot.items.len(), path.display());
                    snapshot.items
                }
                Ok(snapshot) => {
                    warn!(
                        "Discarding snapshot with unknown version {} at {}",
                        snapshot.version,
                        path.display()
                    );
                    Vec::new()
                }
                Err(e) => {
                    warn!("Discarding malformed snapshot at {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            items,
            path: Some(path),
            cap: MAX_STORED_ITEMS,
        }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&DisplayItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Ids of repository items still carrying their fallback summary — the
    /// restore-time re-enqueue set.
    pub fn fallback_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| matches!(item, DisplayItem::Repo(_)))
            .filter(|item| item.summary().is_fallback())
            .map(|item| item.id())
            .collect()
    }

    /// Inserts a placeholder item for each descriptor not already present,
    /// preserving arrival order. Returns the ids actually inserted.
    pub fn insert_placeholders(
        &mut self,
        descriptors: Vec<RepoDescriptor>,
        locale: Locale,
    ) -> Vec<ItemId> {
        let existing: HashSet<ItemId> = self.items.iter().map(|item| item.id()).collect();

        let mut inserted = Vec::new();
        for repo in descriptors {
            let id = ItemId::Repo(repo.id);
            if existing.contains(&id) || inserted.contains(&id) {
                continue;
            }
            let rank = self.items.len() + 1;
            self.items.push(DisplayItem::Repo(RepoItem {
                ai_summary: fallback_summary(&repo, locale),
                repo,
                rank,
                image_url: None,
                readme_content: None,
                collected_at: Utc::now(),
                modification_history: Vec::new(),
            }));
            inserted.push(id);
        }

        if !inserted.is_empty() {
            self.persist();
        }
        inserted
    }

    pub fn insert_custom(&mut self, item: CustomItem) {
        self.items.push(DisplayItem::Custom(item));
        self.persist();
    }

    /// Writes an enrichment result back into an item.
    ///
    /// A missing id (e.g. deleted while the enrichment was in flight) is a
    /// silent no-op. An existing preview image is never cleared — only
    /// replaced when the enrichment found a new one.
    pub fn merge_enrichment(
        &mut self,
        id: ItemId,
        summary: Summary,
        preview_image: Option<String>,
        readme: Option<String>,
    ) {
        let Some(DisplayItem::Repo(item)) = self.items.iter_mut().find(|item| item.id() == id)
        else {
            return;
        };

        item.ai_summary = summary;
        if preview_image.is_some() {
            item.image_url = preview_image;
        }
        if readme.is_some() {
            item.readme_content = readme;
        }
        self.persist();
    }

    /// Overwrites an item's summary, recording the prior version in the
    /// item's history (repository items only — custom items keep no
    /// history). Returns false when the id is unknown.
    pub fn record_new_summary(&mut self, id: ItemId, summary: Summary) -> bool {
        let found = match self.items.iter_mut().find(|item| item.id() == id) {
            Some(DisplayItem::Repo(item)) => {
                item.modification_history.push(SummaryVersion {
                    summary: item.ai_summary.clone(),
                    modified_at: Utc::now(),
                });
                item.ai_summary = summary;
                true
            }
            Some(DisplayItem::Custom(item)) => {
                item.ai_summary = summary;
                true
            }
            None => false,
        };

        if found {
            self.persist();
        }
        found
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        let removed = self.items.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn remove_many(&mut self, ids: &HashSet<ItemId>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id()));
        let removed = before - self.items.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Serializes the collection to disk, truncated to the capacity cap.
    /// Best-effort: failures are logged, never propagated — matching the
    /// durability the rest of the pipeline is designed around.
    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            items: self.snapshot_items(),
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize item snapshot: {e}");
                return;
            }
        };

        let tmp = path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, json) {
            warn!("Failed to write item snapshot to {}: {e}", tmp.display());
            return;
        }
        if let Err(e) = fs::rename(&tmp, path) {
            warn!("Failed to move item snapshot into place: {e}");
        }
    }

    /// Applies the eviction policy: every user-edited item survives, then
    /// the most recently discovered remainder fills the capacity.
    fn snapshot_items(&self) -> Vec<DisplayItem> {
        if self.items.len() <= self.cap {
            return self.items.clone();
        }

        let mut keep: HashSet<ItemId> = self
            .items
            .iter()
            .filter(|item| item.is_edited())
            .map(|item| item.id())
            .collect();

        let mut budget = self.cap.saturating_sub(keep.len());
        for item in self.items.iter().rev() {
            if budget == 0 {
                break;
            }
            if keep.insert(item.id()) {
                budget -= 1;
            }
        }

        self.items
            .iter()
            .filter(|item| keep.contains(&item.id()))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn with_cap(path: Option<PathBuf>, cap: usize) -> Self {
        Self {
            items: Vec::new(),
            path,
            cap,
        }
    }
}

/// Shared handle over the store. Lock poisoning is recovered rather than
/// propagated — a panicked writer leaves the collection in whatever state
/// its last synchronous step reached, which is still internally consistent.
#[derive(Clone)]
pub struct SharedStore(Arc<RwLock<ItemStore>>);

impl SharedStore {
    pub fn new(store: ItemStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ItemStore> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ItemStore> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::repo::RepoOwner;
    use crate::models::summary::Provenance;

    fn descriptor(id: u64, name: &str) -> RepoDescriptor {
        RepoDescriptor {
            id,
            name: name.to_string(),
            full_name: format!("owner/{name}"),
            owner: RepoOwner {
                login: "owner".to_string(),
                avatar_url: None,
            },
            html_url: format!("https://github.com/owner/{name}"),
            description: Some("a description".to_string()),
            stargazers_count: 10,
            forks_count: 1,
            language: Some("Rust".to_string()),
            topics: vec![],
            updated_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn generated_summary(title: &str) -> Summary {
        Summary {
            catchy_title: title.to_string(),
            category: "CLI Tools".to_string(),
            introduction: "An intro.".to_string(),
            core_features: vec!["fast".to_string()],
            tech_stack: "Rust".to_string(),
            provenance: Provenance::Generated,
        }
    }

    #[test]
    fn test_insert_dedups_by_id() {
        let mut store = ItemStore::in_memory();
        let inserted =
            store.insert_placeholders(vec![descriptor(1, "a"), descriptor(2, "b")], Locale::En);
        assert_eq!(inserted.len(), 2);

        // Same ids again, plus one genuinely new, plus an in-batch duplicate.
        let inserted = store.insert_placeholders(
            vec![descriptor(1, "a"), descriptor(3, "c"), descriptor(3, "c")],
            Locale::En,
        );
        assert_eq!(inserted, vec![ItemId::Repo(3)]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_placeholder_carries_fallback_summary() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(42, "foo")], Locale::En);

        let item = store.get(ItemId::Repo(42)).unwrap();
        assert!(item.summary().is_fallback());
        assert_eq!(item.summary().catchy_title, "foo");
    }

    #[test]
    fn test_merge_replaces_summary_in_place() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(42, "foo")], Locale::En);

        store.merge_enrichment(
            ItemId::Repo(42),
            generated_summary("Foo Rocks"),
            Some("https://example.com/shot.png".to_string()),
            Some("# readme".to_string()),
        );

        let DisplayItem::Repo(item) = store.get(ItemId::Repo(42)).unwrap() else {
            panic!("expected repo item");
        };
        assert_eq!(item.ai_summary.catchy_title, "Foo Rocks");
        assert!(!item.ai_summary.is_fallback());
        assert_eq!(item.image_url.as_deref(), Some("https://example.com/shot.png"));
        assert_eq!(item.readme_content.as_deref(), Some("# readme"));
    }

    #[test]
    fn test_merge_unknown_id_is_silent_noop() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(1, "a")], Locale::En);
        store.merge_enrichment(ItemId::Repo(999), generated_summary("x"), None, None);
        assert_eq!(store.len(), 1);
        assert!(store.get(ItemId::Repo(1)).unwrap().summary().is_fallback());
    }

    #[test]
    fn test_merge_never_clears_existing_image() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(1, "a")], Locale::En);

        store.merge_enrichment(
            ItemId::Repo(1),
            generated_summary("first"),
            Some("https://example.com/keep.png".to_string()),
            None,
        );
        // A later merge without an image must not wipe the existing one.
        store.merge_enrichment(ItemId::Repo(1), generated_summary("second"), None, None);

        let DisplayItem::Repo(item) = store.get(ItemId::Repo(1)).unwrap() else {
            panic!("expected repo item");
        };
        assert_eq!(item.image_url.as_deref(), Some("https://example.com/keep.png"));
        assert_eq!(item.ai_summary.catchy_title, "second");
    }

    #[test]
    fn test_record_new_summary_pushes_history() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(1, "a")], Locale::En);

        assert!(store.record_new_summary(ItemId::Repo(1), generated_summary("edited")));
        let DisplayItem::Repo(item) = store.get(ItemId::Repo(1)).unwrap() else {
            panic!("expected repo item");
        };
        assert_eq!(item.modification_history.len(), 1);
        assert!(item.modification_history[0].summary.is_fallback());
        assert_eq!(item.ai_summary.catchy_title, "edited");

        assert!(!store.record_new_summary(ItemId::Repo(404), generated_summary("x")));
    }

    #[test]
    fn test_remove_and_remove_many() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(
            vec![descriptor(1, "a"), descriptor(2, "b"), descriptor(3, "c")],
            Locale::En,
        );

        assert!(store.remove(ItemId::Repo(2)));
        assert!(!store.remove(ItemId::Repo(2)));

        let ids: HashSet<ItemId> = [ItemId::Repo(1), ItemId::Repo(3), ItemId::Repo(9)]
            .into_iter()
            .collect();
        assert_eq!(store.remove_many(&ids), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_fallback_ids_skips_enriched_items() {
        let mut store = ItemStore::in_memory();
        store.insert_placeholders(vec![descriptor(1, "a"), descriptor(2, "b")], Locale::En);
        store.merge_enrichment(ItemId::Repo(1), generated_summary("done"), None, None);

        assert_eq!(store.fallback_ids(), vec![ItemId::Repo(2)]);
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");

        let mut store = ItemStore::restore(path.clone());
        store.insert_placeholders(vec![descriptor(1, "a"), descriptor(2, "b")], Locale::En);
        store.merge_enrichment(ItemId::Repo(1), generated_summary("done"), None, None);

        let restored = ItemStore::restore(path);
        assert_eq!(restored.len(), 2);
        assert_eq!(
            restored.get(ItemId::Repo(1)).unwrap().summary().catchy_title,
            "done"
        );
        assert!(restored.get(ItemId::Repo(2)).unwrap().summary().is_fallback());
    }

    #[test]
    fn test_restore_malformed_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "{not json").unwrap();

        let store = ItemStore::restore(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_unknown_version_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(
            &path,
            r#"{"version": 99, "savedAt": "2024-05-01T12:00:00Z", "items": []}"#,
        )
        .unwrap();

        let store = ItemStore::restore(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_cap_drops_oldest_unedited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");

        let mut store = ItemStore::with_cap(Some(path.clone()), 3);
        store.insert_placeholders(
            (1..=5).map(|i| descriptor(i, &format!("r{i}"))).collect(),
            Locale::En,
        );
        // Item 1 is oldest but user-edited: it must survive the cap.
        store.record_new_summary(ItemId::Repo(1), generated_summary("edited"));

        let restored = ItemStore::restore(path);
        assert_eq!(restored.len(), 3);
        assert!(restored.contains(ItemId::Repo(1)));
        assert!(restored.contains(ItemId::Repo(5)));
        assert!(restored.contains(ItemId::Repo(4)));
        assert!(!restored.contains(ItemId::Repo(2)));
        assert!(!restored.contains(ItemId::Repo(3)));
        // The live store itself is never truncated.
        assert_eq!(store.len(), 5);
    }
}
