//! Feed/Pagination Controller — drives discovery against the search API.
//!
//! Owns the page cursor and `has_more` flag, deduplicates each page against
//! the item store, inserts survivors as placeholders, and hands their ids to
//! the enrichment scheduler. Page loads are single-flight (an `is_loading`
//! guard, not a queue) and independent of enrichment ticks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod handlers;

use crate::github::{GithubError, RepoSearch};
use crate::scheduler::EnrichmentScheduler;
use crate::settings::SharedSettings;
use crate::store::SharedStore;

/// Items requested per search page.
pub const PAGE_SIZE: u32 = 15;

const STAMP_VERSION: u32 = 1;

/// Persisted marker of the last successful full (page-1) fetch.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchStamp {
    version: u32,
    last_full_fetch: DateTime<Utc>,
}

struct FeedState {
    /// Next page to request.
    page: u32,
    has_more: bool,
    loading: bool,
    rate_limited: bool,
    last_full_fetch: Option<DateTime<Utc>>,
}

/// Outcome of a load attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { inserted: usize },
    /// Another load is already in flight; nothing was done.
    AlreadyLoading,
    /// The source reported no further pages.
    Exhausted,
}

/// Reported to the presentation layer alongside the items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub has_more: bool,
    pub rate_limited: bool,
    pub is_loading: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
}

pub struct FeedController {
    state: Mutex<FeedState>,
    stamp_path: Option<PathBuf>,
    search: Arc<dyn RepoSearch>,
    store: SharedStore,
    scheduler: EnrichmentScheduler,
    settings: SharedSettings,
}

impl FeedController {
    pub fn new(
        stamp_path: Option<PathBuf>,
        search: Arc<dyn RepoSearch>,
        store: SharedStore,
        scheduler: EnrichmentScheduler,
        settings: SharedSettings,
    ) -> Self {
        let last_full_fetch = stamp_path.as_ref().and_then(|path| read_stamp(path));
        Self {
            state: Mutex::new(FeedState {
                page: 1,
                has_more: true,
                loading: false,
                rate_limited: false,
                last_full_fetch,
            }),
            stamp_path,
            search,
            store,
            scheduler,
            settings,
        }
    }

    pub fn status(&self) -> FeedStatus {
        let state = self.lock_state();
        FeedStatus {
            has_more: state.has_more,
            rate_limited: state.rate_limited,
            is_loading: state.loading,
            last_refreshed: state.last_full_fetch,
        }
    }

    /// Fetches page 1, inserts anything new, and resets the cursor so
    /// `load_next` continues from page 2. Also records the full-fetch stamp.
    pub async fn refresh(&self) -> Result<LoadOutcome, GithubError> {
        {
            let mut state = self.lock_state();
            if state.loading {
                return Ok(LoadOutcome::AlreadyLoading);
            }
            state.loading = true;
        }

        let token = self.settings.github_token();
        let result = self.search.list_recent(1, PAGE_SIZE, token.as_deref()).await;

        match result {
            Ok(page) => {
                let inserted = self.absorb_page(page.items);
                let stamp = Utc::now();
                {
                    let mut state = self.lock_state();
                    state.loading = false;
                    state.rate_limited = false;
                    state.has_more = page.has_more;
                    state.page = 2;
                    state.last_full_fetch = Some(stamp);
                }
                self.write_stamp(stamp);
                info!("Feed refreshed: {inserted} new item(s)");
                Ok(LoadOutcome::Loaded { inserted })
            }
            Err(e) => {
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    /// Loads the next page. No-op while a load is in flight or when the
    /// source reported no further pages.
    pub async fn load_next(&self) -> Result<LoadOutcome, GithubError> {
        let page = {
            let mut state = self.lock_state();
            if state.loading {
                return Ok(LoadOutcome::AlreadyLoading);
            }
            if !state.has_more {
                return Ok(LoadOutcome::Exhausted);
            }
            state.loading = true;
            state.page
        };

        let token = self.settings.github_token();
        let result = self
            .search
            .list_recent(page, PAGE_SIZE, token.as_deref())
            .await;

        match result {
            Ok(result_page) => {
                let inserted = self.absorb_page(result_page.items);
                let mut state = self.lock_state();
                state.loading = false;
                state.rate_limited = false;
                state.has_more = result_page.has_more;
                state.page = page + 1;
                info!("Loaded page {page}: {inserted} new item(s)");
                Ok(LoadOutcome::Loaded { inserted })
            }
            Err(e) => {
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    /// Inserts survivors of store dedup as placeholders and queues them for
    /// enrichment. Returns how many were actually new.
    fn absorb_page(&self, items: Vec<crate::models::repo::RepoDescriptor>) -> usize {
        let locale = self.settings.locale();
        let inserted = self.store.write().insert_placeholders(items, locale);
        let count = inserted.len();
        self.scheduler.enqueue_discovered(inserted);
        count
    }

    /// Rate limiting is sticky state the UI must act on; anything else is a
    /// transient failure the user may simply retry.
    fn note_failure(&self, error: &GithubError) {
        let mut state = self.lock_state();
        state.loading = false;
        if matches!(error, GithubError::RateLimited) {
            state.rate_limited = true;
            warn!("Search API rate limited; pausing pagination until reconfigured");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_stamp(&self, at: DateTime<Utc>) {
        let Some(path) = &self.stamp_path else {
            return;
        };
        let stamp = FetchStamp {
            version: STAMP_VERSION,
            last_full_fetch: at,
        };
        match serde_json::to_string(&stamp) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("Failed to write fetch stamp to {}: {e}", path.display());
                }
            }
            Err(e) => warn!("Failed to serialize fetch stamp: {e}"),
        }
    }
}

fn read_stamp(path: &Path) -> Option<DateTime<Utc>> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<FetchStamp>(&raw) {
        Ok(stamp) if stamp.version == STAMP_VERSION => Some(stamp.last_full_fetch),
        Ok(_) | Err(_) => {
            warn!("Discarding unreadable fetch stamp at {}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::github::RepoPage;
    use crate::models::item::ItemId;
    use crate::models::repo::{RepoDescriptor, RepoOwner};
    use crate::settings::{Settings, SettingsStore};
    use crate::store::ItemStore;

    fn descriptor(id: u64) -> RepoDescriptor {
        RepoDescriptor {
            id,
            name: format!("repo{id}"),
            full_name: format!("owner/repo{id}"),
            owner: RepoOwner {
                login: "owner".to_string(),
                avatar_url: None,
            },
            html_url: format!("https://github.com/owner/repo{id}"),
            description: None,
            stargazers_count: 0,
            forks_count: 0,
            language: None,
            topics: vec![],
            updated_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        }
    }

    struct FakeSearch {
        pages: Mutex<Vec<Result<RepoPage, GithubError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeSearch {
        fn scripted(pages: Vec<Result<RepoPage, GithubError>>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages),
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }
    }

    #[async_trait]
    impl RepoSearch for FakeSearch {
        async fn list_recent(
            &self,
            _page: u32,
            _per_page: u32,
            _token: Option<&str>,
        ) -> Result<RepoPage, GithubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.pages.lock().unwrap().remove(0)
        }
    }

    fn controller(search: Arc<FakeSearch>) -> (FeedController, SharedStore, EnrichmentScheduler) {
        let store = SharedStore::new(ItemStore::in_memory());
        let scheduler = EnrichmentScheduler::new();
        let settings = Arc::new(SettingsStore::in_memory(Settings::default()));
        let feed = FeedController::new(
            None,
            search,
            store.clone(),
            scheduler.clone(),
            settings,
        );
        (feed, store, scheduler)
    }

    #[tokio::test]
    async fn test_load_next_inserts_and_advances() {
        let search = FakeSearch::scripted(vec![
            Ok(RepoPage {
                items: vec![descriptor(1), descriptor(2)],
                has_more: true,
            }),
            Ok(RepoPage {
                items: vec![descriptor(3)],
                has_more: false,
            }),
        ]);
        let (feed, store, scheduler) = controller(search.clone());

        let outcome = feed.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { inserted: 2 });
        assert_eq!(store.read().len(), 2);
        assert_eq!(scheduler.queued_len(), 2);
        assert!(feed.status().has_more);

        let outcome = feed.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { inserted: 1 });
        assert!(!feed.status().has_more);

        // Exhausted: no further search calls happen.
        let outcome = feed.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Exhausted);
        assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_next_dedups_against_store() {
        let search = FakeSearch::scripted(vec![
            Ok(RepoPage {
                items: vec![descriptor(1), descriptor(2)],
                has_more: true,
            }),
            // Page overlap: id 2 again plus a fresh id.
            Ok(RepoPage {
                items: vec![descriptor(2), descriptor(3)],
                has_more: true,
            }),
        ]);
        let (feed, store, _) = controller(search);

        feed.load_next().await.unwrap();
        let outcome = feed.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { inserted: 1 });
        assert_eq!(store.read().len(), 3);
        assert!(store.read().contains(ItemId::Repo(3)));
    }

    #[tokio::test]
    async fn test_rate_limited_sets_sticky_state() {
        let search = FakeSearch::scripted(vec![Err(GithubError::RateLimited)]);
        let (feed, store, _) = controller(search);

        let result = feed.load_next().await;
        assert!(matches!(result, Err(GithubError::RateLimited)));
        assert!(feed.status().rate_limited);
        assert!(store.read().is_empty());
        // The guard was released; the controller is not wedged.
        assert!(!feed.status().is_loading);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_rate_limited_state() {
        let search = FakeSearch::scripted(vec![Err(GithubError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        })]);
        let (feed, _, _) = controller(search);

        let result = feed.load_next().await;
        assert!(matches!(result, Err(GithubError::Api { .. })));
        assert!(!feed.status().rate_limited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_are_single_flight() {
        let search = Arc::new(FakeSearch {
            pages: Mutex::new(vec![Ok(RepoPage {
                items: vec![descriptor(1)],
                has_more: true,
            })]),
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(200)),
        });
        let (feed, _, _) = controller(search.clone());
        let feed = Arc::new(feed);

        let first = tokio::spawn({
            let feed = feed.clone();
            async move { feed.load_next().await.unwrap() }
        });
        // Give the first load a chance to take the guard.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = feed.load_next().await.unwrap();

        assert_eq!(second, LoadOutcome::AlreadyLoading);
        assert_eq!(first.await.unwrap(), LoadOutcome::Loaded { inserted: 1 });
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_resets_cursor_and_stamps() {
        let dir = tempfile::tempdir().unwrap();
        let stamp_path = dir.path().join("last_fetch.json");

        let search = FakeSearch::scripted(vec![
            Ok(RepoPage {
                items: vec![descriptor(1)],
                has_more: true,
            }),
            Ok(RepoPage {
                items: vec![descriptor(2)],
                has_more: true,
            }),
        ]);
        let store = SharedStore::new(ItemStore::in_memory());
        let scheduler = EnrichmentScheduler::new();
        let settings = Arc::new(SettingsStore::in_memory(Settings::default()));
        let feed = FeedController::new(
            Some(stamp_path.clone()),
            search,
            store,
            scheduler,
            settings.clone(),
        );

        assert!(feed.status().last_refreshed.is_none());
        feed.refresh().await.unwrap();
        let stamped = feed.status().last_refreshed;
        assert!(stamped.is_some());

        // load_next after a refresh continues from page 2.
        feed.load_next().await.unwrap();

        // The stamp survives a controller restart.
        let search = FakeSearch::scripted(vec![]);
        let feed = FeedController::new(
            Some(stamp_path),
            search,
            SharedStore::new(ItemStore::in_memory()),
            EnrichmentScheduler::new(),
            settings,
        );
        assert_eq!(feed.status().last_refreshed, stamped);
    }
}
