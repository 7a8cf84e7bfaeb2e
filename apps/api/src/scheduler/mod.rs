//! Enrichment Scheduler — the drain loop that turns placeholders into
//! summaries.
//!
//! Two lanes feed one long-lived task: `normal` (FIFO, appended as pages of
//! repositories are discovered) and `priority` (head-insertion, fed when a
//! user opens an item that has not been enriched yet). The task drains one
//! entry per tick, priority lane first, and sleeps a cooldown between ticks —
//! short when a GitHub token is configured, long when unauthenticated,
//! because both the source API and the model providers enforce strict
//! quotas. Single-flight is structural: there is exactly one drain task, so
//! no two enrichment round-trips ever overlap.
//!
//! Failures are contained per entry. A tick that cannot produce a summary
//! leaves the item's fallback in place and moves on; nothing is retried
//! within the session. The queue itself is transient — it is rebuilt on
//! startup from whichever restored items still carry fallback summaries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::github::{extract_preview_image, ReadmeSource};
use crate::models::item::{DisplayItem, ItemId};
use crate::settings::SharedSettings;
use crate::store::SharedStore;
use crate::summarizer::SummaryGenerator;

/// Tick cooldown with a GitHub token configured.
const AUTHED_COOLDOWN: Duration = Duration::from_secs(1);
/// Tick cooldown without one. The unauthenticated search quota is tiny.
const UNAUTHED_COOLDOWN: Duration = Duration::from_secs(60);

/// Collaborators for the drain loop, threaded in at spawn time.
pub struct EnrichmentDeps {
    pub store: SharedStore,
    pub settings: SharedSettings,
    pub readme_source: Arc<dyn ReadmeSource>,
    pub summarizer: Arc<dyn SummaryGenerator>,
}

#[derive(Default)]
struct Lanes {
    priority: VecDeque<ItemId>,
    normal: VecDeque<ItemId>,
}

impl Lanes {
    fn contains(&self, id: ItemId) -> bool {
        self.priority.contains(&id) || self.normal.contains(&id)
    }

    fn pop_next(&mut self) -> Option<ItemId> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.normal.is_empty()
    }
}

struct Inner {
    lanes: Mutex<Lanes>,
    wake: Notify,
    scouting: AtomicBool,
    stopped: AtomicBool,
}

/// Cheap cloneable handle; all clones share the same lanes and flags.
#[derive(Clone)]
pub struct EnrichmentScheduler {
    inner: Arc<Inner>,
}

/// What a tick did with its entry.
enum TickOutcome {
    /// Network work happened (or was attempted) — cooldown applies.
    Worked,
    /// Entry was already enriched, gone, or not enrichable — next tick
    /// immediately.
    Skipped,
}

impl EnrichmentScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                lanes: Mutex::new(Lanes::default()),
                wake: Notify::new(),
                scouting: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Appends newly discovered ids to the normal lane, skipping ids already
    /// queued in either lane.
    pub fn enqueue_discovered(&self, ids: impl IntoIterator<Item = ItemId>) {
        let mut queued = 0usize;
        {
            let mut lanes = self.lock_lanes();
            for id in ids {
                if !lanes.contains(id) {
                    lanes.normal.push_back(id);
                    queued += 1;
                }
            }
        }
        if queued > 0 {
            debug!("Queued {queued} item(s) for enrichment");
            self.inner.wake.notify_one();
        }
    }

    /// Puts an id at the head of the priority lane — most recently requested
    /// wins position. The id is removed from wherever else it was queued.
    pub fn enqueue_priority(&self, id: ItemId) {
        {
            let mut lanes = self.lock_lanes();
            lanes.normal.retain(|queued| *queued != id);
            if let Some(position) = lanes.priority.iter().position(|queued| *queued == id) {
                lanes.priority.remove(position);
            }
            lanes.priority.push_front(id);
        }
        self.inner.wake.notify_one();
    }

    /// Busy flag for the presentation layer: true while entries are queued
    /// or a tick is in flight.
    pub fn is_scouting(&self) -> bool {
        self.inner.scouting.load(Ordering::Relaxed) || !self.lock_lanes().is_empty()
    }

    pub fn queued_len(&self) -> usize {
        let lanes = self.lock_lanes();
        lanes.priority.len() + lanes.normal.len()
    }

    /// Stops the drain loop after the current tick.
    pub fn shutdown(&self) {
        self.inner.stopped.store(true, Ordering::Relaxed);
        self.inner.wake.notify_one();
    }

    /// The single owned drain task. Spawn exactly once.
    pub async fn run(self, deps: EnrichmentDeps) {
        info!("Enrichment scheduler started");
        loop {
            if self.inner.stopped.load(Ordering::Relaxed) {
                break;
            }

            // Pop into a local first; the lanes guard must never be held
            // across an await.
            let next = self.lock_lanes().pop_next();
            let Some(id) = next else {
                self.inner.scouting.store(false, Ordering::Relaxed);
                self.inner.wake.notified().await;
                continue;
            };

            self.inner.scouting.store(true, Ordering::Relaxed);
            let outcome = process_entry(&deps, id).await;

            if matches!(outcome, TickOutcome::Worked) {
                let cooldown = if deps.settings.github_token().is_some() {
                    AUTHED_COOLDOWN
                } else {
                    UNAUTHED_COOLDOWN
                };
                tokio::time::sleep(cooldown).await;
            }
        }
        info!("Enrichment scheduler stopped");
    }

    fn lock_lanes(&self) -> std::sync::MutexGuard<'_, Lanes> {
        self.inner.lanes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EnrichmentScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// One tick: look the entry up, fetch its README, generate a summary, merge.
///
/// Every failure path leaves the item exactly as it was — the worst case of
/// any enrichment failure is "this item keeps its fallback summary."
async fn process_entry(deps: &EnrichmentDeps, id: ItemId) -> TickOutcome {
    // Snapshot the descriptor without holding the store lock across awaits.
    let repo = {
        let store = deps.store.read();
        match store.get(id) {
            Some(DisplayItem::Repo(item)) => {
                if !item.ai_summary.is_fallback() && item.readme_content.is_some() {
                    debug!("{} already enriched; skipping", item.repo.full_name);
                    return TickOutcome::Skipped;
                }
                item.repo.clone()
            }
            Some(DisplayItem::Custom(_)) => return TickOutcome::Skipped,
            // Deleted while queued.
            None => return TickOutcome::Skipped,
        }
    };

    let config = deps.settings.enrichment_config();

    let readme = deps
        .readme_source
        .fetch_readme(&repo.full_name, config.github_token.as_deref())
        .await;

    let preview_image = readme
        .as_deref()
        .and_then(extract_preview_image)
        .or_else(|| repo.description.as_deref().and_then(extract_preview_image));

    // An empty README is as useless as a missing one; summarize the short
    // description instead.
    let source_text = readme
        .clone()
        .filter(|text| !text.trim().is_empty())
        .or_else(|| repo.description.clone())
        .unwrap_or_default();

    match deps
        .summarizer
        .generate_summary(
            &repo.name,
            &source_text,
            &config.api_keys,
            config.fallback_model.as_deref(),
            None,
            config.locale,
        )
        .await
    {
        Some(summary) => {
            deps.store
                .write()
                .merge_enrichment(id, summary, preview_image, readme);
            info!("Enriched {}", repo.full_name);
        }
        None => {
            warn!(
                "Summary generation yielded nothing for {}; keeping fallback",
                repo.full_name
            );
        }
    }

    TickOutcome::Worked
}
