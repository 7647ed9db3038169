use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio::sync::Mutex;

use crate::media_types::{ListFilter, MediaListEntry};
use crate::photo_service::PhotoService;

/// Page size requested from the listing endpoint.
pub const PAGE_SIZE: u32 = 100;
/// Item budget for a cycle that starts a fresh traversal. Kept small so the
/// first image can be shown before a large library finishes paging in.
const COLD_START_BUDGET: usize = 100;
/// Item budget for a cycle that continues a partial traversal.
const INCREMENTAL_BUDGET: usize = 300;
/// A completed listing is not re-fetched more often than this.
pub const LIST_REFRESH_TTL: Duration = Duration::from_secs(15 * 60);
/// Poll interval suggested while the listing is still being built (or is
/// overdue for a rebuild).
pub const FAST_POLL_INTERVAL: Duration = Duration::from_secs(30);

struct ListState {
    items: Vec<MediaListEntry>,
    write_offset: usize,
    page_token: Option<String>,
    completed_at: Option<Instant>,
}

/// Incrementally built, periodically refreshed listing of one collection.
///
/// A refresh cycle pages the listing in bounded batches, overwriting the
/// held list at the current write offset, so readers only ever observe the
/// previous state with a prefix replaced by newer data. The list shrinks
/// only when a traversal completes.
pub struct CollectionCache {
    service: Arc<dyn PhotoService>,
    filter: ListFilter,
    refresh_ttl: Duration,
    state: StdMutex<ListState>,
    // Held for the duration of a fetch cycle; concurrent refresh calls are
    // silent no-ops, not queued.
    fetch_lock: Mutex<()>,
}

impl CollectionCache {
    pub fn new(service: Arc<dyn PhotoService>, filter: ListFilter) -> Self {
        Self::with_refresh_ttl(service, filter, LIST_REFRESH_TTL)
    }

    pub fn with_refresh_ttl(
        service: Arc<dyn PhotoService>,
        filter: ListFilter,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            service,
            filter,
            refresh_ttl,
            state: StdMutex::new(ListState {
                items: Vec::new(),
                write_offset: 0,
                page_token: None,
                completed_at: None,
            }),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Run one bounded fetch cycle. Returns `true` when at least one page
    /// was applied; returns `false` without touching the network when a
    /// cycle is already in flight or a completed listing is younger than
    /// the refresh TTL.
    pub async fn refresh(&self) -> bool {
        let _guard = match self.fetch_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Skipping refresh for {:?} - fetch cycle already running", self.filter);
                return false;
            }
        };

        let (mut token, budget) = {
            let mut state = self.state.lock().unwrap();
            match state.page_token.clone() {
                Some(token) => (Some(token), INCREMENTAL_BUDGET),
                None => {
                    if let Some(completed_at) = state.completed_at {
                        if completed_at.elapsed() < self.refresh_ttl {
                            return false;
                        }
                    }
                    // Fresh traversal: overwrite from the top
                    state.write_offset = 0;
                    (None, COLD_START_BUDGET)
                }
            }
        };

        let mut fetched = 0;
        let mut pages_applied = 0;
        loop {
            let page = match self
                .service
                .list_items(&self.filter, PAGE_SIZE, token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    // Keep whatever was already applied; the next scheduled
                    // refresh retries from the held token.
                    error!("Error listing items for {:?}: {}", self.filter, err);
                    break;
                }
            };

            let next_token = page.next_page_token.clone();
            let complete = next_token.is_none();
            {
                let mut state = self.state.lock().unwrap();
                fetched += Self::apply_page(&mut state, page.items);
                pages_applied += 1;
                state.page_token = next_token.clone();
                if complete {
                    let offset = state.write_offset;
                    state.items.truncate(offset);
                    state.completed_at = Some(Instant::now());
                }
            }

            if complete {
                info!(
                    "Listing complete for {:?}: {} items",
                    self.filter,
                    self.item_count()
                );
                break;
            }
            token = next_token;
            if fetched >= budget {
                debug!(
                    "Item budget ({}) exhausted for {:?}, continuing next cycle",
                    budget, self.filter
                );
                break;
            }
        }

        pages_applied > 0
    }

    /// Overwrite the list at the write offset with one page of items.
    fn apply_page(state: &mut ListState, items: Vec<MediaListEntry>) -> usize {
        let offset = state.write_offset;
        let len = items.len();
        for (i, item) in items.into_iter().enumerate() {
            let index = offset + i;
            if index < state.items.len() {
                state.items[index] = item;
            } else {
                state.items.push(item);
            }
        }
        state.write_offset = offset + len;
        len
    }

    /// True while a continuation token is held, i.e. the listing is not yet
    /// known-complete.
    pub fn is_building(&self) -> bool {
        self.state.lock().unwrap().page_token.is_some()
    }

    /// True when the next refresh would actually hit the network: the
    /// listing was never completed, is mid-build, or its TTL has lapsed.
    pub fn is_stale(&self) -> bool {
        let state = self.state.lock().unwrap();
        if state.page_token.is_some() {
            return true;
        }
        match state.completed_at {
            Some(completed_at) => completed_at.elapsed() >= self.refresh_ttl,
            None => true,
        }
    }

    /// Poll interval the owning coordinator should use: short while the
    /// listing is building or overdue, idle (`None`) while a completed
    /// listing is within its TTL.
    pub fn suggested_poll_interval(&self) -> Option<Duration> {
        if self.is_stale() {
            Some(FAST_POLL_INTERVAL)
        } else {
            None
        }
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Snapshot of the photo items in the current listing. Safe to call
    /// mid-build.
    pub fn photo_items(&self) -> Vec<MediaListEntry> {
        let state = self.state.lock().unwrap();
        state.items.iter().filter(|m| m.is_photo()).cloned().collect()
    }

    /// Snapshot of the video items in the current listing.
    pub fn video_items(&self) -> Vec<MediaListEntry> {
        let state = self.state.lock().unwrap();
        state.items.iter().filter(|m| m.is_video()).cloned().collect()
    }
}
