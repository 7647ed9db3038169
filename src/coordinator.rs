use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::collection_cache::CollectionCache;
use crate::image_combiner;
use crate::media_downloader::MediaDownloader;
use crate::media_types::{Collection, ListFilter, MediaItem, FAVORITES_COLLECTION_ID};
use crate::photo_service::{PhotoService, ServiceError};
use crate::selection::SelectionEngine;
use crate::settings::{CollectionSettings, CropMode, DisplayInterval, SelectionMode};
use crate::size_descriptor::SizeDescriptor;

/// Timeout for the collection metadata fetch that activates a coordinator.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("failed to fetch metadata for collection {collection_id}: {source}")]
    Metadata {
        collection_id: String,
        #[source]
        source: ServiceError,
    },
}

/// Identity of the virtual device backed by one collection, for the
/// embedding application's device registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub collection_id: String,
    pub name: String,
    pub configuration_url: Option<String>,
}

pub type ListenerId = u64;
type Listener = Box<dyn Fn() + Send + Sync>;

struct SelectionState {
    collection: Option<Collection>,
    primary: Option<Arc<MediaDownloader>>,
    secondary: Option<Arc<MediaDownloader>>,
    combined_cache: HashMap<String, Vec<u8>>,
    engine: SelectionEngine,
}

/// Per-collection orchestrator: owns the listing cache, the current
/// selection and its byte caches, and the per-collection settings. The only
/// object consumers interact with.
///
/// A coordinator starts uninitialized; its first successful [`update`]
/// fetches the collection metadata (the synthetic favorites collection
/// skips the fetch) and bootstraps a selection. Every failure below that
/// degrades to "keep showing the last known-good image".
///
/// [`update`]: CollectionCoordinator::update
pub struct CollectionCoordinator {
    service: Arc<dyn PhotoService>,
    collection_id: String,
    cache: Arc<CollectionCache>,
    state: Mutex<SelectionState>,
    settings: StdMutex<CollectionSettings>,
    listeners: StdMutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
}

impl CollectionCoordinator {
    pub fn new(service: Arc<dyn PhotoService>, collection_id: impl Into<String>) -> Self {
        let collection_id = collection_id.into();
        let filter = ListFilter::for_collection(&collection_id);
        let collection =
            (collection_id == FAVORITES_COLLECTION_ID).then(Collection::favorites);
        Self {
            cache: Arc::new(CollectionCache::new(service.clone(), filter)),
            service,
            collection_id,
            state: Mutex::new(SelectionState {
                collection,
                primary: None,
                secondary: None,
                combined_cache: HashMap::new(),
                engine: SelectionEngine::new(),
            }),
            settings: StdMutex::new(CollectionSettings::default()),
            listeners: StdMutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Scheduled update: activate if needed, run one cache refresh cycle,
    /// and make sure something is selected. Metadata failure is the only
    /// error that surfaces; the next scheduled poll retries it.
    pub async fn update(&self) -> Result<(), CoordinatorError> {
        self.ensure_collection().await?;
        self.cache.refresh().await;

        let (no_selection, cover_id) = {
            let state = self.state.lock().await;
            let cover_id = state
                .collection
                .as_ref()
                .and_then(|c| c.cover_photo_media_item_id.clone());
            (state.primary.is_none(), cover_id)
        };
        if no_selection {
            match cover_id {
                Some(cover_id) => self.select_item_by_id(&cover_id).await,
                None => self.select_next(None).await,
            }
        }
        Ok(())
    }

    async fn ensure_collection(&self) -> Result<(), CoordinatorError> {
        if self.state.lock().await.collection.is_some() {
            return Ok(());
        }

        let fetch = self.service.get_collection(&self.collection_id);
        let collection = match tokio::time::timeout(METADATA_TIMEOUT, fetch).await {
            Ok(Ok(collection)) => collection,
            Ok(Err(source)) => {
                return Err(CoordinatorError::Metadata {
                    collection_id: self.collection_id.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(CoordinatorError::Metadata {
                    collection_id: self.collection_id.clone(),
                    source: ServiceError::Timeout,
                })
            }
        };
        info!("Activated coordinator for collection '{}'", collection.title);
        self.state.lock().await.collection = Some(collection);
        Ok(())
    }

    /// Poll interval the host scheduler should use next, from the cache:
    /// short while the listing builds, idle once it is complete and fresh.
    pub fn suggested_poll_interval(&self) -> Option<Duration> {
        self.cache.suggested_poll_interval()
    }

    pub async fn collection(&self) -> Option<Collection> {
        self.state.lock().await.collection.clone()
    }

    pub async fn device_identity(&self) -> Option<DeviceIdentity> {
        let state = self.state.lock().await;
        let collection = state.collection.as_ref()?;
        Some(DeviceIdentity {
            collection_id: self.collection_id.clone(),
            name: collection.title.clone(),
            configuration_url: collection.product_url.clone(),
        })
    }

    /// The currently selected item, as last resolved.
    pub async fn current_item(&self) -> Option<MediaItem> {
        let state = self.state.lock().await;
        state.primary.as_ref().map(|d| d.media())
    }

    /// Advance the selection under the configured policy (or a one-shot
    /// override). The whole switch (new downloader, cleared byte caches,
    /// listener notification) completes before this returns.
    pub async fn select_next(&self, mode_override: Option<SelectionMode>) {
        let mode = mode_override.unwrap_or_else(|| self.settings.lock().unwrap().selection_mode);
        let photos = self.cache.photo_items();

        let mut state = self.state.lock().await;
        let current_id = state.primary.as_ref().map(|d| d.media().id);
        if let Some(entry) = state.engine.next(mode, current_id.as_deref(), &photos) {
            debug!("Selected {} from {} photos ({})", entry.id, photos.len(), mode);
            self.apply_selection(&mut state, MediaItem::from_entry(&entry));
        }
    }

    /// Select a specific item by id, resolving it first. Used for the
    /// collection's cover item; failures are logged and leave the current
    /// selection in place.
    pub async fn select_item_by_id(&self, item_id: &str) {
        match self.service.get_item(item_id).await {
            Ok(item) => {
                let mut state = self.state.lock().await;
                self.apply_selection(&mut state, item);
            }
            Err(err) => {
                error!("Error selecting item {} by id: {}", item_id, err);
            }
        }
    }

    fn apply_selection(&self, state: &mut SelectionState, item: MediaItem) {
        state.primary = Some(Arc::new(MediaDownloader::new(self.service.clone(), item)));
        state.secondary = None;
        state.combined_cache.clear();
        state.engine.mark_selected();
        self.notify_listeners();
    }

    /// Display-ready bytes for the requested size (default 1024x512). In
    /// combined mode a two-image tiling is attempted first, falling back to
    /// the single-item path when composition declines or fails.
    pub async fn get_image(&self, width: Option<u32>, height: Option<u32>) -> Option<Vec<u8>> {
        let crop_mode = self.settings.lock().unwrap().crop_mode;
        let descriptor = SizeDescriptor::from_request(width, height, crop_mode.requests_crop());

        let primary = {
            let mut state = self.state.lock().await;
            let primary = match &state.primary {
                Some(primary) => primary.clone(),
                None => {
                    warn!("No media selected for collection {}", self.collection_id);
                    return None;
                }
            };

            if crop_mode == CropMode::Combined {
                let key = descriptor.to_string();
                if let Some(bytes) = state.combined_cache.get(&key) {
                    return Some(bytes.clone());
                }
                if let Some(bytes) = self
                    .render_combined(&mut state, &primary, &descriptor)
                    .await
                {
                    state.combined_cache.insert(key, bytes.clone());
                    return Some(bytes);
                }
            }
            primary
        };

        primary.download(&descriptor).await
    }

    async fn render_combined(
        &self,
        state: &mut SelectionState,
        primary: &MediaDownloader,
        descriptor: &SizeDescriptor,
    ) -> Option<Vec<u8>> {
        let plan = image_combiner::plan_combination(
            descriptor.width,
            descriptor.height,
            primary.media().dimensions(),
        )?;

        // The partner is kept until the selection or crop mode changes so
        // renders at other sizes reuse the same pair
        if state.secondary.is_none() {
            let photos = self.cache.photo_items();
            let partner = image_combiner::pick_partner(
                &photos,
                &primary.media().id,
                plan.portrait_partners,
            )?;
            debug!("Picked {} as composition partner", partner.id);
            state.secondary = Some(Arc::new(MediaDownloader::new(
                self.service.clone(),
                MediaItem::from_entry(&partner),
            )));
        }
        let secondary = state.secondary.clone()?;

        image_combiner::render(primary, &secondary, &plan, descriptor.width, descriptor.height)
            .await
    }

    /// Advance when the configured display interval has elapsed or nothing
    /// is selected yet; also kick off a background cache refresh when the
    /// listing TTL has lapsed. Returns whether the selection changed.
    pub async fn maybe_advance(&self) -> bool {
        if self.cache.is_stale() {
            let cache = Arc::clone(&self.cache);
            tokio::spawn(async move {
                cache.refresh().await;
            });
        }

        let interval = self.settings.lock().unwrap().display_interval;
        let (no_item, due) = {
            let state = self.state.lock().await;
            let no_item = state.primary.is_none();
            let due = match interval.seconds() {
                None => false,
                Some(secs) => state
                    .engine
                    .elapsed_since_selection()
                    .map(|elapsed| elapsed > Duration::from_secs(secs))
                    .unwrap_or(true),
            };
            (no_item, due)
        };

        if no_item || due {
            self.select_next(None).await;
            true
        } else {
            false
        }
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.settings.lock().unwrap().selection_mode
    }

    pub fn set_selection_mode(&self, mode: SelectionMode) {
        self.settings.lock().unwrap().selection_mode = mode;
    }

    pub fn display_interval(&self) -> DisplayInterval {
        self.settings.lock().unwrap().display_interval
    }

    pub fn set_display_interval(&self, interval: DisplayInterval) {
        self.settings.lock().unwrap().display_interval = interval;
    }

    pub fn crop_mode(&self) -> CropMode {
        self.settings.lock().unwrap().crop_mode
    }

    /// Change the crop mode and drop every cached rendition; the old bytes
    /// were produced under the previous fitting rules.
    pub async fn set_crop_mode(&self, crop_mode: CropMode) {
        self.settings.lock().unwrap().crop_mode = crop_mode;
        let mut state = self.state.lock().await;
        state.combined_cache.clear();
        state.secondary = None;
        if let Some(primary) = &state.primary {
            primary.clear_cache();
        }
    }

    /// Register a change listener, called synchronously after every
    /// selection change (never on cache-only refreshes).
    pub fn subscribe(&self, listener: Box<dyn Fn() + Send + Sync>) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
    }

    fn notify_listeners(&self) {
        let listeners = self.listeners.lock().unwrap();
        for (_, listener) in listeners.iter() {
            listener();
        }
    }
}
