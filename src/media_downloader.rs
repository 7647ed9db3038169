use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::sync::Mutex;

use crate::media_types::MediaItem;
use crate::photo_service::PhotoService;
use crate::size_descriptor::SizeDescriptor;

/// Base URLs issued by the service expire; re-resolve the item once the URL
/// held here is older than this.
pub const BASE_URL_TTL: Duration = Duration::from_secs(50 * 60);

struct ResolvedMedia {
    item: MediaItem,
    resolved_at: Instant,
}

/// Downloads and caches resized renditions for one media item.
///
/// The item's base URL is re-resolved by id when it has gone stale, counted
/// from when it was last fetched. Bytes are cached per size descriptor; the
/// cache lives exactly as long as this downloader, which the coordinator
/// replaces on every selection change.
pub struct MediaDownloader {
    service: Arc<dyn PhotoService>,
    url_ttl: Duration,
    media: StdMutex<ResolvedMedia>,
    cache: StdMutex<HashMap<String, Vec<u8>>>,
    // One download at a time per item; a second request for the same
    // descriptor waits and is then served from cache.
    fetch_lock: Mutex<()>,
}

impl MediaDownloader {
    pub fn new(service: Arc<dyn PhotoService>, media: MediaItem) -> Self {
        Self::with_url_ttl(service, media, BASE_URL_TTL)
    }

    pub fn with_url_ttl(
        service: Arc<dyn PhotoService>,
        media: MediaItem,
        url_ttl: Duration,
    ) -> Self {
        Self {
            service,
            url_ttl,
            media: StdMutex::new(ResolvedMedia {
                item: media,
                resolved_at: Instant::now(),
            }),
            cache: StdMutex::new(HashMap::new()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the item, as last resolved.
    pub fn media(&self) -> MediaItem {
        self.media.lock().unwrap().item.clone()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    /// Resized bytes for the descriptor, from cache when available. Returns
    /// `None` on timeout or transport failure; the error is logged and the
    /// caller keeps whatever it was showing.
    pub async fn download(&self, descriptor: &SizeDescriptor) -> Option<Vec<u8>> {
        let key = descriptor.to_string();
        if let Some(bytes) = self.cache.lock().unwrap().get(&key) {
            return Some(bytes.clone());
        }

        let _guard = self.fetch_lock.lock().await;
        // A concurrent download may have landed while waiting
        if let Some(bytes) = self.cache.lock().unwrap().get(&key) {
            return Some(bytes.clone());
        }

        let base_url = self.fresh_base_url().await?;
        debug!("Downloading {}{}", base_url, descriptor);
        match self.service.fetch_resized(&base_url, descriptor).await {
            Ok(bytes) => {
                self.cache.lock().unwrap().insert(key, bytes.clone());
                Some(bytes)
            }
            Err(err) => {
                error!("Error downloading media {}: {}", self.media.lock().unwrap().item.id, err);
                None
            }
        }
    }

    /// Usable base URL, re-resolving the item when the held one is stale or
    /// missing.
    async fn fresh_base_url(&self) -> Option<String> {
        let item_id = {
            let media = self.media.lock().unwrap();
            if media.resolved_at.elapsed() < self.url_ttl {
                if let Some(url) = &media.item.base_url {
                    return Some(url.clone());
                }
            }
            media.item.id.clone()
        };

        match self.service.get_item(&item_id).await {
            Ok(item) => {
                let url = item.base_url.clone();
                if url.is_none() {
                    warn!("Service returned no base URL for {}", item_id);
                }
                let mut media = self.media.lock().unwrap();
                media.item = item;
                media.resolved_at = Instant::now();
                url
            }
            Err(err) => {
                error!("Error resolving media {}: {}", item_id, err);
                None
            }
        }
    }
}
