use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

use photocast::collection_cache::FAST_POLL_INTERVAL;
use photocast::{
    Collection, CoordinatorRegistry, CropMode, ItemPage, ListFilter, MediaItem, MediaListEntry,
    PhotoService, SelectionMode, ServiceError, ServiceResult, SizeDescriptor,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted photo service: a 250-item album served in pages of up to 100,
/// portrait/landscape items alternating, with JPEG tile renditions.
struct ScriptedService {
    item_count: usize,
    cover_item_id: String,
    collection_calls: AtomicUsize,
    list_calls: AtomicUsize,
    fetched_descriptors: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new(item_count: usize, cover_item_id: &str) -> Self {
        Self {
            item_count,
            cover_item_id: cover_item_id.to_string(),
            collection_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            fetched_descriptors: Mutex::new(Vec::new()),
        }
    }

    /// Even-indexed items are portrait, odd-indexed landscape.
    fn dimensions_for(index: usize) -> (&'static str, &'static str) {
        if index % 2 == 0 {
            ("1000", "2000")
        } else {
            ("2000", "1000")
        }
    }

    fn entry(index: usize) -> MediaListEntry {
        let (width, height) = Self::dimensions_for(index);
        serde_json::from_value(serde_json::json!({
            "id": format!("item-{}", index),
            "mediaMetadata": {
                "width": width,
                "height": height,
                "photo": {}
            }
        }))
        .unwrap()
    }

    fn descriptors(&self) -> Vec<String> {
        self.fetched_descriptors.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoService for ScriptedService {
    async fn list_items(
        &self,
        _filter: &ListFilter,
        page_size: u32,
        page_token: Option<&str>,
    ) -> ServiceResult<ItemPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size as usize).min(self.item_count);
        Ok(ItemPage {
            items: (start..end).map(Self::entry).collect(),
            next_page_token: (end < self.item_count).then(|| end.to_string()),
        })
    }

    async fn get_item(&self, item_id: &str) -> ServiceResult<MediaItem> {
        let index: usize = item_id
            .strip_prefix("item-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ServiceError::Malformed(format!("unknown item {}", item_id)))?;
        let (width, height) = Self::dimensions_for(index);
        Ok(serde_json::from_value(serde_json::json!({
            "id": item_id,
            "filename": format!("{}.jpg", item_id),
            "mimeType": "image/jpeg",
            "baseUrl": format!("https://media.example/{}", item_id),
            "mediaMetadata": {
                "width": width,
                "height": height,
                "photo": {}
            }
        }))
        .unwrap())
    }

    async fn get_collection(&self, collection_id: &str) -> ServiceResult<Collection> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(serde_json::json!({
            "id": collection_id,
            "title": "Integration Album",
            "productUrl": "https://photos.example/integration",
            "coverPhotoMediaItemId": self.cover_item_id,
        }))
        .unwrap())
    }

    async fn fetch_resized(
        &self,
        _base_url: &str,
        descriptor: &SizeDescriptor,
    ) -> ServiceResult<Vec<u8>> {
        self.fetched_descriptors
            .lock()
            .unwrap()
            .push(descriptor.to_string());
        let tile: RgbImage =
            ImageBuffer::from_pixel(descriptor.width, descriptor.height, Rgb([70, 110, 160]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(tile)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(bytes)
    }
}

#[tokio::test]
async fn test_progressive_build_of_large_collection() {
    init_logging();
    let service = Arc::new(ScriptedService::new(250, "item-0"));
    let registry = CoordinatorRegistry::new(service.clone());

    // First use: metadata fetched, cold cycle pulls the first 100 items,
    // cover item selected
    let coordinator = registry.get_coordinator("album-1").await.unwrap();
    assert_eq!(service.collection_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.suggested_poll_interval(), Some(FAST_POLL_INTERVAL));
    assert_eq!(coordinator.current_item().await.unwrap().id, "item-0");

    // Second scheduled update finishes the traversal (pages of 100 and 50)
    coordinator.update().await.unwrap();
    assert_eq!(service.list_calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.suggested_poll_interval(), None);

    // Completed and fresh: another update performs no listing calls
    coordinator.update().await.unwrap();
    assert_eq!(service.list_calls.load(Ordering::SeqCst), 3);

    let collection = coordinator.collection().await.unwrap();
    assert_eq!(collection.title, "Integration Album");
}

#[tokio::test]
async fn test_sequential_slideshow_over_built_collection() {
    init_logging();
    let service = Arc::new(ScriptedService::new(5, "item-0"));
    let registry = CoordinatorRegistry::new(service.clone());
    let coordinator = registry.get_coordinator("album-1").await.unwrap();

    coordinator.set_selection_mode(SelectionMode::Sequential);
    assert_eq!(coordinator.current_item().await.unwrap().id, "item-0");

    for expected in ["item-1", "item-2", "item-3", "item-4", "item-0"] {
        coordinator.select_next(None).await;
        assert_eq!(coordinator.current_item().await.unwrap().id, expected);
    }
}

#[tokio::test]
async fn test_rendering_caches_per_size() {
    init_logging();
    let service = Arc::new(ScriptedService::new(5, "item-0"));
    let registry = CoordinatorRegistry::new(service.clone());
    let coordinator = registry.get_coordinator("album-1").await.unwrap();

    let default_size = coordinator.get_image(None, None).await.unwrap();
    let repeat = coordinator.get_image(None, None).await.unwrap();
    assert_eq!(default_size, repeat);
    assert_eq!(service.descriptors(), vec!["=w1024-h512"]);

    // A different size is a distinct cache entry
    coordinator.get_image(Some(640), Some(480)).await.unwrap();
    assert_eq!(service.descriptors(), vec!["=w1024-h512", "=w640-h480"]);
}

#[tokio::test]
async fn test_combined_rendering_end_to_end() {
    init_logging();
    let service = Arc::new(ScriptedService::new(6, "item-0"));
    let registry = CoordinatorRegistry::new(service.clone());
    let coordinator = registry.get_coordinator("album-1").await.unwrap();
    coordinator.set_crop_mode(CropMode::Combined).await;

    // Portrait current item on a landscape canvas: two half-width tiles
    let bytes = coordinator.get_image(Some(1024), Some(512)).await.unwrap();
    let rendered = image::load_from_memory(&bytes).unwrap();
    assert_eq!((rendered.width(), rendered.height()), (1024, 512));
    assert_eq!(service.descriptors(), vec!["=w512-h512-c", "=w512-h512-c"]);

    // A portrait canvas matches the current item's orientation, so the
    // single-image path serves it
    coordinator.get_image(Some(512), Some(1024)).await.unwrap();
    let descriptors = service.descriptors();
    assert_eq!(descriptors.len(), 3);
    assert_eq!(descriptors[2], "=w512-h1024-c");
}

#[tokio::test]
async fn test_selection_change_notifies_and_invalidates() {
    init_logging();
    let service = Arc::new(ScriptedService::new(5, "item-0"));
    let registry = CoordinatorRegistry::new(service.clone());
    let coordinator = registry.get_coordinator("album-1").await.unwrap();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    coordinator.subscribe(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    coordinator.get_image(None, None).await.unwrap();
    assert_eq!(service.descriptors().len(), 1);

    coordinator.select_next(Some(SelectionMode::Sequential)).await;
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    // The new selection renders fresh bytes
    coordinator.get_image(None, None).await.unwrap();
    assert_eq!(service.descriptors().len(), 2);
}
