use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::coordinator::{CollectionCoordinator, CoordinatorError};
use crate::photo_service::PhotoService;

/// One [`CollectionCoordinator`] per collection id, created lazily.
///
/// The map lock is held across a coordinator's construction and first
/// update, so concurrent callers asking for the same id all wait on the one
/// in-flight construction instead of racing duplicates.
pub struct CoordinatorRegistry {
    service: Arc<dyn PhotoService>,
    coordinators: Mutex<HashMap<String, Arc<CollectionCoordinator>>>,
}

impl CoordinatorRegistry {
    pub fn new(service: Arc<dyn PhotoService>) -> Self {
        Self {
            service,
            coordinators: Mutex::new(HashMap::new()),
        }
    }

    /// Existing coordinator for the id, or a freshly constructed one that
    /// has completed its first update. When that first update fails the
    /// coordinator is not retained; the next call reconstructs it.
    pub async fn get_coordinator(
        &self,
        collection_id: &str,
    ) -> Result<Arc<CollectionCoordinator>, CoordinatorError> {
        let mut coordinators = self.coordinators.lock().await;
        if let Some(coordinator) = coordinators.get(collection_id) {
            return Ok(coordinator.clone());
        }

        let coordinator = Arc::new(CollectionCoordinator::new(
            self.service.clone(),
            collection_id,
        ));
        coordinator.update().await?;
        coordinators.insert(collection_id.to_string(), coordinator.clone());
        info!("Created coordinator for collection {}", collection_id);
        Ok(coordinator)
    }

    /// Drop the coordinator for the id; no state is retained.
    pub async fn remove_coordinator(&self, collection_id: &str) {
        if self.coordinators.lock().await.remove(collection_id).is_some() {
            info!("Removed coordinator for collection {}", collection_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    use crate::media_types::{
        Collection, ItemPage, ListFilter, MediaItem, MediaListEntry, MediaMetadata, PhotoDetails,
    };
    use crate::photo_service::{ServiceError, ServiceResult};
    use crate::size_descriptor::SizeDescriptor;
    use async_trait::async_trait;

    struct CountingService {
        collection_calls: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl CountingService {
        fn new() -> Self {
            Self {
                collection_calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl PhotoService for CountingService {
        async fn list_items(
            &self,
            _filter: &ListFilter,
            _page_size: u32,
            _page_token: Option<&str>,
        ) -> ServiceResult<ItemPage> {
            Ok(ItemPage {
                items: vec![
                    MediaListEntry {
                        id: "m1".to_string(),
                        media_metadata: Some(MediaMetadata {
                            photo: Some(PhotoDetails::default()),
                            ..Default::default()
                        }),
                    },
                    MediaListEntry {
                        id: "m2".to_string(),
                        media_metadata: Some(MediaMetadata {
                            photo: Some(PhotoDetails::default()),
                            ..Default::default()
                        }),
                    },
                ],
                next_page_token: None,
            })
        }

        async fn get_item(&self, item_id: &str) -> ServiceResult<MediaItem> {
            Ok(MediaItem {
                id: item_id.to_string(),
                filename: None,
                description: None,
                mime_type: None,
                base_url: Some(format!("https://media.example/{}", item_id)),
                product_url: None,
                media_metadata: None,
                contributor_info: None,
            })
        }

        async fn get_collection(&self, collection_id: &str) -> ServiceResult<Collection> {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            self.collection_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Collection {
                id: collection_id.to_string(),
                title: "Album".to_string(),
                product_url: None,
                is_writeable: None,
                media_items_count: None,
                cover_photo_base_url: None,
                cover_photo_media_item_id: None,
            })
        }

        async fn fetch_resized(
            &self,
            _base_url: &str,
            _descriptor: &SizeDescriptor,
        ) -> ServiceResult<Vec<u8>> {
            Err(ServiceError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_same_id_returns_same_instance() {
        let registry = CoordinatorRegistry::new(Arc::new(CountingService::new()));

        let first = registry.get_coordinator("album-1").await.unwrap();
        let second = registry.get_coordinator("album-1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = registry.get_coordinator("album-2").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_construction() {
        let service = Arc::new(CountingService::gated());
        let registry = Arc::new(CoordinatorRegistry::new(service.clone()));

        let r1 = registry.clone();
        let r2 = registry.clone();
        let t1 = tokio::spawn(async move { r1.get_coordinator("album-1").await.unwrap() });
        let t2 = tokio::spawn(async move { r2.get_coordinator("album-1").await.unwrap() });

        service.gate.as_ref().unwrap().add_permits(16);
        let (c1, c2) = (t1.await.unwrap(), t2.await.unwrap());
        assert!(Arc::ptr_eq(&c1, &c2));
        assert_eq!(service.collection_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_drops_instance() {
        let registry = CoordinatorRegistry::new(Arc::new(CountingService::new()));

        let first = registry.get_coordinator("album-1").await.unwrap();
        registry.remove_coordinator("album-1").await;
        let rebuilt = registry.get_coordinator("album-1").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));

        // Removing an unknown id is a no-op
        registry.remove_coordinator("missing").await;
    }
}
