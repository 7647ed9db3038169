//! Cached slideshow engine for remote photo collections.
//!
//! Maintains an incrementally paged, TTL-refreshed listing of a remote
//! collection (an album or the synthetic favorites set), keeps a "current"
//! item selected under a configurable policy, and renders display-ready
//! bytes, optionally tiling two complementary-orientation images when one
//! image cannot fill the requested canvas without excessive cropping.

pub mod collection_cache;
pub mod coordinator;
pub mod image_combiner;
pub mod media_downloader;
pub mod media_types;
pub mod photo_service;
pub mod registry;
pub mod selection;
pub mod settings;
pub mod size_descriptor;

pub use collection_cache::CollectionCache;
pub use coordinator::{CollectionCoordinator, CoordinatorError, DeviceIdentity, ListenerId};
pub use media_downloader::MediaDownloader;
pub use media_types::{
    Collection, ItemPage, ListFilter, MediaItem, MediaListEntry, MediaMetadata,
    FAVORITES_COLLECTION_ID,
};
pub use photo_service::{HttpPhotoService, PhotoService, ServiceError, ServiceResult};
pub use registry::CoordinatorRegistry;
pub use selection::SelectionEngine;
pub use settings::{CollectionSettings, CropMode, DisplayInterval, SelectionMode};
pub use size_descriptor::SizeDescriptor;
