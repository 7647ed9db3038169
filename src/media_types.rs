use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the synthetic "favorites" collection. It is not a real
/// album on the service side; listing it uses a feature filter instead of
/// an album membership query.
pub const FAVORITES_COLLECTION_ID: &str = "FAVORITES";

/// Metadata specific to photos (may be partially populated by the service).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDetails {
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub focal_length: Option<f64>,
    #[serde(default)]
    pub aperture_f_number: Option<f64>,
    #[serde(default)]
    pub iso_equivalent: Option<i64>,
    #[serde(default)]
    pub exposure_time: Option<String>,
}

/// Metadata specific to videos.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// User who contributed the item to a shared collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorInfo {
    #[serde(default)]
    pub profile_picture_base_url: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Media metadata as returned by the service. Width and height arrive as
/// decimal strings on the wire; use [`MediaMetadata::dimensions`] for the
/// parsed form. Presence of `photo` vs `video` discriminates the media kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub photo: Option<PhotoDetails>,
    #[serde(default)]
    pub video: Option<VideoDetails>,
}

impl MediaMetadata {
    /// Parsed (width, height) in pixels, if both are present and numeric.
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        let width: f64 = self.width.as_deref()?.parse().ok()?;
        let height: f64 = self.height.as_deref()?.parse().ok()?;
        Some((width, height))
    }
}

/// Full representation of one media item. `base_url` is a short-lived
/// capability token; it expires roughly 50 minutes after the item was last
/// fetched and must then be re-resolved via the service by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub media_metadata: Option<MediaMetadata>,
    #[serde(default)]
    pub contributor_info: Option<ContributorInfo>,
}

impl MediaItem {
    /// Minimal item carrying only identity and metadata, as stored in the
    /// collection listing. The remaining fields are filled in when the item
    /// is resolved by id.
    pub fn from_entry(entry: &MediaListEntry) -> Self {
        Self {
            id: entry.id.clone(),
            filename: None,
            description: None,
            mime_type: None,
            base_url: None,
            product_url: None,
            media_metadata: entry.media_metadata.clone(),
            contributor_info: None,
        }
    }

    pub fn dimensions(&self) -> Option<(f64, f64)> {
        self.media_metadata.as_ref()?.dimensions()
    }
}

/// Reduced listing projection: identity plus dimensions/kind only, so a
/// multi-thousand-item collection stays cheap to hold in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListEntry {
    pub id: String,
    #[serde(default)]
    pub media_metadata: Option<MediaMetadata>,
}

impl MediaListEntry {
    pub fn is_photo(&self) -> bool {
        self.media_metadata
            .as_ref()
            .is_some_and(|m| m.photo.is_some())
    }

    pub fn is_video(&self) -> bool {
        self.media_metadata
            .as_ref()
            .is_some_and(|m| m.video.is_some())
    }

    pub fn dimensions(&self) -> Option<(f64, f64)> {
        self.media_metadata.as_ref()?.dimensions()
    }
}

/// A named grouping of media items (an album, or the synthetic favorites
/// set).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub is_writeable: Option<bool>,
    #[serde(default)]
    pub media_items_count: Option<String>,
    #[serde(default)]
    pub cover_photo_base_url: Option<String>,
    #[serde(default)]
    pub cover_photo_media_item_id: Option<String>,
}

impl Collection {
    /// Locally synthesized favorites collection. Never fetched from the
    /// service.
    pub fn favorites() -> Self {
        Self {
            id: FAVORITES_COLLECTION_ID.to_string(),
            title: "Favorites".to_string(),
            product_url: None,
            is_writeable: Some(false),
            media_items_count: None,
            cover_photo_base_url: None,
            cover_photo_media_item_id: None,
        }
    }
}

/// Listing query for one collection: either album membership or a
/// service-side feature filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    Album(String),
    Favorites,
}

impl ListFilter {
    /// Filter for the given collection id, mapping the synthetic favorites
    /// id onto the feature filter.
    pub fn for_collection(collection_id: &str) -> Self {
        if collection_id == FAVORITES_COLLECTION_ID {
            ListFilter::Favorites
        } else {
            ListFilter::Album(collection_id.to_string())
        }
    }

    /// JSON body fragment understood by the search endpoint.
    pub fn to_search_body(&self) -> serde_json::Value {
        match self {
            ListFilter::Album(album_id) => serde_json::json!({ "albumId": album_id }),
            ListFilter::Favorites => serde_json::json!({
                "filters": { "featureFilter": { "includedFeatures": ["FAVORITES"] } }
            }),
        }
    }
}

/// One page of a paginated listing, with the continuation token for the
/// next page when more items remain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    #[serde(default)]
    pub items: Vec<MediaListEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
