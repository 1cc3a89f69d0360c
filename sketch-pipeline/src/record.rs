//! Persisted creation records and storage path conventions.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document collection holding creation records.
pub const CREATIONS_COLLECTION: &str = "creations";

/// Title used when title generation fails or returns nothing.
pub const DEFAULT_TITLE: &str = "Untitled Creation";

/// Content type of every stored image.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Which rendition of a drawing a stored object holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The user's drawing as submitted.
    Original,
    /// The AI-transformed image.
    Transformed,
    /// The upscaled transformed image.
    Upscaled,
}

impl AssetKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Transformed => "transformed",
            Self::Upscaled => "upscaled",
        }
    }
}

/// Storage path for one rendition: `users/{user}/drawings/{ts}_{kind}.png`.
#[must_use]
pub fn asset_path(user_id: &str, timestamp: u64, kind: AssetKind) -> String {
    format!(
        "users/{user_id}/drawings/{timestamp}_{}.png",
        kind.suffix()
    )
}

/// Storage paths of the objects backing a creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePaths {
    /// Path of the original drawing.
    pub original: String,
    /// Path of the transformed image.
    pub transformed: String,
    /// Path of the upscaled image, once produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscaled: Option<String>,
}

impl StoragePaths {
    /// Paths for a drawing transformed at `timestamp`.
    #[must_use]
    pub fn for_drawing(user_id: &str, timestamp: u64) -> Self {
        Self {
            original: asset_path(user_id, timestamp, AssetKind::Original),
            transformed: asset_path(user_id, timestamp, AssetKind::Transformed),
            upscaled: None,
        }
    }
}

/// A saved transformation result.
///
/// `id` is assigned by the document store and is not part of the
/// persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRecord {
    /// Document ID.
    #[serde(default, skip_serializing)]
    pub id: String,
    /// User who submitted the drawing.
    pub user_id: String,
    /// User allowed to modify the record.
    pub owner_id: String,
    /// Public URL of the original drawing.
    pub original_drawing_url: String,
    /// Public URL of the transformed image.
    pub transformed_image_url: String,
    /// Public URL of the upscaled image, once produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscaled_image_url: Option<String>,
    /// Display title.
    pub title: String,
    /// Style key the drawing was transformed with.
    pub style: String,
    /// Whether the creation appears in public listings.
    pub is_public: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Storage paths of the backing objects.
    pub storage_paths: StoragePaths,
}

impl CreationRecord {
    /// Rebuild a record from a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have the record shape.
    pub fn from_document(id: &str, document: Value) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_value(document)?;
        record.id = id.to_string();
        Ok(record)
    }

    /// The persisted document form (without `id`).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CreationRecord {
        CreationRecord {
            id: String::new(),
            user_id: "u1".into(),
            owner_id: "u1".into(),
            original_drawing_url: "https://cdn.test/o.png".into(),
            transformed_image_url: "https://cdn.test/t.png".into(),
            upscaled_image_url: None,
            title: "Sunset Fox".into(),
            style: "watercolor".into(),
            is_public: false,
            created_at: 1_700_000_000_000,
            storage_paths: StoragePaths::for_drawing("u1", 1_700_000_000_000),
        }
    }

    #[test]
    fn test_asset_paths() {
        let paths = StoragePaths::for_drawing("u1", 42);
        assert_eq!(paths.original, "users/u1/drawings/42_original.png");
        assert_eq!(paths.transformed, "users/u1/drawings/42_transformed.png");
        assert_eq!(
            asset_path("u1", 43, AssetKind::Upscaled),
            "users/u1/drawings/43_upscaled.png"
        );
    }

    #[test]
    fn test_document_shape_is_camel_case_without_id() {
        let mut record = sample();
        record.id = "doc-1".into();
        let doc = record.to_document().expect("serialize");

        assert!(doc.get("id").is_none());
        assert_eq!(doc["userId"], "u1");
        assert_eq!(doc["ownerId"], "u1");
        assert_eq!(doc["originalDrawingUrl"], "https://cdn.test/o.png");
        assert_eq!(doc["transformedImageUrl"], "https://cdn.test/t.png");
        assert_eq!(doc["isPublic"], false);
        assert_eq!(doc["createdAt"], 1_700_000_000_000_u64);
        assert_eq!(
            doc["storagePaths"]["original"],
            "users/u1/drawings/1700000000000_original.png"
        );
        assert!(doc.get("upscaledImageUrl").is_none());
    }

    #[test]
    fn test_from_document_restores_id() {
        let doc = sample().to_document().expect("serialize");
        let record = CreationRecord::from_document("doc-9", doc).expect("parse");
        assert_eq!(record.id, "doc-9");
        assert_eq!(record.title, "Sunset Fox");
    }

    #[test]
    fn test_timestamp_is_recent() {
        assert!(current_timestamp_millis() > 1_600_000_000_000);
    }
}
