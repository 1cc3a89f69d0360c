//! Capability seams consumed by the orchestrator.
//!
//! Each external service the pipeline relies on is an object-safe async
//! trait so deployments (and tests) can swap implementations behind an
//! `Arc<dyn ...>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{CapabilityError, StorageError, StoreError};
use crate::upload::ProgressReporter;

/// Input to the AI image transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    /// The drawing as a PNG data URI.
    pub raster_data_uri: String,
    /// Resolved art style description.
    pub style_description: String,
    /// Optional free-text guidance from the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_hint: Option<String>,
}

/// Output of the AI image transformer.
///
/// A response without an image is a failure; `diagnostic` then says why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    /// Generated image as a data URI.
    #[serde(default)]
    pub image_data_uri: Option<String>,
    /// Explanation when no image was produced.
    #[serde(default)]
    pub diagnostic: Option<String>,
}

/// Verdict returned by content moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    /// Whether the image may be shown publicly.
    pub safe: bool,
    /// Reason for an unsafe verdict.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Turns a drawing into a styled image.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Transform the drawing described by `request`.
    async fn transform(&self, request: &TransformRequest)
        -> Result<TransformOutput, CapabilityError>;
}

/// Suggests a short title for an image.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    /// Generate a title for the image data URI.
    async fn generate_title(&self, image_data_uri: &str) -> Result<String, CapabilityError>;
}

/// Screens images before they are made public.
#[async_trait]
pub trait ContentModerator: Send + Sync {
    /// Moderate the image at `image_url`.
    async fn moderate(&self, image_url: &str) -> Result<ModerationVerdict, CapabilityError>;
}

/// Produces a higher-resolution rendition of an image.
#[async_trait]
pub trait ImageUpscaler: Send + Sync {
    /// Upscale the image at `image_url`, returning a data URI.
    async fn upscale(&self, image_url: &str) -> Result<String, CapabilityError>;
}

/// Binary object storage with publicly resolvable URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` and return its public URL.
    ///
    /// Implementations report write progress through `progress`; an upload
    /// that never reports progress is treated as stalled.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        progress: &ProgressReporter,
    ) -> Result<String, StorageError>;
}

/// Schemaless document store keyed by collection and ID.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its generated ID.
    async fn create(&self, collection: &str, document: Value) -> Result<String, StoreError>;

    /// Fetch a document, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Merge the top-level fields of `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;
}

/// Checks that a public asset URL can be fetched.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Returns true if the asset answers with a success status.
    async fn is_reachable(&self, url: &Url) -> bool;
}

/// The full set of collaborators the orchestrator needs.
#[derive(Clone)]
pub struct Capabilities {
    /// AI image transformer.
    pub transformer: Arc<dyn ImageTransformer>,
    /// AI title generator.
    pub titles: Arc<dyn TitleGenerator>,
    /// Content moderation.
    pub moderator: Arc<dyn ContentModerator>,
    /// AI upscaler.
    pub upscaler: Arc<dyn ImageUpscaler>,
    /// Object storage for images.
    pub storage: Arc<dyn ObjectStorage>,
    /// Document store for creation records.
    pub documents: Arc<dyn DocumentStore>,
    /// Reachability probe for uploaded assets.
    pub probe: Arc<dyn AssetProbe>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
