//! Drawing transformation orchestrator.
//!
//! ```text
//! authenticate ─▶ decode drawing ─▶ resolve style ─▶ AI transform
//!       ─▶ title (best effort) ─▶ upload original ┐
//!                                 upload result   ┘ (concurrent)
//!       ─▶ validate URLs ─▶ probe result ─▶ create record ─▶ read back
//! ```
//!
//! Every step before the record write fails the whole request. Nothing is
//! retried at this level; uploads carry their own retry policy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::json;
use sketch_core::codec;
use tracing::{debug, error, info, warn};

use crate::capability::{Capabilities, TransformRequest};
use crate::error::{PipelineError, PipelineResult};
use crate::record::{
    asset_path, current_timestamp_millis, AssetKind, CreationRecord, StoragePaths,
    CREATIONS_COLLECTION, DEFAULT_TITLE, PNG_CONTENT_TYPE,
};
use crate::style;
use crate::upload::{UploadPolicy, Uploader};
use crate::validation;

/// Longest title kept from the title generator.
pub const MAX_TITLE_LEN: usize = 80;

/// A drawing submitted for transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDrawingRequest {
    /// The drawing as an image data URI.
    #[serde(default)]
    pub raster_data_uri: String,
    /// Caller identity; blank means unauthenticated.
    #[serde(default)]
    pub user_id: String,
    /// Built-in style key.
    #[serde(default)]
    pub style_key: String,
    /// Explicit style directive, overriding the key.
    #[serde(default)]
    pub style_description: Option<String>,
    /// Free-text guidance for the transformer.
    #[serde(default)]
    pub refinement_hint: Option<String>,
}

/// Normalized result of [`Orchestrator::process_drawing`].
///
/// Either all success fields are set or only `error` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDrawingResponse {
    /// ID of the saved creation, for follow-up upscale or publish calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_id: Option<String>,
    /// Public URL of the transformed image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_image_url: Option<String>,
    /// Public URL of the original drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_drawing_url: Option<String>,
    /// Generated (or default) title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_title: Option<String>,
    /// Human-readable failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessDrawingResponse {
    /// Returns true if this is a success response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<PipelineResult<TransformOutcome>> for ProcessDrawingResponse {
    fn from(result: PipelineResult<TransformOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                creation_id: Some(outcome.creation_id),
                transformed_image_url: Some(outcome.transformed_image_url),
                original_drawing_url: Some(outcome.original_drawing_url),
                generated_title: Some(outcome.title),
                error: None,
            },
            Err(err) => Self {
                error: Some(err.to_string()),
                ..Self::default()
            },
        }
    }
}

/// A successfully saved transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    /// ID of the saved creation record.
    pub creation_id: String,
    /// Public URL of the original drawing.
    pub original_drawing_url: String,
    /// Public URL of the transformed image.
    pub transformed_image_url: String,
    /// Title stored on the record.
    pub title: String,
}

/// Runs transformations and creation maintenance against a set of capabilities.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    capabilities: Capabilities,
    uploader: Uploader,
    /// One lock per creation with an upscale in flight.
    upscale_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Orchestrator {
    /// Create an orchestrator uploading under `policy`.
    #[must_use]
    pub fn new(capabilities: Capabilities, policy: UploadPolicy) -> Self {
        let uploader = Uploader::new(capabilities.storage.clone(), policy);
        Self::with_uploader(capabilities, uploader)
    }

    /// Create an orchestrator with a preconfigured uploader.
    #[must_use]
    pub fn with_uploader(capabilities: Capabilities, uploader: Uploader) -> Self {
        Self {
            capabilities,
            uploader,
            upscale_locks: Arc::default(),
        }
    }

    /// Transform a drawing and never fail: errors become `error` in the response.
    pub async fn process_drawing(&self, request: &ProcessDrawingRequest) -> ProcessDrawingResponse {
        let result = self.transform(request).await;
        if let Err(err) = &result {
            error!(error = %err, "Drawing transformation failed");
        }
        ProcessDrawingResponse::from(result)
    }

    /// Transform a drawing, upload both images and save a creation record.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first step that fails.
    #[tracing::instrument(name = "transform", skip_all, fields(user_id = %request.user_id, style = %request.style_key))]
    pub async fn transform(
        &self,
        request: &ProcessDrawingRequest,
    ) -> PipelineResult<TransformOutcome> {
        let user_id = validation::validate_user_id(&request.user_id)?;

        let original_png = codec::parse_data_uri(&request.raster_data_uri)
            .and_then(|uri| codec::normalize_to_png(&uri.bytes))
            .map_err(|e| PipelineError::InvalidInput(format!("drawing is not a valid image: {e}")))?;
        let style_description =
            style::resolve_style(&request.style_key, request.style_description.as_deref())?;
        let refinement_hint =
            validation::normalize_refinement_hint(request.refinement_hint.as_deref())?;

        debug!(bytes = original_png.len(), "Requesting AI transformation");
        let output = self
            .capabilities
            .transformer
            .transform(&TransformRequest {
                raster_data_uri: codec::png_data_uri(&original_png),
                style_description,
                refinement_hint,
            })
            .await
            .map_err(|e| PipelineError::Transformation(e.to_string()))?;

        let Some(image_uri) = output.image_data_uri.filter(|uri| !uri.trim().is_empty()) else {
            let reason = output
                .diagnostic
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "the AI service returned no image".to_string());
            return Err(PipelineError::Transformation(reason));
        };
        let transformed_png = codec::parse_data_uri(&image_uri)
            .and_then(|uri| codec::normalize_to_png(&uri.bytes))
            .map_err(|e| {
                PipelineError::Transformation(format!("AI service returned an unreadable image: {e}"))
            })?;

        let title = self
            .generate_title(&codec::png_data_uri(&transformed_png))
            .await;

        let created_at = current_timestamp_millis();
        let storage_paths = StoragePaths::for_drawing(user_id, created_at);
        let (original_url, transformed_url) = futures::future::try_join(
            self.uploader
                .upload(&storage_paths.original, &original_png, PNG_CONTENT_TYPE),
            self.uploader
                .upload(&storage_paths.transformed, &transformed_png, PNG_CONTENT_TYPE),
        )
        .await?;

        let original_url = validation::validate_asset_url(&original_url)?;
        let transformed_url = validation::validate_asset_url(&transformed_url)?;

        if !self.capabilities.probe.is_reachable(&transformed_url).await {
            return Err(PipelineError::Unreachable(transformed_url.to_string()));
        }

        let record = CreationRecord {
            id: String::new(),
            user_id: user_id.to_string(),
            owner_id: user_id.to_string(),
            original_drawing_url: original_url.to_string(),
            transformed_image_url: transformed_url.to_string(),
            upscaled_image_url: None,
            title,
            style: request.style_key.trim().to_string(),
            is_public: false,
            created_at,
            storage_paths,
        };
        let document = record
            .to_document()
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        let creation_id = self
            .capabilities
            .documents
            .create(CREATIONS_COLLECTION, document)
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        match self
            .capabilities
            .documents
            .get(CREATIONS_COLLECTION, &creation_id)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(PipelineError::Verification(format!(
                    "creation {creation_id} is missing"
                )))
            }
            Err(e) => {
                return Err(PipelineError::Verification(format!(
                    "creation {creation_id}: {e}"
                )))
            }
        }

        info!(creation_id = %creation_id, "Drawing transformed and saved");
        Ok(TransformOutcome {
            creation_id,
            original_drawing_url: record.original_drawing_url,
            transformed_image_url: record.transformed_image_url,
            title: record.title,
        })
    }

    /// Fetch a creation owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `Authentication`, `NotFound`, `Forbidden` or `Persistence`.
    pub async fn creation(&self, user_id: &str, creation_id: &str) -> PipelineResult<CreationRecord> {
        let user_id = validation::validate_user_id(user_id)?;
        self.load_owned(user_id, creation_id).await
    }

    /// Produce (once) and return the upscaled rendition of a creation.
    ///
    /// A creation that already has an upscaled image returns it without
    /// calling the upscaler again. Concurrent calls for the same creation are
    /// serialized, so the upscaler runs at most once per creation.
    ///
    /// # Errors
    ///
    /// Returns `Authentication`, `NotFound`, `Forbidden`, `Upscale`,
    /// `Upload`, `MalformedUrl` or `Persistence`.
    #[tracing::instrument(skip(self))]
    pub async fn upscale(&self, user_id: &str, creation_id: &str) -> PipelineResult<String> {
        let user_id = validation::validate_user_id(user_id)?;
        let creation_id = validation::validate_creation_id(creation_id)?;

        let lock = self.upscale_lock(creation_id);
        let result = {
            let _guard = lock.lock().await;
            self.upscale_locked(user_id, creation_id).await
        };
        self.release_upscale_lock(creation_id, &lock);
        result
    }

    fn upscale_lock(&self, creation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .upscale_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(creation_id.to_string()).or_default().clone()
    }

    /// Forget the lock once no other caller holds it.
    fn release_upscale_lock(&self, creation_id: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .upscale_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The map and `lock` are the only references left.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(creation_id);
        }
    }

    async fn upscale_locked(&self, user_id: &str, creation_id: &str) -> PipelineResult<String> {
        let record = self.load_owned(user_id, creation_id).await?;

        if let Some(url) = record.upscaled_image_url {
            debug!("Creation already upscaled");
            return Ok(url);
        }

        let data_uri = self
            .capabilities
            .upscaler
            .upscale(&record.transformed_image_url)
            .await
            .map_err(|e| PipelineError::Upscale(e.to_string()))?;
        let png = codec::parse_data_uri(&data_uri)
            .and_then(|uri| codec::normalize_to_png(&uri.bytes))
            .map_err(|e| PipelineError::Upscale(format!("upscaler returned an unreadable image: {e}")))?;

        let path = asset_path(user_id, current_timestamp_millis(), AssetKind::Upscaled);
        let url = self.uploader.upload(&path, &png, PNG_CONTENT_TYPE).await?;
        let url = validation::validate_asset_url(&url)?.to_string();

        let mut storage_paths = record.storage_paths;
        storage_paths.upscaled = Some(path);
        self.capabilities
            .documents
            .update(
                CREATIONS_COLLECTION,
                &record.id,
                json!({
                    "upscaledImageUrl": url,
                    "storagePaths": storage_paths,
                }),
            )
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        info!("Creation upscaled");
        Ok(url)
    }

    /// Publish or unpublish a creation.
    ///
    /// Publishing requires a safe moderation verdict; unpublishing never
    /// consults moderation. Returns the resulting visibility.
    ///
    /// # Errors
    ///
    /// Returns `Authentication`, `NotFound`, `Forbidden`, `Moderation` or
    /// `Persistence`.
    #[tracing::instrument(skip(self))]
    pub async fn set_visibility(
        &self,
        user_id: &str,
        creation_id: &str,
        public: bool,
    ) -> PipelineResult<bool> {
        let user_id = validation::validate_user_id(user_id)?;
        let record = self.load_owned(user_id, creation_id).await?;

        if record.is_public == public {
            return Ok(public);
        }

        if public {
            let verdict = self
                .capabilities
                .moderator
                .moderate(&record.transformed_image_url)
                .await
                .map_err(|e| PipelineError::Moderation(format!("moderation unavailable: {e}")))?;
            if !verdict.safe {
                let reason = verdict
                    .reason
                    .unwrap_or_else(|| "flagged by content moderation".to_string());
                warn!(reason = %reason, "Publish blocked by moderation");
                return Err(PipelineError::Moderation(reason));
            }
        }

        self.capabilities
            .documents
            .update(CREATIONS_COLLECTION, &record.id, json!({ "isPublic": public }))
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        info!(public, "Creation visibility changed");
        Ok(public)
    }

    async fn load_owned(&self, user_id: &str, creation_id: &str) -> PipelineResult<CreationRecord> {
        let creation_id = validation::validate_creation_id(creation_id)?;
        let document = self
            .capabilities
            .documents
            .get(CREATIONS_COLLECTION, creation_id)
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?
            .ok_or_else(|| PipelineError::NotFound(creation_id.to_string()))?;
        let record = CreationRecord::from_document(creation_id, document).map_err(|e| {
            PipelineError::Persistence(format!("creation {creation_id} is corrupt: {e}"))
        })?;

        if record.owner_id != user_id {
            return Err(PipelineError::Forbidden(creation_id.to_string()));
        }
        Ok(record)
    }

    async fn generate_title(&self, image_data_uri: &str) -> String {
        match self.capabilities.titles.generate_title(image_data_uri).await {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    warn!("Title generator returned an empty title, using default");
                    DEFAULT_TITLE.to_string()
                } else {
                    title
                }
            }
            Err(e) => {
                warn!(error = %e, "Title generation failed, using default");
                DEFAULT_TITLE.to_string()
            }
        }
    }
}

/// Trim whitespace and wrapping quotes, and cap the length.
fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .chars()
        .take(MAX_TITLE_LEN)
        .collect()
}
