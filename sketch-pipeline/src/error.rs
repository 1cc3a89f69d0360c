//! Error types for the transformation pipeline.
//!
//! Capability failures ([`StorageError`], [`CapabilityError`], [`StoreError`])
//! are translated into a [`PipelineError`] at the orchestrator boundary so the
//! caller only ever sees one taxonomy with a human-readable message.

use std::time::Duration;

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures surfaced to the caller of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No user identity accompanied the request.
    #[error("authentication required: sign in before transforming a drawing")]
    Authentication,

    /// The request itself is unusable (bad drawing, unknown style, bad ID).
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The AI transformer failed or returned no usable image.
    #[error("AI transformation failed: {0}")]
    Transformation(String),

    /// An image upload failed permanently.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Storage returned a URL that is not an absolute http(s) URL.
    #[error("storage returned a malformed URL: {0}")]
    MalformedUrl(String),

    /// The uploaded transformed image could not be fetched back.
    #[error("transformed image is not reachable at {0}")]
    Unreachable(String),

    /// The creation record could not be written.
    #[error("failed to save creation: {0}")]
    Persistence(String),

    /// The creation record was written but could not be read back.
    #[error("creation could not be verified after saving: {0}")]
    Verification(String),

    /// No creation exists with the given ID.
    #[error("creation not found: {0}")]
    NotFound(String),

    /// The caller does not own the creation.
    #[error("not allowed to modify creation {0}")]
    Forbidden(String),

    /// Moderation rejected the image or could not be consulted.
    #[error("image cannot be published: {0}")]
    Moderation(String),

    /// The upscaler failed or returned no usable image.
    #[error("upscaling failed: {0}")]
    Upscale(String),
}

/// Error kinds reported by object storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Storage backend is temporarily unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The caller may not write to this path.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The payload or path was rejected outright.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// I/O failure while writing.
    #[error("storage I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns true if another attempt could succeed.
    ///
    /// Permission and payload errors fail the same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Permanent failure of a resilient upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Storage rejected the upload with a non-retryable error.
    #[error("upload of {path} was rejected: {source}")]
    Rejected {
        /// Storage path of the payload.
        path: String,
        /// The storage error.
        #[source]
        source: StorageError,
    },

    /// Every attempt failed.
    #[error("upload of {path} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Storage path of the payload.
        path: String,
        /// Number of attempts made.
        attempts: u32,
        /// Description of the final attempt's failure.
        last_error: String,
    },
}

impl UploadError {
    /// Storage path of the failed upload.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Rejected { path, .. } | Self::Exhausted { path, .. } => path,
        }
    }
}

/// Why a single upload attempt ended without a URL.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("stalled with no progress after {0:?}")]
    Stalled(Duration),
}

/// Failures from remote AI capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("capability request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("capability returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response did not match the expected structure.
    #[error("unexpected capability response: {0}")]
    UnexpectedResponse(String),

    /// The capability is not configured or refused the request.
    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

/// Failures from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("document store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be (de)serialized.
    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document to update does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Document ID.
        id: String,
    },

    /// Collection or document ID is not acceptable.
    #[error("invalid document key: {0}")]
    InvalidKey(String),

    /// Patch was not a JSON object.
    #[error("document patch must be a JSON object")]
    InvalidPatch,
}
