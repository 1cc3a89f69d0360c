//! Error types for drawing engine operations.

use thiserror::Error;

/// Result type for drawing engine operations.
pub type SketchResult<T> = Result<T, SketchError>;

/// Errors that can occur in drawing engine operations.
#[derive(Debug, Error)]
pub enum SketchError {
    /// A surface was requested with a zero-sized axis.
    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Raster could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// A data URI was malformed or used an unsupported encoding.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// A preserved snapshot could not be redrawn after a resize.
    #[error("Failed to restore snapshot: {0}")]
    SnapshotRestore(String),
}
