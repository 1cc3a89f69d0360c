//! # Sketch Studio Pipeline
//!
//! Turns a finished drawing into a saved, AI-rendered creation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Orchestrator                 │
//! │  transform · upscale · set_visibility        │
//! ├──────────────────────────────────────────────┤
//! │  Uploader (stall timeout + backoff retry)    │
//! ├──────────────────────────────────────────────┤
//! │  Capabilities (Arc<dyn Trait>)               │
//! │  - ImageTransformer / TitleGenerator         │
//! │  - ContentModerator / ImageUpscaler          │
//! │  - ObjectStorage / DocumentStore / Probe     │
//! ├──────────────────────────────────────────────┤
//! │  Adapters: HttpAiClient · HttpAssetProbe     │
//! │  LocalObjectStorage · File/MemoryDocStore    │
//! └──────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod record;
pub mod storage;
pub mod store;
pub mod style;
pub mod upload;
pub mod validation;

pub use capability::{
    AssetProbe, Capabilities, ContentModerator, DocumentStore, ImageTransformer, ImageUpscaler,
    ModerationVerdict, ObjectStorage, TitleGenerator, TransformOutput, TransformRequest,
};
pub use error::{
    CapabilityError, PipelineError, PipelineResult, StorageError, StoreError, UploadError,
};
pub use http::{HttpAiClient, HttpAssetProbe};
pub use orchestrator::{Orchestrator, ProcessDrawingRequest, ProcessDrawingResponse, TransformOutcome};
pub use record::{CreationRecord, StoragePaths, CREATIONS_COLLECTION, DEFAULT_TITLE};
pub use storage::LocalObjectStorage;
pub use store::{FileDocumentStore, MemoryDocumentStore};
pub use style::{StylePreset, STYLE_PRESETS};
pub use upload::{ProgressObserver, ProgressReporter, UploadPolicy, Uploader};
