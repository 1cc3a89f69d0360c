//! # Sketch Studio Core
//!
//! Interactive drawing engine: a pixel surface pair driven by a pointer
//! state machine, with flood fill and resize transitions that never drop
//! the user's drawing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               DrawingSession                │
//! ├─────────────────────────────────────────────┤
//! │  Tool State Machine  │  Transition Manager  │
//! │  - Brush / shapes    │  - Orientation       │
//! │  - Fill dispatch     │  - Immersive mode    │
//! │                      │  - Snapshot redraw   │
//! ├─────────────────────────────────────────────┤
//! │  Surface Pair        │  Ingestion / Codec   │
//! │  - Committed buffer  │  - Bounded import    │
//! │  - Overlay buffer    │  - PNG data URIs     │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod error;
pub mod event;
pub mod fill;
pub mod ingest;
pub mod raster;
pub mod session;
pub mod surface;
pub mod tool;
pub mod transition;

pub use codec::{DataUri, ImageFormat};
pub use error::{SketchError, SketchResult};
pub use event::{Point, PointerEvent, PointerPhase};
pub use ingest::{ImportReport, MAX_IMPORT_DIMENSION};
pub use raster::{Color, BLACK, TRANSPARENT, WHITE};
pub use session::DrawingSession;
pub use surface::{Orientation, ShapeKind, SurfaceState, LANDSCAPE_PRESET, PORTRAIT_PRESET};
pub use tool::{Tool, ToolEffect, ToolPhase, ToolState};
pub use transition::{Snapshot, TransitionManager, TransitionOutcome};
