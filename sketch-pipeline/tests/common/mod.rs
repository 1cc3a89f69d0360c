//! Scriptable capability fakes for orchestrator tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sketch_core::{DrawingSession, Orientation, PointerEvent};
use sketch_pipeline::{
    AssetProbe, Capabilities, CapabilityError, ContentModerator, DocumentStore, ImageTransformer,
    ImageUpscaler, MemoryDocumentStore, ModerationVerdict, ObjectStorage, Orchestrator,
    ProcessDrawingRequest, ProgressReporter, StorageError, StoreError, TitleGenerator,
    TransformOutput, TransformRequest, UploadPolicy,
};
use tokio::sync::Barrier;
use url::Url;

/// A drawing with one diagonal stroke, as a PNG data URI.
pub fn drawing_data_uri() -> String {
    let mut session = DrawingSession::new(Orientation::Landscape);
    session.handle_pointer(PointerEvent::down(20.0, 20.0));
    session.handle_pointer(PointerEvent::moved(400.0, 300.0));
    session.handle_pointer(PointerEvent::up(400.0, 300.0));
    session.snapshot_data_uri().expect("snapshot")
}

/// A blank portrait image standing in for AI output.
pub fn rendered_data_uri() -> String {
    DrawingSession::new(Orientation::Portrait)
        .snapshot_data_uri()
        .expect("snapshot")
}

/// A valid request from `u1` in the watercolor style.
pub fn request() -> ProcessDrawingRequest {
    ProcessDrawingRequest {
        raster_data_uri: drawing_data_uri(),
        user_id: "u1".into(),
        style_key: "watercolor".into(),
        style_description: None,
        refinement_hint: None,
    }
}

/// Fake AI service covering all four AI capabilities.
pub struct FakeAi {
    pub transform_output: Mutex<TransformOutput>,
    pub title: Mutex<Result<String, String>>,
    pub verdict: Mutex<ModerationVerdict>,
    pub upscaled: Mutex<Option<String>>,
    /// How long each upscale call takes.
    pub upscale_delay: Duration,
    pub last_request: Mutex<Option<TransformRequest>>,
    pub transform_calls: AtomicUsize,
    pub moderate_calls: AtomicUsize,
    pub upscale_calls: AtomicUsize,
}

impl Default for FakeAi {
    fn default() -> Self {
        Self {
            transform_output: Mutex::new(TransformOutput {
                image_data_uri: Some(rendered_data_uri()),
                diagnostic: None,
            }),
            title: Mutex::new(Ok("Moonlit Harbor".into())),
            verdict: Mutex::new(ModerationVerdict {
                safe: true,
                reason: None,
            }),
            upscaled: Mutex::new(Some(rendered_data_uri())),
            upscale_delay: Duration::ZERO,
            last_request: Mutex::new(None),
            transform_calls: AtomicUsize::new(0),
            moderate_calls: AtomicUsize::new(0),
            upscale_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeAi {
    pub fn transform_calls(&self) -> usize {
        self.transform_calls.load(Ordering::SeqCst)
    }

    pub fn moderate_calls(&self) -> usize {
        self.moderate_calls.load(Ordering::SeqCst)
    }

    pub fn upscale_calls(&self) -> usize {
        self.upscale_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageTransformer for FakeAi {
    async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformOutput, CapabilityError> {
        self.transform_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.transform_output.lock().unwrap().clone())
    }
}

#[async_trait]
impl TitleGenerator for FakeAi {
    async fn generate_title(&self, _image_data_uri: &str) -> Result<String, CapabilityError> {
        self.title
            .lock()
            .unwrap()
            .clone()
            .map_err(CapabilityError::Unavailable)
    }
}

#[async_trait]
impl ContentModerator for FakeAi {
    async fn moderate(&self, _image_url: &str) -> Result<ModerationVerdict, CapabilityError> {
        self.moderate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.lock().unwrap().clone())
    }
}

#[async_trait]
impl ImageUpscaler for FakeAi {
    async fn upscale(&self, _image_url: &str) -> Result<String, CapabilityError> {
        self.upscale_calls.fetch_add(1, Ordering::SeqCst);
        if !self.upscale_delay.is_zero() {
            tokio::time::sleep(self.upscale_delay).await;
        }
        self.upscaled
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CapabilityError::Unavailable("upscaler offline".into()))
    }
}

/// In-memory object storage returning `{url_prefix}{path}`.
pub struct FakeStorage {
    pub url_prefix: String,
    /// Paths containing this fragment are rejected with the given error.
    pub reject: Option<(String, StorageError)>,
    /// Every put waits here until enough puts are in flight together.
    pub gate: Option<Arc<Barrier>>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl Default for FakeStorage {
    fn default() -> Self {
        Self {
            url_prefix: "https://storage.test/".into(),
            reject: None,
            gate: None,
            objects: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeStorage {
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
        progress: &ProgressReporter,
    ) -> Result<String, StorageError> {
        if let Some((fragment, error)) = &self.reject {
            if path.contains(fragment.as_str()) {
                return Err(error.clone());
            }
        }
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        progress.report(1.0);
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(format!("{}{path}", self.url_prefix))
    }
}

/// Probe with a fixed answer.
pub struct FakeProbe(pub bool);

#[async_trait]
impl AssetProbe for FakeProbe {
    async fn is_reachable(&self, _url: &Url) -> bool {
        self.0
    }
}

/// Document store that accepts writes but never finds anything.
#[derive(Default)]
pub struct ForgetfulStore;

#[async_trait]
impl DocumentStore for ForgetfulStore {
    async fn create(&self, _collection: &str, _document: Value) -> Result<String, StoreError> {
        Ok("lost".into())
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Value>, StoreError> {
        Ok(None)
    }

    async fn update(&self, collection: &str, id: &str, _patch: Value) -> Result<(), StoreError> {
        Err(StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        })
    }
}

/// An orchestrator wired to fakes, with handles for inspection.
pub struct Harness {
    pub ai: Arc<FakeAi>,
    pub storage: Arc<FakeStorage>,
    pub documents: Arc<MemoryDocumentStore>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeAi::default(), FakeStorage::default(), true)
    }

    pub fn with(ai: FakeAi, storage: FakeStorage, reachable: bool) -> Self {
        let ai = Arc::new(ai);
        let storage = Arc::new(storage);
        let documents = Arc::new(MemoryDocumentStore::new());
        let capabilities = Capabilities {
            transformer: ai.clone(),
            titles: ai.clone(),
            moderator: ai.clone(),
            upscaler: ai.clone(),
            storage: storage.clone(),
            documents: documents.clone(),
            probe: Arc::new(FakeProbe(reachable)),
        };
        Self {
            ai,
            storage,
            documents,
            orchestrator: Orchestrator::new(capabilities, fast_policy()),
        }
    }

    /// Same fakes, but records vanish after being written.
    pub fn forgetful() -> Self {
        let mut harness = Self::new();
        let capabilities = Capabilities {
            transformer: harness.ai.clone(),
            titles: harness.ai.clone(),
            moderator: harness.ai.clone(),
            upscaler: harness.ai.clone(),
            storage: harness.storage.clone(),
            documents: Arc::new(ForgetfulStore),
            probe: Arc::new(FakeProbe(true)),
        };
        harness.orchestrator = Orchestrator::new(capabilities, fast_policy());
        harness
    }
}

/// Short delays so failing uploads do not slow the suite.
pub fn fast_policy() -> UploadPolicy {
    UploadPolicy::new(3, Duration::from_millis(5), Duration::from_secs(5))
}
