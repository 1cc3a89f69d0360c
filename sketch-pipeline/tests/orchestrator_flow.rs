//! Orchestrator integration tests.
//!
//! Drives the full transform flow against scriptable fakes:
//! - Success path and the persisted record
//! - Each failure step and what it leaves behind
//! - Upscale idempotence and moderation-gated publishing

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{request, FakeAi, FakeStorage, Harness};
use sketch_pipeline::{
    CreationRecord, DocumentStore, ModerationVerdict, PipelineError, StorageError,
    TransformOutput, UploadError, CREATIONS_COLLECTION, DEFAULT_TITLE,
};
use tokio::sync::Barrier;
use url::Url;

async fn saved_record(harness: &Harness, id: &str) -> CreationRecord {
    let doc = harness
        .documents
        .get(CREATIONS_COLLECTION, id)
        .await
        .expect("get")
        .expect("record exists");
    CreationRecord::from_document(id, doc).expect("record shape")
}

// ===========================================================================
// Transform
// ===========================================================================

#[tokio::test]
async fn transform_saves_record_with_valid_urls() {
    let harness = Harness::new();

    let outcome = harness
        .orchestrator
        .transform(&request())
        .await
        .expect("transform");

    for url in [&outcome.original_drawing_url, &outcome.transformed_image_url] {
        let parsed = Url::parse(url).expect("absolute URL");
        assert!(matches!(parsed.scheme(), "http" | "https"));
        assert!(parsed.host_str().is_some());
    }
    assert_eq!(outcome.title, "Moonlit Harbor");

    let record = saved_record(&harness, &outcome.creation_id).await;
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.owner_id, "u1");
    assert_eq!(record.style, "watercolor");
    assert!(!record.is_public);
    assert_eq!(record.transformed_image_url, outcome.transformed_image_url);
    assert_eq!(
        record.storage_paths.original,
        format!("users/u1/drawings/{}_original.png", record.created_at)
    );
    assert_eq!(
        harness.storage.paths(),
        vec![
            record.storage_paths.original.clone(),
            record.storage_paths.transformed.clone()
        ]
    );
}

#[tokio::test]
async fn transform_sends_resolved_style_and_hint() {
    let harness = Harness::new();
    let mut req = request();
    req.style_description = Some("stained glass".into());
    req.refinement_hint = Some("  add a moon ".into());

    harness.orchestrator.transform(&req).await.expect("transform");

    let sent = harness.ai.last_request.lock().unwrap().clone().expect("sent");
    assert_eq!(sent.style_description, "stained glass");
    assert_eq!(sent.refinement_hint.as_deref(), Some("add a moon"));
    assert!(sent.raster_data_uri.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn missing_identity_is_rejected_before_any_work() {
    let harness = Harness::new();
    let mut req = request();
    req.user_id = "  ".into();

    let err = harness.orchestrator.transform(&req).await.expect_err("unauthenticated");
    assert!(matches!(err, PipelineError::Authentication));
    assert_eq!(harness.ai.transform_calls(), 0);
    assert!(harness.storage.paths().is_empty());
}

#[tokio::test]
async fn bad_drawing_or_style_is_invalid_input() {
    let harness = Harness::new();

    let mut req = request();
    req.raster_data_uri = "data:image/png;base64,AAAA".into();
    assert!(matches!(
        harness.orchestrator.transform(&req).await,
        Err(PipelineError::InvalidInput(_))
    ));

    let mut req = request();
    req.style_key = "claymation".into();
    assert!(matches!(
        harness.orchestrator.transform(&req).await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert_eq!(harness.ai.transform_calls(), 0);
}

#[tokio::test]
async fn no_image_fails_with_diagnostic_and_no_record() {
    let ai = FakeAi::default();
    *ai.transform_output.lock().unwrap() = TransformOutput {
        image_data_uri: None,
        diagnostic: Some("prompt blocked by safety filter".into()),
    };
    let harness = Harness::with(ai, FakeStorage::default(), true);

    let response = harness.orchestrator.process_drawing(&request()).await;

    let error = response.error.expect("error");
    assert!(error.contains("prompt blocked by safety filter"));
    assert!(response.transformed_image_url.is_none());
    assert!(response.original_drawing_url.is_none());
    assert!(response.generated_title.is_none());
    assert!(harness.documents.is_empty(CREATIONS_COLLECTION));
    assert!(harness.storage.paths().is_empty());
}

#[tokio::test]
async fn title_failure_falls_back_to_default() {
    let ai = FakeAi::default();
    *ai.title.lock().unwrap() = Err("title model offline".into());
    let harness = Harness::with(ai, FakeStorage::default(), true);

    let response = harness.orchestrator.process_drawing(&request()).await;
    assert!(response.is_success());
    assert_eq!(response.generated_title.as_deref(), Some(DEFAULT_TITLE));
}

#[tokio::test]
async fn rejected_upload_aborts_without_record() {
    let storage = FakeStorage {
        reject: Some((
            "transformed".into(),
            StorageError::PermissionDenied("bucket is read-only".into()),
        )),
        ..FakeStorage::default()
    };
    let harness = Harness::with(FakeAi::default(), storage, true);

    let err = harness.orchestrator.transform(&request()).await.expect_err("upload");
    match err {
        PipelineError::Upload(UploadError::Rejected { path, .. }) => {
            assert!(path.ends_with("_transformed.png"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.documents.is_empty(CREATIONS_COLLECTION));
}

#[tokio::test]
async fn exhausted_upload_reports_attempts() {
    let storage = FakeStorage {
        reject: Some(("original".into(), StorageError::Unavailable("503".into()))),
        ..FakeStorage::default()
    };
    let harness = Harness::with(FakeAi::default(), storage, true);

    let response = harness.orchestrator.process_drawing(&request()).await;
    let error = response.error.expect("error");
    assert!(error.contains("3 attempts"), "{error}");
    assert!(harness.documents.is_empty(CREATIONS_COLLECTION));
}

#[tokio::test]
async fn malformed_storage_url_is_rejected() {
    let storage = FakeStorage {
        url_prefix: "storage.test/".into(),
        ..FakeStorage::default()
    };
    let harness = Harness::with(FakeAi::default(), storage, true);

    let err = harness.orchestrator.transform(&request()).await.expect_err("url");
    assert!(matches!(err, PipelineError::MalformedUrl(_)));
    assert!(harness.documents.is_empty(CREATIONS_COLLECTION));
}

#[tokio::test]
async fn unreachable_result_is_rejected() {
    let harness = Harness::with(FakeAi::default(), FakeStorage::default(), false);

    let err = harness.orchestrator.transform(&request()).await.expect_err("probe");
    assert!(matches!(err, PipelineError::Unreachable(_)));
    assert!(harness.documents.is_empty(CREATIONS_COLLECTION));
}

#[tokio::test]
async fn record_missing_after_write_fails_verification() {
    let harness = Harness::forgetful();

    let err = harness.orchestrator.transform(&request()).await.expect_err("verify");
    assert!(matches!(err, PipelineError::Verification(_)));
}

#[tokio::test]
async fn both_uploads_run_concurrently() {
    // Each put blocks until the other one is in flight too
    let harness = Harness::with(
        FakeAi::default(),
        FakeStorage {
            gate: Some(Arc::new(Barrier::new(2))),
            ..FakeStorage::default()
        },
        true,
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        harness.orchestrator.transform(&request()),
    )
    .await
    .expect("uploads did not overlap")
    .expect("transform");

    assert!(outcome.original_drawing_url.ends_with("_original.png"));
    assert!(outcome.transformed_image_url.ends_with("_transformed.png"));
    assert_eq!(harness.storage.paths().len(), 2);
}

// ===========================================================================
// Upscale
// ===========================================================================

#[tokio::test]
async fn upscale_runs_once_and_updates_record() {
    let harness = Harness::new();
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    let first = harness
        .orchestrator
        .upscale("u1", &outcome.creation_id)
        .await
        .expect("upscale");
    let second = harness
        .orchestrator
        .upscale("u1", &outcome.creation_id)
        .await
        .expect("upscale again");

    assert_eq!(first, second);
    assert_eq!(harness.ai.upscale_calls(), 1);

    let record = saved_record(&harness, &outcome.creation_id).await;
    assert_eq!(record.upscaled_image_url.as_deref(), Some(first.as_str()));
    let upscaled_path = record.storage_paths.upscaled.expect("upscaled path");
    assert!(upscaled_path.starts_with("users/u1/drawings/"));
    assert!(upscaled_path.ends_with("_upscaled.png"));
    // Original paths survive the patch
    assert!(record.storage_paths.original.ends_with("_original.png"));
}

#[tokio::test]
async fn concurrent_upscales_share_one_result() {
    let harness = Harness::with(
        FakeAi {
            upscale_delay: Duration::from_millis(50),
            ..FakeAi::default()
        },
        FakeStorage::default(),
        true,
    );
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    let (first, second) = tokio::join!(
        harness.orchestrator.upscale("u1", &outcome.creation_id),
        harness.orchestrator.upscale("u1", &outcome.creation_id),
    );
    let first = first.expect("first upscale");
    let second = second.expect("second upscale");

    assert_eq!(first, second);
    assert_eq!(harness.ai.upscale_calls(), 1);
    let record = saved_record(&harness, &outcome.creation_id).await;
    assert_eq!(record.upscaled_image_url.as_deref(), Some(first.as_str()));
    let upscaled: Vec<_> = harness
        .storage
        .paths()
        .into_iter()
        .filter(|p| p.ends_with("_upscaled.png"))
        .collect();
    assert_eq!(upscaled.len(), 1);
}

#[tokio::test]
async fn upscale_checks_ownership_and_existence() {
    let harness = Harness::new();
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    assert!(matches!(
        harness.orchestrator.upscale("u2", &outcome.creation_id).await,
        Err(PipelineError::Forbidden(_))
    ));
    assert!(matches!(
        harness.orchestrator.upscale("u1", "does-not-exist").await,
        Err(PipelineError::NotFound(_))
    ));
    assert!(matches!(
        harness.orchestrator.upscale("", &outcome.creation_id).await,
        Err(PipelineError::Authentication)
    ));
    assert_eq!(harness.ai.upscale_calls(), 0);
}

#[tokio::test]
async fn upscaler_failure_leaves_record_untouched() {
    let ai = FakeAi::default();
    *ai.upscaled.lock().unwrap() = None;
    let harness = Harness::with(ai, FakeStorage::default(), true);
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    let err = harness
        .orchestrator
        .upscale("u1", &outcome.creation_id)
        .await
        .expect_err("upscaler offline");
    assert!(matches!(err, PipelineError::Upscale(_)));

    let record = saved_record(&harness, &outcome.creation_id).await;
    assert!(record.upscaled_image_url.is_none());
}

// ===========================================================================
// Visibility
// ===========================================================================

#[tokio::test]
async fn unsafe_image_cannot_be_published() {
    let ai = FakeAi::default();
    *ai.verdict.lock().unwrap() = ModerationVerdict {
        safe: false,
        reason: Some("graphic content".into()),
    };
    let harness = Harness::with(ai, FakeStorage::default(), true);
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    let err = harness
        .orchestrator
        .set_visibility("u1", &outcome.creation_id, true)
        .await
        .expect_err("moderation");
    assert!(matches!(err, PipelineError::Moderation(_)));
    assert!(err.to_string().contains("graphic content"));

    let record = saved_record(&harness, &outcome.creation_id).await;
    assert!(!record.is_public);
}

#[tokio::test]
async fn publish_then_unpublish() {
    let harness = Harness::new();
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    let public = harness
        .orchestrator
        .set_visibility("u1", &outcome.creation_id, true)
        .await
        .expect("publish");
    assert!(public);
    assert!(saved_record(&harness, &outcome.creation_id).await.is_public);
    assert_eq!(harness.ai.moderate_calls(), 1);

    let public = harness
        .orchestrator
        .set_visibility("u1", &outcome.creation_id, false)
        .await
        .expect("unpublish");
    assert!(!public);
    assert!(!saved_record(&harness, &outcome.creation_id).await.is_public);
    // Unpublishing never consults moderation
    assert_eq!(harness.ai.moderate_calls(), 1);
}

#[tokio::test]
async fn only_owner_changes_visibility() {
    let harness = Harness::new();
    let outcome = harness.orchestrator.transform(&request()).await.expect("transform");

    assert!(matches!(
        harness
            .orchestrator
            .set_visibility("intruder", &outcome.creation_id, true)
            .await,
        Err(PipelineError::Forbidden(_))
    ));
    assert_eq!(harness.ai.moderate_calls(), 0);
}
