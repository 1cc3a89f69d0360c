//! API route handlers.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sketch_pipeline::{PipelineError, ProcessDrawingRequest, ProcessDrawingResponse};

use crate::metrics;
use crate::AppState;

/// Body of `POST /api/creations/{id}/upscale`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleBody {
    /// Caller identity.
    #[serde(default)]
    pub user_id: String,
}

/// Body of `POST /api/creations/{id}/visibility`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityBody {
    /// Caller identity.
    #[serde(default)]
    pub user_id: String,
    /// Requested visibility.
    pub is_public: bool,
}

/// Query of `GET /api/creations/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    /// Caller identity.
    #[serde(default)]
    pub user_id: String,
}

/// Successful upscale.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleResponse {
    /// Public URL of the upscaled image.
    pub upscaled_image_url: String,
}

/// Successful visibility change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityResponse {
    /// Resulting visibility.
    pub is_public: bool,
}

/// Error body shared by creation endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable failure.
    pub error: String,
}

/// HTTP status for a pipeline failure.
#[must_use]
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Authentication => StatusCode::UNAUTHORIZED,
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::Forbidden(_) => StatusCode::FORBIDDEN,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Moderation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Transformation(_)
        | PipelineError::Upscale(_)
        | PipelineError::Upload(_)
        | PipelineError::MalformedUrl(_)
        | PipelineError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Persistence(_) | PipelineError::Verification(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// A pipeline failure rendered as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Transform a drawing. Always answers 200; failures are in `error`,
/// including bodies that are not a valid request.
#[tracing::instrument(name = "transform_drawing", skip_all)]
pub async fn transform_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProcessDrawingRequest>, JsonRejection>,
) -> Json<ProcessDrawingResponse> {
    let started = Instant::now();
    let response = match payload {
        Ok(Json(request)) => state.orchestrator.process_drawing(&request).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed transform request");
            ProcessDrawingResponse {
                error: Some(PipelineError::InvalidInput(rejection.body_text()).to_string()),
                ..ProcessDrawingResponse::default()
            }
        }
    };
    metrics::record_transform(response.is_success(), started.elapsed().as_secs_f64());
    Json(response)
}

/// Fetch a creation owned by the caller.
#[tracing::instrument(name = "get_creation", skip(state, query))]
pub async fn get_creation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ApiError> {
    let record = state.orchestrator.creation(&query.user_id, &id).await?;
    let mut document = record
        .to_document()
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;
    if let Value::Object(fields) = &mut document {
        fields.insert("id".to_string(), Value::String(record.id));
    }
    Ok(Json(document))
}

/// Upscale a creation (idempotent).
#[tracing::instrument(name = "upscale_creation", skip(state, body))]
pub async fn upscale_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpscaleBody>,
) -> Result<Json<UpscaleResponse>, ApiError> {
    let result = state.orchestrator.upscale(&body.user_id, &id).await;
    metrics::record_upscale(result.is_ok());
    Ok(Json(UpscaleResponse {
        upscaled_image_url: result?,
    }))
}

/// Publish or unpublish a creation.
#[tracing::instrument(name = "set_visibility", skip(state, body), fields(public = body.is_public))]
pub async fn visibility_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> Result<Json<VisibilityResponse>, ApiError> {
    let result = state
        .orchestrator
        .set_visibility(&body.user_id, &id, body.is_public)
        .await;
    metrics::record_visibility_change(body.is_public, result.is_ok());
    Ok(Json(VisibilityResponse { is_public: result? }))
}
