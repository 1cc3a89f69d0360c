//! HTTP adapters for the AI service and asset reachability.
//!
//! The AI service exposes four JSON endpoints under a base URL:
//!
//! | Endpoint          | Request                         | Response                         |
//! |-------------------|---------------------------------|----------------------------------|
//! | `POST transform`  | [`TransformRequest`]            | [`TransformOutput`]              |
//! | `POST title`      | `{ "imageDataUri" }`            | `{ "title" }`                    |
//! | `POST moderate`   | `{ "imageUrl" }`                | [`ModerationVerdict`]            |
//! | `POST upscale`    | `{ "imageUrl" }`                | `{ "imageDataUri" }`             |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::capability::{
    AssetProbe, ContentModerator, ImageTransformer, ImageUpscaler, ModerationVerdict,
    TitleGenerator, TransformOutput, TransformRequest,
};
use crate::error::CapabilityError;

/// Default timeout for AI requests; image generation is slow.
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest error body kept in [`CapabilityError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageDataBody<'a> {
    image_data_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageUrlBody<'a> {
    image_url: &'a str,
}

#[derive(Deserialize)]
struct TitleResponse {
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpscaleResponse {
    image_data_uri: Option<String>,
}

/// JSON client for the AI service.
#[derive(Debug, Clone)]
pub struct HttpAiClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl HttpAiClient {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Unavailable`] if the URL is malformed and
    /// [`CapabilityError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, CapabilityError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| CapabilityError::Unavailable(format!("invalid AI service URL: {e}")))?;
        // Endpoints are joined relative to the base path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("sketch-studio/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base, token })
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, CapabilityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self
            .base
            .join(endpoint)
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        debug!(%url, "AI service request");

        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CapabilityError::UnexpectedResponse(e.to_string()))
    }
}

#[async_trait]
impl ImageTransformer for HttpAiClient {
    async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformOutput, CapabilityError> {
        self.post_json("transform", request).await
    }
}

#[async_trait]
impl TitleGenerator for HttpAiClient {
    async fn generate_title(&self, image_data_uri: &str) -> Result<String, CapabilityError> {
        let response: TitleResponse = self
            .post_json("title", &ImageDataBody { image_data_uri })
            .await?;
        response
            .title
            .ok_or_else(|| CapabilityError::UnexpectedResponse("missing title".into()))
    }
}

#[async_trait]
impl ContentModerator for HttpAiClient {
    async fn moderate(&self, image_url: &str) -> Result<ModerationVerdict, CapabilityError> {
        self.post_json("moderate", &ImageUrlBody { image_url }).await
    }
}

#[async_trait]
impl ImageUpscaler for HttpAiClient {
    async fn upscale(&self, image_url: &str) -> Result<String, CapabilityError> {
        let response: UpscaleResponse = self
            .post_json("upscale", &ImageUrlBody { image_url })
            .await?;
        response
            .image_data_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| CapabilityError::UnexpectedResponse("missing imageDataUri".into()))
    }
}

/// Reachability probe issuing HTTP `HEAD` requests.
#[derive(Debug, Clone)]
pub struct HttpAssetProbe {
    http: Client,
}

impl HttpAssetProbe {
    /// Create a probe with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Http`] if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, CapabilityError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetProbe for HttpAssetProbe {
    async fn is_reachable(&self, url: &Url) -> bool {
        match self.http.head(url.clone()).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(%url, status = %response.status(), "Asset probe returned non-success status");
                false
            }
            Err(e) => {
                warn!(%url, error = %e, "Asset probe failed");
                false
            }
        }
    }
}
