//! Server configuration from command-line arguments and environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sketch_pipeline::UploadPolicy;
use thiserror::Error;
use url::Url;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 9474;

/// Subdirectory of the data dir holding stored images.
pub const ASSETS_DIR: &str = "assets";

/// Subdirectory of the data dir holding creation documents.
pub const DOCUMENTS_DIR: &str = "documents";

/// Route prefix the assets directory is served under.
pub const ASSETS_ROUTE: &str = "/assets";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL argument did not parse.
    #[error("invalid {name} URL '{value}': {reason}")]
    InvalidUrl {
        /// Argument name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Command-line arguments for sketch-studio.
#[derive(Debug, Clone, Parser)]
#[command(name = "sketch-studio")]
#[command(about = "Sketch Studio drawing transformation server")]
#[command(version)]
pub struct ServerArgs {
    /// Port to listen on (localhost only)
    #[arg(long, env = "SKETCH_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory for stored images and creation records
    #[arg(long, env = "SKETCH_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Public base URL of stored images (default: http://127.0.0.1:<port>/assets/)
    #[arg(long, env = "SKETCH_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Base URL of the AI service
    #[arg(long, env = "SKETCH_AI_URL")]
    pub ai_url: String,

    /// Bearer token for the AI service
    #[arg(long, env = "SKETCH_AI_TOKEN", hide_env_values = true)]
    pub ai_token: Option<String>,

    /// AI request timeout in seconds
    #[arg(long, env = "SKETCH_AI_TIMEOUT_SECS", default_value = "120")]
    pub ai_timeout_secs: u64,

    /// Maximum upload attempts per image
    #[arg(long, env = "SKETCH_UPLOAD_ATTEMPTS", default_value = "3")]
    pub upload_attempts: u32,

    /// Backoff after the first failed upload, in milliseconds
    #[arg(long, env = "SKETCH_UPLOAD_BASE_DELAY_MS", default_value = "1000")]
    pub upload_base_delay_ms: u64,

    /// Seconds an upload may run without progress before it is cancelled
    #[arg(long, env = "SKETCH_UPLOAD_STALL_SECS", default_value = "20")]
    pub upload_stall_secs: u64,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Public base URL of stored images.
    pub public_url: Url,
    /// AI service base URL.
    pub ai_url: Url,
    /// AI service bearer token.
    pub ai_token: Option<String>,
    /// AI request timeout.
    pub ai_timeout: Duration,
    /// Upload retry policy.
    pub upload: UploadPolicy,
}

impl ServerConfig {
    /// Socket address to bind (localhost only).
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.port))
    }

    /// Directory stored images are written to.
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join(ASSETS_DIR)
    }

    /// Directory creation documents are written to.
    #[must_use]
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_DIR)
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<ServerArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        let public_url = match &args.public_url {
            Some(url) => parse_url("public", url)?,
            None => parse_url(
                "public",
                &format!("http://127.0.0.1:{}{ASSETS_ROUTE}/", args.port),
            )?,
        };
        let ai_url = parse_url("AI service", &args.ai_url)?;

        Ok(Self {
            port: args.port,
            data_dir: args.data_dir,
            public_url,
            ai_url,
            ai_token: args.ai_token.filter(|t| !t.is_empty()),
            ai_timeout: Duration::from_secs(args.ai_timeout_secs),
            upload: UploadPolicy::new(
                args.upload_attempts,
                Duration::from_millis(args.upload_base_delay_ms),
                Duration::from_secs(args.upload_stall_secs),
            ),
        })
    }
}
