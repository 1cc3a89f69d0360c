//! Filesystem-backed object storage.
//!
//! Objects are written under a root directory and addressed publicly by
//! joining their path onto a base URL (typically a static file route of the
//! same server).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::capability::ObjectStorage;
use crate::error::StorageError;
use crate::upload::ProgressReporter;

/// Bytes written between progress reports.
const WRITE_CHUNK: usize = 64 * 1024;

/// A temporary file removed on drop unless it was kept.
///
/// Covers failed writes and attempts dropped mid-write by the uploader.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial object");
            }
        }
    }
}

/// Object storage writing files below a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base: Url,
}

impl LocalObjectStorage {
    /// Store objects under `root`, served publicly under `public_base`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPayload`] if `public_base` is not an
    /// absolute http(s) URL.
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Result<Self, StorageError> {
        let mut public_base = Url::parse(public_base)
            .map_err(|e| StorageError::InvalidPayload(format!("invalid public URL: {e}")))?;
        if !matches!(public_base.scheme(), "http" | "https") {
            return Err(StorageError::InvalidPayload(format!(
                "public URL must be http or https, got {}",
                public_base.scheme()
            )));
        }
        if !public_base.path().ends_with('/') {
            let path = format!("{}/", public_base.path());
            public_base.set_path(&path);
        }
        Ok(Self {
            root: root.into(),
            public_base,
        })
    }

    /// Root directory of stored objects.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path to a file below the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPayload(format!(
                "object path must be relative without '..': {path}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        progress: &ProgressReporter,
    ) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::InvalidPayload("empty payload".into()));
        }
        let target = self.resolve(path)?;
        let url = self
            .public_base
            .join(path)
            .map_err(|e| StorageError::InvalidPayload(format!("cannot address {path}: {e}")))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a temporary file and rename, so readers never see a partial object
        let partial = PartialFile::new(target.with_extension("partial"));
        let mut file = tokio::fs::File::create(&partial.path).await?;
        let total = bytes.len();
        let mut written = 0;
        for chunk in bytes.chunks(WRITE_CHUNK) {
            file.write_all(chunk).await?;
            written += chunk.len();
            #[allow(clippy::cast_precision_loss)]
            progress.report(written as f64 / total as f64);
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&partial.path, &target).await?;
        partial.keep();

        debug!(path, content_type, bytes = total, "Stored object");
        Ok(url.to_string())
    }
}
