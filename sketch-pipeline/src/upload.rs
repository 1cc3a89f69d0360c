//! Resilient uploads with stall detection and exponential backoff.
//!
//! Each attempt races the storage write against a stall timer. When the
//! timer fires and the write has not reported any progress, the attempt is
//! cancelled by dropping its future and counted as a failure. Retryable
//! failures back off `base_delay * 2^(attempt - 1)` before the next attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capability::ObjectStorage;
use crate::error::{AttemptError, UploadError};

/// Callback receiving `(path, fraction)` progress updates.
pub type ProgressObserver = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Retry and stall policy for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// How long an attempt may run without reporting progress.
    pub stall_timeout: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            stall_timeout: Duration::from_secs(20),
        }
    }
}

impl UploadPolicy {
    /// Create a policy with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, stall_timeout: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            stall_timeout,
        }
    }

    /// Backoff after failed attempt number `attempt` (1-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Progress sink handed to [`ObjectStorage::put`].
pub struct ProgressReporter {
    path: String,
    tx: watch::Sender<f64>,
    observer: Option<ProgressObserver>,
}

impl ProgressReporter {
    fn new(path: &str, tx: watch::Sender<f64>, observer: Option<ProgressObserver>) -> Self {
        Self {
            path: path.to_string(),
            tx,
            observer,
        }
    }

    /// A reporter nobody listens to, for calling storage directly.
    #[must_use]
    pub fn detached(path: &str) -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self::new(path, tx, None)
    }

    /// Report the fraction of the payload written so far (clamped to 0..=1).
    pub fn report(&self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.tx.send_replace(fraction);
        if let Some(observer) = &self.observer {
            observer(&self.path, fraction);
        }
    }

    /// Last reported fraction.
    #[must_use]
    pub fn current(&self) -> f64 {
        *self.tx.borrow()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("path", &self.path)
            .field("fraction", &self.current())
            .finish_non_exhaustive()
    }
}

/// Uploads payloads to object storage under an [`UploadPolicy`].
#[derive(Clone)]
pub struct Uploader {
    storage: Arc<dyn ObjectStorage>,
    policy: UploadPolicy,
    observer: Option<ProgressObserver>,
}

impl Uploader {
    /// Create an uploader for `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>, policy: UploadPolicy) -> Self {
        Self {
            storage,
            policy,
            observer: None,
        }
    }

    /// Forward progress updates to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Upload `payload` to `path`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Rejected`] on the first non-retryable storage
    /// error and [`UploadError::Exhausted`] once every attempt has failed.
    pub async fn upload(
        &self,
        path: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<String, UploadError> {
        let max_attempts = self.policy.attempts();
        let mut last_error: Option<AttemptError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(path, payload, content_type).await {
                Ok(url) => {
                    info!(path, attempt, "Upload complete");
                    return Ok(url);
                }
                Err(AttemptError::Storage(source)) if !source.is_retryable() => {
                    warn!(path, attempt, error = %source, "Upload rejected");
                    return Err(UploadError::Rejected {
                        path: path.to_string(),
                        source,
                    });
                }
                Err(error) => {
                    if attempt < max_attempts {
                        let delay = self.policy.delay_for_attempt(attempt);
                        warn!(
                            "Upload of {} failed (attempt {}/{}), retrying in {:?}: {}",
                            path, attempt, max_attempts, delay, error
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            "Upload of {} failed (attempt {}/{}): {}",
                            path, attempt, max_attempts, error
                        );
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(UploadError::Exhausted {
            path: path.to_string(),
            attempts: max_attempts,
            last_error: last_error.map_or_else(String::new, |e| e.to_string()),
        })
    }

    async fn attempt(
        &self,
        path: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<String, AttemptError> {
        let (tx, rx) = watch::channel(0.0_f64);
        let reporter = ProgressReporter::new(path, tx, self.observer.clone());

        let put = self.storage.put(path, payload, content_type, &reporter);
        tokio::pin!(put);
        let stall = tokio::time::sleep(self.policy.stall_timeout);
        tokio::pin!(stall);

        let finished = tokio::select! {
            result = &mut put => Some(result),
            () = &mut stall => None,
        };
        if let Some(result) = finished {
            return result.map_err(AttemptError::from);
        }

        if *rx.borrow() <= 0.0 {
            debug!(path, "Cancelling stalled upload attempt");
            return Err(AttemptError::Stalled(self.policy.stall_timeout));
        }

        // Progress was observed, so the attempt is slow but alive
        put.await.map_err(AttemptError::from)
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
