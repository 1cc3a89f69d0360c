//! Test server harness for integration tests.
//!
//! Spins up the real router on a random port with on-disk storage in a
//! temporary directory, talking to an AI service URL supplied by the test
//! (usually a `wiremock` server).

use std::net::SocketAddr;
use std::time::Duration;

use sketch_pipeline::UploadPolicy;
use sketch_server::{build_router, AppState, ServerConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    data_dir: TempDir,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server on a random available port using `ai_url` as the AI service.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or the server fails to bind.
    pub async fn start(ai_url: &str) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let data_dir = tempfile::tempdir().expect("tempdir");

        let config = ServerConfig {
            port,
            data_dir: data_dir.path().to_path_buf(),
            public_url: Url::parse(&format!("http://127.0.0.1:{port}/assets/")).expect("url"),
            ai_url: Url::parse(ai_url).expect("ai url"),
            ai_token: Some("test-token".into()),
            ai_timeout: Duration::from_secs(10),
            upload: UploadPolicy::new(2, Duration::from_millis(10), Duration::from_secs(5)),
        };
        let state = AppState::from_config(&config).expect("app state");
        let app = build_router(state);

        let listener = TcpListener::bind(config.bind_addr())
            .await
            .expect("failed to bind");
        let addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr,
            data_dir,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Root of the server's data directory.
    pub fn data_dir(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}
