//! Test server lifecycle management
//!
//! Spawns the app on a random port, next to a fake provider token endpoint.
//! Each test gets its own isolated server and database.

use super::constants::*;
use super::fixtures::{token_endpoint_router, FakeCatalogApi};
use duet_server::config::OAuthSettings;
use duet_server::oauth::OAuthClient;
use duet_server::{make_app, RequestsLoggingLevel, ServerConfig, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A running test server instance
///
/// Automatically cleans up when dropped.
pub struct TestServer {
    /// Base URL for HTTP requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    /// Direct access to the store for assertions
    #[allow(dead_code)]
    pub store: Arc<SqliteStore>,

    /// The fake provider, for inspecting recorded calls
    #[allow(dead_code)]
    pub catalog_api: Arc<FakeCatalogApi>,

    _temp_db_dir: TempDir,
    _shutdown_txs: Vec<oneshot::Sender<()>>,
}

async fn serve_in_background(router: axum::Router) -> (u16, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
    });
    (port, shutdown_tx)
}

impl TestServer {
    /// Spawns a new test server with the default fake libraries.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_db_dir.path().join("experiment.db"))
                .expect("Failed to create store"),
        );
        let catalog_api = Arc::new(FakeCatalogApi::with_default_libraries());

        let (token_port, token_shutdown_tx) = serve_in_background(token_endpoint_router()).await;
        let oauth_client = OAuthClient::new(OAuthSettings {
            client_id: "duet-test".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1/v1/auth/callback".to_string(),
            authorize_url: "http://127.0.0.1/authorize".to_string(),
            token_url: format!("http://127.0.0.1:{}/token", token_port),
            scopes: vec!["streaming".to_string()],
            post_login_redirect: "/".to_string(),
        })
        .expect("Failed to create OAuth client");

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port: 0,
            frontend_dir_path: None,
        };
        let app = make_app(
            config,
            store.clone(),
            catalog_api.clone(),
            Some(oauth_client),
        )
        .expect("Failed to build app");
        let (port, app_shutdown_tx) = serve_in_background(app).await;

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            store,
            catalog_api,
            _temp_db_dir: temp_db_dir,
            _shutdown_txs: vec![app_shutdown_tx, token_shutdown_tx],
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for tx in self._shutdown_txs.drain(..) {
            let _ = tx.send(());
        }
    }
}
