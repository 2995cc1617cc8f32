//! Mock Alasco API server.
//!
//! Provides an axum-based HTTP server that simulates the Alasco API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, Uri},
    routing::{get, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers::{self, SharedState};
use super::state::MockState;
use crate::models::{DocumentParent, EntityType};

type QueryMap = Query<HashMap<String, String>>;

/// A mock Alasco API server for testing.
///
/// The server runs in the background and serves JSON:API pages with
/// absolute `links.next` URLs pointing back at itself.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_scenario()).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");
        let url = format!("http://{addr}");
        shared_state.write().await.base_url = url.clone();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url,
            handle,
            state: shared_state,
        }
    }

    /// Get the base URL of the mock server.
    ///
    /// Use this URL as the API URL of a `Config`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Number of file downloads served so far.
    pub async fn file_requests(&self) -> usize {
        self.state.read().await.file_requests
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the axum router with all routes.
    fn create_router(state: SharedState) -> Router {
        let mut router = Router::new();

        for entity in EntityType::all() {
            if entity.endpoint().is_none() {
                continue;
            }
            let path = format!("/{}/", entity.name());
            router = router
                .route(&path, collection_route(entity))
                .route(path.trim_end_matches('/'), collection_route(entity));
        }

        for parent in DocumentParent::ALL {
            let path = format!("/{}/:id/documents/", parent.entity_type().name());
            router = router
                .route(&path, documents_route(parent))
                .route(path.trim_end_matches('/'), documents_route(parent));
        }

        router
            .route("/files/:id", get(handlers::download_file))
            .route("/health", get(health_check))
            .with_state(state)
    }
}

fn collection_route(entity: EntityType) -> MethodRouter<SharedState> {
    get(
        move |state: State<SharedState>, headers: HeaderMap, uri: Uri, query: QueryMap| {
            handlers::list_collection(state, headers, uri, query, entity)
        },
    )
}

fn documents_route(parent: DocumentParent) -> MethodRouter<SharedState> {
    get(
        move |state: State<SharedState>,
              headers: HeaderMap,
              uri: Uri,
              id: Path<String>,
              query: QueryMap| {
            handlers::list_documents(state, headers, uri, id, query, parent)
        },
    )
    .post(
        move |state: State<SharedState>,
              headers: HeaderMap,
              id: Path<String>,
              multipart: Multipart| {
            handlers::upload_document(state, headers, id, parent, multipart)
        },
    )
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
