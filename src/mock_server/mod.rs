//! Mock Alasco API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the Alasco
//! API for integration and end-to-end testing. Unlike wiremock which mocks at
//! the HTTP level per-test, this server holds a whole property hierarchy and
//! answers filtered, paginated queries against it, enabling realistic
//! workflow testing.
//!
//! # Example
//!
//! ```ignore
//! use alasco::mock_server::MockServer;
//! use alasco::{AlascoClient, Config, DataFetcher};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let config = Config::new("token", "key").with_base_url(server.url());
//!     let fetcher = DataFetcher::new(AlascoClient::new(&config).unwrap());
//!
//!     // Server comes with default fixtures
//!     let tables = fetcher.get_all_df(Some("Tower A")).await.unwrap();
//!     assert_eq!(tables.len(), 8);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::Fixtures;
pub use server::MockServer;
pub use state::{MockState, QueryFilter, DEFAULT_PAGE_SIZE};
