//! Alasco API client library.
//!
//! A Rust library for pulling construction finance data out of the Alasco
//! REST API. Every entity collection is fetched page by page, flattened
//! into a [`Table`] with dotted column names, and the documents attached to
//! contracts, invoices and change orders can be downloaded in one batch
//! or uploaded one file at a time.
//!
//! # Quick Start
//!
//! ```no_run
//! use alasco::{AlascoClient, Config, DataFetcher, DocumentDownloader, EntityType};
//!
//! #[tokio::main]
//! async fn main() -> alasco::Result<()> {
//!     // Create client from environment variables
//!     let config = Config::from_env()?;
//!     let client = AlascoClient::new(&config)?;
//!
//!     // Fetch every table below one property
//!     let tables = DataFetcher::new(client.clone())
//!         .get_all_df(Some("Tower A"))
//!         .await?;
//!     if let Some(contracts) = tables.get(EntityType::Contracts) {
//!         println!("Found {} contracts", contracts.len());
//!     }
//!
//!     // Download the documents of that property
//!     let report = DocumentDownloader::from_config(client, &config)
//!         .batch_download_documents(&tables, Some("Tower A"))
//!         .await?;
//!     println!("{} downloaded, {} failed", report.succeeded(), report.failed());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`AlascoClient`] - authenticated HTTP session
//! - [`fetch_all`] - follows `links.next` until the collection is exhausted
//! - [`flatten`] - turns JSON:API records into a [`Table`]
//! - [`DataFetcher`] - fetches every [`EntityType`] into [`Tables`]
//! - [`DocumentDownloader`] - bounded concurrent document downloads
//! - [`DocumentUploader`] - multipart document uploads with type checks
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `ALASCO_API_TOKEN` (required) - API token
//! - `ALASCO_API_KEY` (required) - API key
//! - `ALASCO_API_URL` (optional) - Base URL (defaults to `https://api.alasco.de/v1/`)
//! - `ALASCO_DOWNLOAD_PATH` (optional) - Download root (defaults to `outputs`)

mod client;
mod config;
mod download;
mod error;
mod fetcher;
mod models;
mod output;
mod pagination;
mod table;
mod upload;

pub mod cli;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{AlascoClient, KEY_HEADER, TOKEN_HEADER};
pub use config::{Config, Credential, DEFAULT_API_URL, DEFAULT_DOWNLOAD_PATH};
pub use error::{AlascoError, Result};
pub use pagination::{
    fetch_all, fetch_all_chunked, Filter, FilterOp, Page, PageLinks, DEFAULT_CHUNK_SIZE,
};
pub use table::{flatten, flatten_record, Cell, Table, Tables};

// Re-export models
pub use models::{
    sanitize_file_name, DocumentParent, DocumentRef, EntityType, PARENT_ID_COLUMN,
    PARENT_TYPE_COLUMN, PROPERTY_ID_COLUMN,
};

// Re-export operations
pub use download::{
    plan_jobs, DocumentDownloader, DownloadError, DownloadJob, DownloadOutcome, DownloadReport,
    JobStatus, DOWNLOAD_WORKERS,
};
pub use fetcher::DataFetcher;
pub use upload::{DocumentUploader, DOCUMENT_TYPE_FIELD, UPLOAD_PART};

// Re-export output formatting
pub use output::PrettyPrint;
