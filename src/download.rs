//! Bulk download of documents to local storage.
//!
//! Files land in `<output_root>/<YYYY-MM-DD>/[<property_name>/]<name>.<ext>`.
//! A file that already exists is skipped without touching the network, so
//! re-running a batch only fetches what is still missing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use reqwest::Response;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::client::AlascoClient;
use crate::config::Config;
use crate::error::{AlascoError, Result};
use crate::models::{sanitize_file_name, DocumentRef, EntityType};
use crate::table::Tables;

/// Number of downloads in flight at once.
pub const DOWNLOAD_WORKERS: usize = 4;

const PARTIAL_SUFFIX: &str = "part";

/// Why a single document could not be downloaded.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The documents row has no download link.
    #[error("document has no download link")]
    MissingUrl,

    /// The API answered with an error, or the link could not be resolved.
    #[error("request failed: {0}")]
    Request(#[from] AlascoError),

    /// The connection broke while reading the body.
    #[error("reading response body failed: {0}")]
    Body(#[from] reqwest::Error),

    /// Writing the file failed.
    #[error("writing file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Final state of one download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The file was already on disk.
    Skipped,
    /// The file was written.
    Succeeded { bytes: u64 },
    /// The download or the write failed.
    Failed { error: String },
}

/// Outcome of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub document_id: String,
    pub path: PathBuf,
    pub status: JobStatus,
}

/// A document and where it should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub document: DocumentRef,
    pub destination: PathBuf,
}

/// Result of a batch: one outcome per submitted job, in completion order.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub output_dir: PathBuf,
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Skipped))
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed { .. }))
    }

    /// `(document id, error message)` for every failed job.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                JobStatus::Failed { error } => Some((o.document_id.as_str(), error.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Outcome for a document id.
    pub fn outcome(&self, document_id: &str) -> Option<&DownloadOutcome> {
        self.outcomes.iter().find(|o| o.document_id == document_id)
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Downloads documents listed in a documents table.
///
/// # Example
///
/// ```no_run
/// use alasco::{AlascoClient, Config, DataFetcher, DocumentDownloader};
///
/// # async fn example() -> alasco::Result<()> {
/// let config = Config::from_env()?;
/// let client = AlascoClient::new(&config)?;
/// let tables = DataFetcher::new(client.clone()).get_all_df(Some("Tower A")).await?;
///
/// let downloader = DocumentDownloader::from_config(client, &config);
/// let report = downloader.batch_download_documents(&tables, Some("Tower A")).await?;
/// println!("{} downloaded, {} failed", report.succeeded(), report.failed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentDownloader {
    client: AlascoClient,
    output_root: PathBuf,
    date: NaiveDate,
}

impl DocumentDownloader {
    /// Downloader writing below `output_root`, dated today.
    pub fn new(client: AlascoClient, output_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_root: output_root.into(),
            date: Local::now().date_naive(),
        }
    }

    pub fn from_config(client: AlascoClient, config: &Config) -> Self {
        Self::new(client, config.download_root.clone())
    }

    /// Use a fixed date for the output directory.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// `<output_root>/<YYYY-MM-DD>/[<property_name>/]`
    pub fn output_dir(&self, property_name: Option<&str>) -> PathBuf {
        let mut dir = self
            .output_root
            .join(self.date.format("%Y-%m-%d").to_string());
        if let Some(name) = property_name {
            dir.push(sanitize_file_name(name));
        }
        dir
    }

    /// Download every document of the documents table.
    ///
    /// Individual failures are recorded in the report and never abort the
    /// batch.
    ///
    /// # Errors
    ///
    /// Fails only when the output directory cannot be created.
    #[tracing::instrument(skip(self, tables))]
    pub async fn batch_download_documents(
        &self,
        tables: &Tables,
        property_name: Option<&str>,
    ) -> Result<DownloadReport> {
        let output_dir = self.output_dir(property_name);
        if !tokio::fs::try_exists(&output_dir).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&output_dir)
                .await
                .map_err(|source| AlascoError::OutputDir {
                    path: output_dir.clone(),
                    source,
                })?;
            tracing::info!("{} was created", output_dir.display());
        }

        let jobs = plan_jobs(tables, &output_dir);
        tracing::info!(
            "Downloading {} documents to {}",
            jobs.len(),
            output_dir.display()
        );

        let outcomes = self.download(jobs).await;
        let report = DownloadReport {
            output_dir,
            outcomes,
        };
        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "download batch finished"
        );
        Ok(report)
    }

    /// Run jobs on the bounded worker pool and collect one outcome each.
    pub async fn download(&self, jobs: Vec<DownloadJob>) -> Vec<DownloadOutcome> {
        stream::iter(jobs)
            .map(|job| run_job(&self.client, job))
            .buffer_unordered(DOWNLOAD_WORKERS)
            .collect()
            .await
    }
}

/// Build one job per document row.
///
/// The file name is `<parent label>_<document name>.<ext>`. When two
/// documents of the batch end up with the same name, the later ones get
/// their document id appended.
pub fn plan_jobs(tables: &Tables, output_dir: &Path) -> Vec<DownloadJob> {
    let Some(documents) = tables.get(EntityType::Documents) else {
        return Vec::new();
    };

    let mut taken = HashSet::new();
    DocumentRef::all(documents)
        .into_iter()
        .map(|document| {
            let base = match parent_label(tables, &document) {
                Some(label) => format!("{label}_{}", document.stem),
                None => document.stem.clone(),
            };
            let base = sanitize_file_name(&base);
            let file_name = free_file_name(&mut taken, &base, &document);
            DownloadJob {
                destination: output_dir.join(file_name),
                document,
            }
        })
        .collect()
}

/// First of `<base>.<ext>`, `<base>_<id>.<ext>`, `<base>_<id>_2.<ext>`, ...
/// not yet taken in this batch. Case-insensitive, so the names stay
/// distinct on case-folding filesystems.
fn free_file_name(taken: &mut HashSet<String>, base: &str, document: &DocumentRef) -> String {
    let extension = &document.extension;
    let mut file_name = format!("{base}.{extension}");
    if taken.contains(&file_name.to_lowercase()) {
        let id = sanitize_file_name(&document.id);
        file_name = format!("{base}_{id}.{extension}");
        let mut n = 2;
        while taken.contains(&file_name.to_lowercase()) {
            file_name = format!("{base}_{id}_{n}.{extension}");
            n += 1;
        }
    }
    taken.insert(file_name.to_lowercase());
    file_name
}

fn parent_label(tables: &Tables, document: &DocumentRef) -> Option<String> {
    let (parent, parent_id) = document.parent.as_ref()?;
    let label = tables
        .get(parent.entity_type())
        .and_then(|table| {
            let row = table.find_by_id(parent_id)?;
            table.first_value(row, parent.label_columns())
        })
        .unwrap_or_else(|| parent_id.clone());
    Some(label)
}

async fn run_job(client: &AlascoClient, job: DownloadJob) -> DownloadOutcome {
    let DownloadJob {
        document,
        destination,
    } = job;

    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        tracing::debug!("{} already exists, skipping", destination.display());
        return DownloadOutcome {
            document_id: document.id,
            path: destination,
            status: JobStatus::Skipped,
        };
    }

    let status = match fetch_to_file(client, &document, &destination).await {
        Ok(bytes) => {
            tracing::debug!("Document saved to {}", destination.display());
            JobStatus::Succeeded { bytes }
        }
        Err(e) => {
            tracing::warn!(document = %document.id, "download failed: {e}");
            JobStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    DownloadOutcome {
        document_id: document.id,
        path: destination,
        status,
    }
}

async fn fetch_to_file(
    client: &AlascoClient,
    document: &DocumentRef,
    destination: &Path,
) -> core::result::Result<u64, DownloadError> {
    let link = document
        .download_url
        .as_deref()
        .ok_or(DownloadError::MissingUrl)?;
    let url = client.resolve(link)?;
    let response = client.get_url(url).await?;

    // Bytes go to a sibling file first; only a complete body is renamed
    // into place.
    let partial = destination.with_extension(match destination.extension() {
        Some(ext) => format!("{}.{PARTIAL_SUFFIX}", ext.to_string_lossy()),
        None => PARTIAL_SUFFIX.to_string(),
    });

    let written = match write_body(response, &partial).await {
        Ok(written) => tokio::fs::rename(&partial, destination)
            .await
            .map(|()| written)
            .map_err(DownloadError::from),
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}

async fn write_body(mut response: Response, path: &Path) -> core::result::Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
