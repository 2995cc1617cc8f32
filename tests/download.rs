//! Document downloader tests.
//!
//! Uses wiremock for the file endpoints and a temporary directory as the
//! download root.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use alasco::{
    flatten, AlascoClient, Config, DocumentDownloader, EntityType, JobStatus, Table, Tables,
    DOWNLOAD_WORKERS,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROPERTY: &str = "Tower A";

fn downloader(server: &MockServer, root: impl Into<PathBuf>) -> DocumentDownloader {
    let config = Config::new("test-token", "test-key").with_base_url(server.uri());
    DocumentDownloader::new(AlascoClient::new(&config).unwrap(), root)
        .with_date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap())
}

fn document(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "attributes": {"name": name},
        "links": {"download": format!("files/{id}")},
    })
}

fn tables(documents: &[Value]) -> Tables {
    [
        (EntityType::Contracts, Table::new()),
        (EntityType::Documents, flatten(documents)),
    ]
    .into_iter()
    .collect()
}

async fn mount_file(server: &MockServer, id: &str, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_writes_every_document() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    for id in ["doc-1", "doc-2", "doc-3"] {
        mount_file(&server, id, &format!("content of {id}"), 1).await;
    }

    let docs = [
        document("doc-1", "a.pdf"),
        document("doc-2", "b.pdf"),
        document("doc-3", "c.pdf"),
    ];
    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&docs), Some(PROPERTY))
        .await
        .unwrap();

    assert_eq!(report.output_dir, root.path().join("2024-05-17").join(PROPERTY));
    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 0);

    let content = std::fs::read_to_string(report.output_dir.join("b.pdf")).unwrap();
    assert_eq!(content, "content of doc-2");
    assert_eq!(
        report.outcome("doc-1").unwrap().status,
        JobStatus::Succeeded { bytes: 16 }
    );
}

#[tokio::test]
async fn test_rerun_skips_existing_files() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    // One request per file across both runs.
    mount_file(&server, "doc-1", "one", 1).await;
    mount_file(&server, "doc-2", "two", 1).await;

    let docs = [document("doc-1", "a.pdf"), document("doc-2", "b.pdf")];
    let downloader = downloader(&server, root.path());

    let first = downloader
        .batch_download_documents(&tables(&docs), Some(PROPERTY))
        .await
        .unwrap();
    assert_eq!(first.succeeded(), 2);

    let second = downloader
        .batch_download_documents(&tables(&docs), Some(PROPERTY))
        .await
        .unwrap();
    assert_eq!(second.skipped(), 2);
    assert_eq!(second.succeeded(), 0);
}

#[tokio::test]
async fn test_single_failure_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_file(&server, "doc-1", "one", 1).await;
    mount_file(&server, "doc-3", "three", 1).await;
    Mock::given(method("GET"))
        .and(path("/files/doc-2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let docs = [
        document("doc-1", "a.pdf"),
        document("doc-2", "b.pdf"),
        document("doc-3", "c.pdf"),
    ];
    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&docs), None)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "doc-2");
    assert!(failures[0].1.contains("404"));

    let dir = root.path().join("2024-05-17");
    assert!(dir.join("a.pdf").exists());
    assert!(dir.join("c.pdf").exists());
    assert!(!dir.join("b.pdf").exists());
    assert!(!dir.join("b.pdf.part").exists());
}

#[tokio::test]
async fn test_document_without_link_fails_alone() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_file(&server, "doc-1", "one", 1).await;

    let docs = [
        document("doc-1", "a.pdf"),
        json!({"id": "doc-2", "attributes": {"name": "b.pdf"}}),
    ];
    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&docs), None)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        report.outcome("doc-2").unwrap().status,
        JobStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn test_same_name_documents_get_distinct_files() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_file(&server, "doc-1", "one", 1).await;
    mount_file(&server, "doc-2", "two", 1).await;

    let docs = [document("doc-1", "scan.pdf"), document("doc-2", "scan.pdf")];
    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&docs), None)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    let dir = &report.output_dir;
    assert_eq!(std::fs::read_to_string(dir.join("scan.pdf")).unwrap(), "one");
    assert_eq!(
        std::fs::read_to_string(dir.join("scan_doc-2.pdf")).unwrap(),
        "two"
    );
}

#[tokio::test]
async fn test_no_documents_is_an_empty_report() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&[]), Some(PROPERTY))
        .await
        .unwrap();

    assert_eq!(report.total(), 0);
    assert!(report.output_dir.is_dir());
}

#[tokio::test]
async fn test_unwritable_output_root_is_an_error() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let file = root.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    let err = downloader(&server, &file)
        .batch_download_documents(&tables(&[document("doc-1", "a.pdf")]), None)
        .await
        .unwrap_err();

    assert!(matches!(err, alasco::AlascoError::OutputDir { .. }));
}

#[tokio::test]
async fn test_downloads_run_in_rounds_of_the_worker_limit() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let delay = Duration::from_millis(200);
    let count = DOWNLOAD_WORKERS * 2;

    let docs: Vec<Value> = (0..count)
        .map(|n| document(&format!("doc-{n}"), &format!("plan-{n}.pdf")))
        .collect();
    for n in 0..count {
        Mock::given(method("GET"))
            .and(path(format!("/files/doc-{n}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("plan")
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let started = Instant::now();
    let report = downloader(&server, root.path())
        .batch_download_documents(&tables(&docs), None)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.succeeded(), count);
    // Two full rounds at most DOWNLOAD_WORKERS wide, not all at once
    assert!(elapsed >= delay * 2, "finished in {elapsed:?}");
    // and not one after another
    assert!(elapsed < delay * count as u32, "finished in {elapsed:?}");
}
