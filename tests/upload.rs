//! Document upload tests.
//!
//! Uses wiremock to check the multipart request each upload sends and that
//! refused uploads never reach the API.

use alasco::{AlascoClient, AlascoError, Config, DocumentParent, DocumentUploader};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uploader(server: &MockServer) -> DocumentUploader {
    let config = Config::new("test-token", "test-key").with_base_url(server.uri());
    DocumentUploader::new(AlascoClient::new(&config).unwrap())
}

fn scan(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let file = dir.path().join(name);
    std::fs::write(&file, content).unwrap();
    file
}

#[tokio::test]
async fn test_contract_upload_posts_multipart_form() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = scan(&dir, "local-scan.pdf", "%PDF signed contract");

    Mock::given(method("POST"))
        .and(path("/contracts/c-1/documents/"))
        .and(header("X-API-KEY", "test-key"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"document_type\""))
        .and(body_string_contains("CONTRACT"))
        .and(body_string_contains("name=\"upload\"; filename=\"Vertrag.pdf\""))
        .and(body_string_contains("%PDF signed contract"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"data": {"id": "doc-9", "type": "DOCUMENT"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = uploader(&server)
        .upload_contract("c-1", "CONTRACT", &file, Some("Vertrag.pdf"))
        .await
        .unwrap();

    assert_eq!(created["data"]["id"], "doc-9");
}

#[tokio::test]
async fn test_file_name_defaults_to_the_local_name() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = scan(&dir, "RE-001.pdf", "invoice");

    Mock::given(method("POST"))
        .and(path("/invoices/inv-1/documents/"))
        .and(body_string_contains("filename=\"RE-001.pdf\""))
        .and(body_string_contains("REVISED_INVOICE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let created = uploader(&server)
        .upload_invoice("inv-1", "REVISED_INVOICE", &file, None)
        .await
        .unwrap();

    assert!(created.is_null());
}

#[tokio::test]
async fn test_rejected_document_type_sends_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = scan(&dir, "offer.pdf", "offer");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let uploader = uploader(&server);
    let err = uploader
        .upload_contract("c-1", "INVOICE", &file, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AlascoError::InvalidUpload(_)), "{err}");

    // Valid for change orders, not for invoices
    let err = uploader
        .upload(DocumentParent::Invoice, "inv-1", "CHANGE_ORDER_OFFER", &file, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AlascoError::InvalidUpload(_)), "{err}");

    let err = uploader
        .upload_change_order("", "CHANGE_ORDER_OFFER", &file, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AlascoError::InvalidUpload(_)), "{err}");
}

#[tokio::test]
async fn test_missing_file_is_a_read_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let err = uploader(&server)
        .upload_change_order("co-1", "PLANS", dir.path().join("absent.pdf"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AlascoError::ReadFile { .. }), "{err}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_rejection_is_an_api_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = scan(&dir, "plan.pdf", "plan");

    Mock::given(method("POST"))
        .and(path("/change_orders/co-1/documents/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"detail": "File type not supported"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = uploader(&server)
        .upload_change_order("co-1", "PLANS", &file, None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("File type not supported"));
}
