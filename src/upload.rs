//! Document upload to contracts, invoices and change orders.
//!
//! Each upload is one multipart POST to `<parent>/<id>/documents/` with a
//! `document_type` field and the file in the `upload` part. The document
//! type is checked against the parent's allow-list before anything is read
//! or sent.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::client::AlascoClient;
use crate::error::{AlascoError, Result};
use crate::models::DocumentParent;

/// Multipart field carrying the document type.
pub const DOCUMENT_TYPE_FIELD: &str = "document_type";
/// Multipart part carrying the file.
pub const UPLOAD_PART: &str = "upload";

/// Uploads files as documents of contracts, invoices and change orders.
///
/// # Example
///
/// ```no_run
/// use alasco::{AlascoClient, DocumentUploader};
///
/// # async fn example() -> alasco::Result<()> {
/// let uploader = DocumentUploader::new(AlascoClient::from_env()?);
/// let created = uploader
///     .upload_invoice("inv-1", "INVOICE", "scans/RE-001.pdf", None)
///     .await?;
/// println!("{created}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentUploader {
    client: AlascoClient,
}

impl DocumentUploader {
    pub fn new(client: AlascoClient) -> Self {
        Self { client }
    }

    /// Upload `file_path` as a document of `parent_id`.
    ///
    /// `file_name` is the name the API stores; it defaults to the last
    /// component of `file_path`. Returns the response body, or `null` when
    /// the API answers without one.
    ///
    /// # Errors
    ///
    /// `InvalidUpload` when `document_type` is not accepted for `parent` or
    /// an id or name is empty; `ReadFile` when the file cannot be read; the
    /// usual request errors otherwise.
    #[tracing::instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub async fn upload(
        &self,
        parent: DocumentParent,
        parent_id: &str,
        document_type: &str,
        file_path: impl AsRef<Path>,
        file_name: Option<&str>,
    ) -> Result<Value> {
        let file_path = file_path.as_ref();
        validate_document_type(parent, document_type)?;
        if parent_id.trim().is_empty() {
            return Err(AlascoError::InvalidUpload(format!(
                "{parent} id must not be empty"
            )));
        }
        let file_name = match file_name {
            Some(name) => name.to_string(),
            None => file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        if file_name.trim().is_empty() {
            return Err(AlascoError::InvalidUpload(format!(
                "no file name for {}",
                file_path.display()
            )));
        }

        let content = tokio::fs::read(file_path)
            .await
            .map_err(|source| AlascoError::ReadFile {
                path: file_path.to_path_buf(),
                source,
            })?;
        tracing::debug!(bytes = content.len(), %file_name, "uploading {parent} document");

        let form = Form::new()
            .text(DOCUMENT_TYPE_FIELD, document_type.to_string())
            .part(UPLOAD_PART, Part::bytes(content).file_name(file_name));
        let response = self
            .client
            .post_multipart(&parent.documents_endpoint(parent_id), form)
            .await?;

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Upload a `CONTRACT` or `ATTACHMENT` to a contract.
    pub async fn upload_contract(
        &self,
        contract_id: &str,
        document_type: &str,
        file_path: impl AsRef<Path>,
        file_name: Option<&str>,
    ) -> Result<Value> {
        self.upload(DocumentParent::Contract, contract_id, document_type, file_path, file_name)
            .await
    }

    pub async fn upload_invoice(
        &self,
        invoice_id: &str,
        document_type: &str,
        file_path: impl AsRef<Path>,
        file_name: Option<&str>,
    ) -> Result<Value> {
        self.upload(DocumentParent::Invoice, invoice_id, document_type, file_path, file_name)
            .await
    }

    pub async fn upload_change_order(
        &self,
        change_order_id: &str,
        document_type: &str,
        file_path: impl AsRef<Path>,
        file_name: Option<&str>,
    ) -> Result<Value> {
        self.upload(
            DocumentParent::ChangeOrder,
            change_order_id,
            document_type,
            file_path,
            file_name,
        )
        .await
    }
}

fn validate_document_type(parent: DocumentParent, document_type: &str) -> Result<()> {
    let allowed = parent.document_types();
    if allowed.contains(&document_type) {
        Ok(())
    } else {
        Err(AlascoError::InvalidUpload(format!(
            "document type '{document_type}' is not accepted for a {parent}; expected one of {}",
            allowed.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_accepts_only_two_types() {
        assert!(validate_document_type(DocumentParent::Contract, "CONTRACT").is_ok());
        assert!(validate_document_type(DocumentParent::Contract, "ATTACHMENT").is_ok());

        let err = validate_document_type(DocumentParent::Contract, "INVOICE").unwrap_err();
        assert!(matches!(err, AlascoError::InvalidUpload(_)));
        assert!(err.to_string().contains("CONTRACT, ATTACHMENT"), "{err}");
    }

    #[test]
    fn test_document_types_are_case_sensitive() {
        assert!(validate_document_type(DocumentParent::Invoice, "invoice").is_err());
        assert!(validate_document_type(DocumentParent::Invoice, "INVOICE").is_ok());
    }
}
