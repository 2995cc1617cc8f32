//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Alasco API server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::{DocumentParent, EntityType};

/// Default number of records per page; small so tests cross page boundaries.
pub const DEFAULT_PAGE_SIZE: usize = 2;

/// Shared state for the mock server.
///
/// Records are raw JSON:API resources, served in insertion order.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Records per entity type.
    pub records: HashMap<EntityType, Vec<Value>>,

    /// Documents per parent entity.
    pub documents: HashMap<(DocumentParent, String), Vec<Value>>,

    /// File contents by document id.
    pub files: HashMap<String, Vec<u8>>,

    /// Records per page when the request does not ask for a size.
    pub page_size: usize,

    /// If set, requests must carry this `(token, key)` pair.
    pub required_credential: Option<(String, String)>,

    /// Public URL of the running server, used for `links.next`.
    pub base_url: String,

    /// Number of file download requests served.
    pub file_requests: usize,

    /// File downloads currently being answered.
    pub files_in_flight: usize,

    /// Highest `files_in_flight` seen.
    pub max_files_in_flight: usize,

    /// Time each file download is held open before answering.
    pub file_delay: Option<Duration>,

    /// Number of documents created through uploads.
    pub uploads: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            documents: HashMap::new(),
            files: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            required_credential: None,
            base_url: String::new(),
            file_requests: 0,
            files_in_flight: 0,
            max_files_in_flight: 0,
            file_delay: None,
            uploads: 0,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a record to an entity collection.
    pub fn with_record(mut self, entity: EntityType, record: Value) -> Self {
        self.records.entry(entity).or_default().push(record);
        self
    }

    /// Attach a document to a parent. `content` of `None` makes the file
    /// download answer 404.
    pub fn with_document(
        mut self,
        parent: DocumentParent,
        parent_id: &str,
        document: Value,
        content: Option<Vec<u8>>,
    ) -> Self {
        if let (Some(id), Some(bytes)) = (document.get("id").and_then(Value::as_str), content) {
            self.files.insert(id.to_string(), bytes);
        }
        self.documents
            .entry((parent, parent_id.to_string()))
            .or_default()
            .push(document);
        self
    }

    /// Set the default page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Hold every file download open for `delay`.
    pub fn with_file_delay(mut self, delay: Duration) -> Self {
        self.file_delay = Some(delay);
        self
    }

    /// Set the required authentication headers.
    pub fn with_required_credential(mut self, token: &str, key: &str) -> Self {
        self.required_credential = Some((token.to_string(), key.to_string()));
        self
    }

    /// Check request headers against the required credential.
    pub fn is_authorized(&self, token: Option<&str>, key: Option<&str>) -> bool {
        match &self.required_credential {
            None => true,
            Some((t, k)) => token == Some(t.as_str()) && key == Some(k.as_str()),
        }
    }

    /// Records of an entity type matching every filter.
    pub fn list(&self, entity: EntityType, filters: &[QueryFilter]) -> Vec<&Value> {
        self.records
            .get(&entity)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filters.iter().all(|f| f.matches(r)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Documents of one parent.
    pub fn documents_of(&self, parent: DocumentParent, parent_id: &str) -> Vec<&Value> {
        self.documents
            .get(&(parent, parent_id.to_string()))
            .map(|docs| docs.iter().collect())
            .unwrap_or_default()
    }

    /// Store an uploaded file as a new document of `parent_id` and return
    /// the created record.
    pub fn add_upload(
        &mut self,
        parent: DocumentParent,
        parent_id: &str,
        document_type: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Value {
        self.uploads += 1;
        let id = format!("upload-{}", self.uploads);
        let document = serde_json::json!({
            "id": id,
            "type": "DOCUMENT",
            "attributes": {"name": file_name, "document_type": document_type},
            "links": {"download": format!("files/{id}")},
        });
        self.files.insert(id, content);
        self.documents
            .entry((parent, parent_id.to_string()))
            .or_default()
            .push(document.clone());
        document
    }

    /// File content by document id.
    pub fn file(&self, id: &str) -> Option<&Vec<u8>> {
        self.files.get(id)
    }
}

/// A parsed `filter[<attribute>.<operation>]=<value>` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub attribute: String,
    pub operation: String,
    pub value: String,
}

impl QueryFilter {
    /// Parse a query pair; `None` if the key is not a filter.
    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let inner = key.strip_prefix("filter[")?.strip_suffix(']')?;
        let (attribute, operation) = inner.rsplit_once('.')?;
        Some(Self {
            attribute: attribute.to_string(),
            operation: operation.to_string(),
            value: value.to_string(),
        })
    }

    /// Whether a record passes this filter. Unknown operations match nothing.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(field) = field_value(record, &self.attribute) else {
            return false;
        };
        match self.operation.as_str() {
            "in" => self.value.split(',').any(|v| v == field),
            "exact" => self.value == field,
            "contains" => field.to_lowercase().contains(&self.value.to_lowercase()),
            _ => false,
        }
    }
}

/// Look up `attribute` as the id, an attribute, or a relationship id.
fn field_value(record: &Value, attribute: &str) -> Option<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };

    if attribute == "id" {
        return record.get("id").and_then(scalar);
    }
    record
        .pointer(&format!("/attributes/{attribute}"))
        .and_then(scalar)
        .or_else(|| {
            record
                .pointer(&format!("/relationships/{attribute}/data/id"))
                .and_then(scalar)
        })
}
