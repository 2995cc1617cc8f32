//! Documents attached to contracts, invoices and change orders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::EntityType;
use crate::table::Table;

/// Column added to document rows: kind of the owning entity.
pub const PARENT_TYPE_COLUMN: &str = "parent_type";
/// Column added to document rows: id of the owning entity.
pub const PARENT_ID_COLUMN: &str = "parent_id";
/// Column added to document rows: id of the property the document belongs to.
pub const PROPERTY_ID_COLUMN: &str = "property_id";

const URL_COLUMNS: &[&str] = &[
    "links.download",
    "download_url",
    "links.download_url",
    "url",
];
const NAME_COLUMNS: &[&str] = &["file_name", "filename", "name", "title"];
const EXTENSION_COLUMNS: &[&str] = &["extension", "file_extension"];
const DEFAULT_EXTENSION: &str = "pdf";
const MAX_EXTENSION_LEN: usize = 5;

/// Entities that carry documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentParent {
    Contract,
    Invoice,
    ChangeOrder,
}

impl DocumentParent {
    pub const ALL: [DocumentParent; 3] = [
        DocumentParent::Contract,
        DocumentParent::Invoice,
        DocumentParent::ChangeOrder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Invoice => "invoice",
            Self::ChangeOrder => "change_order",
        }
    }

    /// The table holding the parent entities.
    pub fn entity_type(self) -> EntityType {
        match self {
            Self::Contract => EntityType::Contracts,
            Self::Invoice => EntityType::Invoices,
            Self::ChangeOrder => EntityType::ChangeOrders,
        }
    }

    /// Document listing endpoint for one parent.
    pub fn documents_endpoint(self, parent_id: &str) -> String {
        format!(
            "{}/{}/documents/",
            self.entity_type().name(),
            urlencoding::encode(parent_id)
        )
    }

    /// Document types the API accepts on upload for this parent.
    pub fn document_types(self) -> &'static [&'static str] {
        match self {
            Self::Contract => &["CONTRACT", "ATTACHMENT"],
            Self::Invoice => &[
                "ATTACHMENT",
                "AUDITED_INVOICE",
                "COVERSHEET_EXTERNAL",
                "EXTERNAL_CORRESPONDENCE",
                "INTERNAL_CORRESPONDENCE",
                "INVOICE",
                "OTHER",
                "PAYMENT_CERTIFICATE",
                "PLANS",
                "PROTOCOL",
                "REVISED_INVOICE",
                "VALUATIONS",
            ],
            Self::ChangeOrder => &[
                "ATTACHMENT",
                "AUDITED_CHANGE_ORDER",
                "CHANGE_ORDER",
                "CHANGE_ORDER_OFFER",
                "COVERSHEET_EXTERNAL",
                "EXTERNAL_CORRESPONDENCE",
                "INTERNAL_CORRESPONDENCE",
                "OTHER",
                "PLANS",
                "PROTOCOL",
                "VALUATIONS",
            ],
        }
    }

    /// Columns tried, in order, for a human readable parent label.
    pub fn label_columns(self) -> &'static [&'static str] {
        match self {
            Self::Contract => &["name", "contract_number", "number"],
            Self::Invoice => &["invoice_number", "number", "name"],
            Self::ChangeOrder => &["name", "number", "change_order_number"],
        }
    }
}

impl fmt::Display for DocumentParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DocumentParent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown document parent '{s}'"))
    }
}

/// The part of a documents row needed to download it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub download_url: Option<String>,
    pub property_id: Option<String>,
    pub parent: Option<(DocumentParent, String)>,
    /// File name without extension.
    pub stem: String,
    pub extension: String,
}

impl DocumentRef {
    /// Read the document at `row` of a documents table.
    ///
    /// Returns `None` when the row has no id.
    pub fn from_row(table: &Table, row: usize) -> Option<Self> {
        let id = table.first_value(row, &["id"])?;
        let download_url = table.first_value(row, URL_COLUMNS);
        let property_id = table.first_value(row, &[PROPERTY_ID_COLUMN]);
        let parent = table
            .first_value(row, &[PARENT_TYPE_COLUMN])
            .and_then(|kind| kind.parse::<DocumentParent>().ok())
            .zip(table.first_value(row, &[PARENT_ID_COLUMN]));

        let name = table
            .first_value(row, NAME_COLUMNS)
            .unwrap_or_else(|| id.clone());
        let (stem, name_extension) = split_name(&name);
        let extension = table
            .first_value(row, EXTENSION_COLUMNS)
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .map(|e| sanitize_file_name(&e))
            .or(name_extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Some(Self {
            id,
            download_url,
            property_id,
            parent,
            stem,
            extension,
        })
    }

    /// All documents of a table, skipping rows without an id.
    pub fn all(table: &Table) -> Vec<Self> {
        (0..table.len())
            .filter_map(|row| Self::from_row(table, row))
            .collect()
    }
}

/// Split `name.ext`; only a short alphanumeric suffix counts as an
/// extension, so "Rechnung Nr. 5" keeps its full name.
fn split_name(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.trim().is_empty()
                && (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (name.to_string(), None),
    }
}

/// Replace characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
