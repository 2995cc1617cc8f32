//! Error types for Alasco API operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::EntityType;

/// Errors that can occur during Alasco API operations.
#[derive(Debug, Error)]
pub enum AlascoError {
    /// Configuration is missing or incomplete.
    #[error("Alasco configuration required: {0}")]
    ConfigMissing(String),

    /// The API rejected the credentials (HTTP 401/403).
    #[error("Alasco authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// API request returned a non-success status.
    #[error("Alasco API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// A lookup by name matched zero or several entities.
    #[error("{entity_type} '{name}' not found ({matches} matches, expected exactly 1)")]
    NotFound {
        entity_type: &'static str,
        name: String,
        matches: usize,
    },

    /// A filter could not be built.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Fetching one entity type failed.
    #[error("Failed to fetch {entity}: {source}")]
    Fetch {
        entity: EntityType,
        #[source]
        source: Box<AlascoError>,
    },

    /// An upload was refused before sending (unknown document type, empty id
    /// or file name).
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// A file to upload could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The download output directory could not be created.
    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AlascoError {
    /// Attach the entity type being fetched to this error.
    pub fn for_entity(self, entity: EntityType) -> Self {
        match self {
            already @ Self::Fetch { .. } => already,
            other => Self::Fetch {
                entity,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping entity context.
    pub fn root(&self) -> &AlascoError {
        match self {
            Self::Fetch { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for rejected credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self.root(), Self::Auth { .. })
    }

    /// True for network failures and non-success HTTP statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Self::Api { .. } | Self::HttpError(_))
    }

    /// True for an ambiguous or absent name lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for Alasco operations.
pub type Result<T> = core::result::Result<T, AlascoError>;
