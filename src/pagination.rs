//! Pagination utilities for Alasco API responses.
//!
//! List endpoints answer with JSON:API documents: a `data` array of records
//! and a `links.next` URL that points at the following page, absent or null
//! on the last one.

use std::fmt;

use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::AlascoClient;
use crate::error::{AlascoError, Result};

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 1000;

/// Default number of values per `in` filter request.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// One page of a JSON:API list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// The records on this page.
    pub data: Vec<Value>,
    /// Pagination links.
    #[serde(default)]
    pub links: PageLinks,
}

/// The `links` member of a list response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    /// URL of the next page, absolute or relative to the base URL.
    #[serde(default)]
    pub next: Option<String>,
}

impl Page {
    /// Decode a page from a successful response.
    pub async fn from_response(response: Response) -> Result<Self> {
        let body = response.bytes().await.map_err(AlascoError::HttpError)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// The next page link, if there is one worth following.
    pub fn next_link(&self) -> Option<&str> {
        if self.data.is_empty() {
            return None;
        }
        self.links.next.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// Returns true if this page has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of records on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Filter operations understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    In,
    Exact,
    Contains,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Exact => "exact",
            Self::Contains => "contains",
        })
    }
}

/// A single `filter[<attribute>.<operation>]=<values>` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub attribute: String,
    pub operation: FilterOp,
    pub values: Vec<String>,
}

impl Filter {
    /// `attribute` is one of `values`.
    pub fn is_in<I, S>(attribute: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute: attribute.to_string(),
            operation: FilterOp::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `attribute` equals `value`.
    pub fn exact(attribute: &str, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.to_string(),
            operation: FilterOp::Exact,
            values: vec![value.into()],
        }
    }

    /// `attribute` contains `value`.
    pub fn contains(attribute: &str, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.to_string(),
            operation: FilterOp::Contains,
            values: vec![value.into()],
        }
    }

    /// Query parameter name, e.g. `filter[property.in]`.
    pub fn key(&self) -> String {
        format!("filter[{}.{}]", self.attribute, self.operation)
    }

    /// Query parameter value; list values are comma separated.
    pub fn value(&self) -> String {
        self.values.join(",")
    }

    /// Split an `in` filter into filters of at most `chunk_size` values.
    ///
    /// Other operations are returned unchanged.
    pub fn chunks(&self, chunk_size: usize) -> Result<Vec<Filter>> {
        if chunk_size == 0 {
            return Err(AlascoError::InvalidFilter(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if self.operation != FilterOp::In || self.values.len() <= chunk_size {
            return Ok(vec![self.clone()]);
        }
        Ok(self
            .values
            .chunks(chunk_size)
            .map(|chunk| Filter {
                attribute: self.attribute.clone(),
                operation: self.operation,
                values: chunk.to_vec(),
            })
            .collect())
    }
}

/// Fetch every record of a list endpoint, following `links.next`.
///
/// Records are returned in pagination order. The first failing page aborts
/// the whole fetch.
#[tracing::instrument(skip(client, filter), fields(filter = ?filter.map(Filter::key)))]
pub async fn fetch_all(
    client: &AlascoClient,
    endpoint: &str,
    filter: Option<&Filter>,
) -> Result<Vec<Value>> {
    let response = match filter {
        Some(f) => client.get_with_query(endpoint, &[(f.key(), f.value())]).await?,
        None => client.get(endpoint).await?,
    };
    let mut page = Page::from_response(response).await?;
    let mut pages = 1;
    let mut records = Vec::new();

    loop {
        tracing::debug!(page = pages, records = page.len(), "fetched page");
        let next = page.next_link().map(str::to_owned);
        records.append(&mut page.data);

        let Some(next) = next else {
            break;
        };

        // Safety limit to prevent infinite loops
        if pages >= MAX_PAGES {
            tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
            break;
        }

        let url = client.resolve(&next)?;
        page = Page::from_response(client.get_url(url).await?).await?;
        pages += 1;
    }

    Ok(records)
}

/// Like [`fetch_all`], but splits a long `in` filter into several requests.
///
/// Long value lists make for URLs the API refuses, so the values are sent
/// `chunk_size` at a time and the results concatenated in chunk order.
pub async fn fetch_all_chunked(
    client: &AlascoClient,
    endpoint: &str,
    filter: &Filter,
    chunk_size: usize,
) -> Result<Vec<Value>> {
    let chunks = filter.chunks(chunk_size)?;
    let total = chunks.len();
    let mut records = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        if total > 1 {
            tracing::debug!("API call {} of {} to {}", index + 1, total, endpoint);
        }
        records.extend(fetch_all(client, endpoint, Some(chunk)).await?);
    }

    Ok(records)
}
