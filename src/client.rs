//! Alasco API client.
//!
//! Low-level HTTP client that handles authentication and raw requests.
//! Pagination, table building and downloads are layered on top of it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use url::Url;

use crate::config::{Config, Credential};
use crate::error::{AlascoError, Result};

const USER_AGENT: &str = concat!("alasco-rs/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "X-API-TOKEN";
/// Header carrying the signing key.
pub const KEY_HEADER: &str = "X-API-KEY";

/// Low-level Alasco API client.
///
/// Every request carries the bearer token plus the `X-API-TOKEN` and
/// `X-API-KEY` headers.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use alasco::{AlascoClient, Config};
///
/// # fn example() -> alasco::Result<()> {
/// // Create from environment variables
/// let client = AlascoClient::from_env()?;
///
/// // Or configure manually
/// let client = AlascoClient::new(&Config::new("your-token", "your-key"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AlascoClient {
    http: Client,
    base_url: Arc<Url>,
    credential: Arc<Credential>,
}

impl std::fmt::Debug for AlascoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlascoClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AlascoClient {
    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `ALASCO_API_TOKEN` or `ALASCO_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env()?)
    }

    /// Create a new client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        // Ensure base URL ends with / so relative joins keep the version prefix
        let base_url_str = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(AlascoError::HttpError)?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            credential: Arc::new(config.credential.clone()),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path or an absolute URL against the base URL.
    pub fn resolve(&self, path_or_url: &str) -> Result<Url> {
        Ok(self.base_url.join(path_or_url)?)
    }

    /// Make a GET request to a path relative to the base URL.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.resolve(path)?;
        self.send(self.http.get(url)).await
    }

    /// Make a GET request with query parameters.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Response> {
        let url = self.resolve(path)?;
        self.send(self.http.get(url).query(query)).await
    }

    /// Make a GET request to a fully resolved URL (next links, downloads).
    #[tracing::instrument(skip(self, url), fields(url = %url))]
    pub async fn get_url(&self, url: Url) -> Result<Response> {
        self.send(self.http.get(url)).await
    }

    /// POST a multipart form to a path relative to the base URL.
    #[tracing::instrument(skip(self, form))]
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response> {
        let url = self.resolve(path)?;
        self.send(self.http.post(url).multipart(form)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(self.credential.token())
            .header(TOKEN_HEADER, self.credential.token())
            .header(KEY_HEADER, self.credential.key())
            .send()
            .await
            .map_err(AlascoError::HttpError)?;

        Self::check_response(response).await
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = Self::extract_error_message(response, status).await;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AlascoError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        Err(AlascoError::Api {
            message,
            status: status.as_u16(),
        })
    }

    /// Extract error message from a failed response.
    async fn extract_error_message(response: Response, status: StatusCode) -> String {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return format!("HTTP {status}"),
        };

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            // JSON:API error objects
            if let Some(first) = json.get("errors").and_then(|e| e.get(0)) {
                if let Some(detail) = first
                    .get("detail")
                    .or_else(|| first.get("title"))
                    .and_then(|d| d.as_str())
                {
                    return detail.to_string();
                }
            }
            for field in ["message", "detail", "error"] {
                if let Some(msg) = json.get(field).and_then(|m| m.as_str()) {
                    return msg.to_string();
                }
            }
        }

        if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> AlascoClient {
        AlascoClient::new(&Config::new("test-token", "test-key").with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_client_debug() {
        let debug = format!("{:?}", client("https://api.alasco.de/v1"));
        assert!(debug.contains("AlascoClient"));
        assert!(debug.contains("base_url"));
        assert!(!debug.contains("test-token"));
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client1 = client("https://api.alasco.de/v1");
        let client2 = client("https://api.alasco.de/v1/");
        assert_eq!(client1.base_url().as_str(), client2.base_url().as_str());
    }

    #[test]
    fn test_resolve_keeps_version_prefix() {
        let client = client("https://api.alasco.de/v1");
        assert_eq!(
            client.resolve("projects/").unwrap().as_str(),
            "https://api.alasco.de/v1/projects/"
        );
    }

    #[test]
    fn test_resolve_absolute_url_passes_through() {
        let client = client("https://api.alasco.de/v1");
        let url = client
            .resolve("https://files.alasco.de/doc/1?sig=abc")
            .unwrap();
        assert_eq!(url.as_str(), "https://files.alasco.de/doc/1?sig=abc");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = AlascoClient::new(&Config::new("t", "k").with_base_url("not a url"));
        assert!(matches!(result, Err(AlascoError::UrlError(_))));
    }
}
