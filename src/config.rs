//! Client configuration.
//!
//! Everything the client needs is held in a [`Config`] value that callers
//! build once and hand to [`AlascoClient`](crate::AlascoClient) and
//! [`DocumentDownloader`](crate::DocumentDownloader).

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::{AlascoError, Result};

/// Default base URL of the Alasco API.
pub const DEFAULT_API_URL: &str = "https://api.alasco.de/v1/";

/// Default root directory for downloaded documents.
pub const DEFAULT_DOWNLOAD_PATH: &str = "outputs";

/// API token and signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    key: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            key: key.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// Connection and download settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub credential: Credential,
    pub base_url: String,
    pub download_root: PathBuf,
}

impl Config {
    /// Configuration with the default base URL and download root.
    pub fn new(token: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(token, key),
            base_url: DEFAULT_API_URL.to_string(),
            download_root: PathBuf::from(DEFAULT_DOWNLOAD_PATH),
        }
    }

    /// Read configuration from environment variables.
    ///
    /// Uses `ALASCO_API_TOKEN` and `ALASCO_API_KEY` for authentication,
    /// `ALASCO_API_URL` for the base URL and `ALASCO_DOWNLOAD_PATH` for the
    /// download root.
    ///
    /// # Errors
    ///
    /// Returns an error if the token or key is not set or empty.
    pub fn from_env() -> Result<Self> {
        let token = required_var("ALASCO_API_TOKEN")?;
        let key = required_var("ALASCO_API_KEY")?;

        let mut config = Self::new(token, key);
        if let Ok(url) = env::var("ALASCO_API_URL") {
            config.base_url = url;
        }
        if let Ok(path) = env::var("ALASCO_DOWNLOAD_PATH") {
            config.download_root = PathBuf::from(path);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_download_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.download_root = root.into();
        self
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AlascoError::ConfigMissing(format!(
            "{name} environment variable not set"
        ))),
    }
}
