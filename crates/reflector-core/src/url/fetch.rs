//! Manifest fetching
//!
//! Downloads manifest bodies from HTTP/HTTPS URLs under a fixed byte
//! ceiling and fixed timeouts.

use reqwest::blocking::Client;
use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during manifest fetching
#[derive(Debug, Error)]
pub enum FetchError {
    /// Body exceeded the byte ceiling
    #[error("Manifest too long")]
    TooLarge { max: u64 },

    /// Non-success HTTP status or transport failure
    #[error("Manifest unreachable, {}", unreachable_reason(.status, .reason))]
    Unreachable { status: Option<u16>, reason: String },

    /// Connect, send or read timed out
    #[error("Manifest unreachable, timed out")]
    Timeout,

    /// URL is not http or https
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status returned by the remote host, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unreachable { status, .. } => *status,
            _ => None,
        }
    }
}

fn unreachable_reason(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => code.to_string(),
        None => reason.to_string(),
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout;
        }
        FetchError::Unreachable {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        if is_timeout(&err) {
            return FetchError::Timeout;
        }
        FetchError::Unreachable {
            status: None,
            reason: err.to_string(),
        }
    }
}

/// Body reads surface reqwest timeouts wrapped inside an `io::Error`
fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if err.is_timeout() {
                return true;
            }
        }
        if let Some(err) = err.downcast_ref::<io::Error>() {
            if err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
            // io::Error hides its payload from source()
            if let Some(inner) = err.get_ref() {
                if is_timeout(inner) {
                    return true;
                }
            }
        }
        current = err.source();
    }
    false
}

/// Maximum manifest size (30 KiB)
pub const MAX_MANIFEST_SIZE: u64 = 30 * 1024;

/// Connect timeout for outbound fetches
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Whole-request timeout (send and receive)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can produce raw manifest bytes for a URL
pub trait ManifestSource: Send + Sync {
    /// Fetch the manifest body at `url`
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP manifest fetcher
pub struct ManifestFetcher {
    client: Client,
    max_size: u64,
}

impl ManifestFetcher {
    /// Create a fetcher with the default limits
    pub fn new() -> Result<Self, FetchError> {
        Self::with_max_size(MAX_MANIFEST_SIZE)
    }

    /// Create a fetcher with a custom byte ceiling
    pub fn with_max_size(max_size: u64) -> Result<Self, FetchError> {
        // Outbound fetches go direct; proxy env vars are not consulted.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .user_agent(format!("cartridge-reflector/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, max_size })
    }

    /// Byte ceiling applied to every fetch
    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}

impl ManifestSource for ManifestFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.client.get(url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unreachable {
                status: Some(status.as_u16()),
                reason: status.to_string(),
            });
        }

        // Reject early when the server announces an oversized body
        if let Some(len) = response.content_length() {
            if len > self.max_size {
                return Err(FetchError::TooLarge { max: self.max_size });
            }
        }

        // Read at most one byte past the ceiling, then stop
        let mut content = Vec::new();
        let mut reader = response.take(self.max_size + 1);
        reader.read_to_end(&mut content)?;

        if content.len() as u64 > self.max_size {
            return Err(FetchError::TooLarge { max: self.max_size });
        }

        tracing::debug!(%url, bytes = content.len(), "fetched manifest");
        Ok(content)
    }
}
