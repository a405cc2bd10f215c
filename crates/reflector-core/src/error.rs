//! Reflection errors
//!
//! Every failure is terminal for the request; the status class tells the
//! calling layer which response code to send.

use crate::document::ParseError;
use crate::url::FetchError;
use thiserror::Error;

/// Errors that can occur while reflecting a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Manifest could not be downloaded
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Manifest is malformed or uses unsafe YAML constructs
    ///
    /// The message never echoes parser internals; the source carries them
    /// for logging.
    #[error("Manifest could not be safely parsed")]
    Parse(#[source] ParseError),

    /// Requested version is neither `Version` nor listed in `Versions`
    #[error("Invalid version '{0}', not listed in Version or Versions")]
    InvalidVersion(String),
}

impl From<ParseError> for ManifestError {
    fn from(err: ParseError) -> Self {
        ManifestError::Parse(err)
    }
}

impl ManifestError {
    /// Numeric status class for the calling layer
    ///
    /// All failures are client-facing: the manifest the client pointed at
    /// was unreachable, oversized, unsafe or lacked the requested version.
    pub fn status_code(&self) -> u16 {
        match self {
            ManifestError::Fetch(_) => 400,
            ManifestError::Parse(_) => 400,
            ManifestError::InvalidVersion(_) => 400,
        }
    }

    /// Short machine-readable error class
    pub fn kind(&self) -> &'static str {
        match self {
            ManifestError::Fetch(FetchError::TooLarge { .. }) => "fetch_too_large",
            ManifestError::Fetch(_) => "fetch_unreachable",
            ManifestError::Parse(_) => "parse_unsafe_or_malformed",
            ManifestError::InvalidVersion(_) => "invalid_version",
        }
    }
}
