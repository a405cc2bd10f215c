//! Cartridge Reflector Library
//!
//! This crate rewrites cartridge manifests so that every manifest carries a
//! resolvable `Source-Url`, including:
//! - URL classification (relative paths, raw GitHub manifests, manifest paths)
//! - Safe YAML decoding of manifest documents
//! - Version selection through `Version-Overrides`
//! - The ordered `Source-Url` rewrite rules
//! - Bounded manifest fetching over HTTP/HTTPS

pub mod document;
pub mod error;
pub mod transform;
pub mod url;
pub mod version;

pub use document::{ManifestDocument, ParseError};
pub use error::ManifestError;
pub use transform::{reflect, transform, Reflection, TransformOutcome};
pub use crate::url::{
    derive_archive_path, is_manifest_path, is_relative, match_raw_github_manifest, FetchError,
    GithubRef, ManifestFetcher, ManifestSource, ParsedUrl, REQUEST_TIMEOUT,
};
pub use version::select_version;
