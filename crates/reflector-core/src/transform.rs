//! Source-Url rewriting
//!
//! Applies version selection, then exactly one of the rewrite rules below
//! to a manifest's `Source-Url`:
//!
//! 1. Fully qualified `Source-Url` (has a host): keep it, unless forced
//! 2. Relative `Source-Url`: resolve it against the manifest URL
//! 3. Manifest URL is a raw GitHub file: use GitHub's archive zip
//! 4. Manifest URL is not a `metadata/manifest.y(a)ml` path: point at the
//!    same name with `.tar.gz`, keeping the query
//!
//! When none applies the manifest is returned unchanged.

use crate::document::ManifestDocument;
use crate::error::ManifestError;
use crate::url::{derive_archive_path, is_manifest_path, is_relative, match_raw_github_manifest, ParsedUrl};
use crate::version::select_version;
use std::fmt;
use url::Url;

/// Which rewrite rule fired for a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformOutcome {
    /// `Source-Url` left as it was
    Unchanged,
    /// Relative `Source-Url` resolved against the manifest URL
    RelativePath,
    /// GitHub archive zip derived from a raw GitHub manifest URL
    GithubArchive,
    /// `.tar.gz` next to the manifest URL
    RewritePath,
}

impl TransformOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformOutcome::Unchanged => "unchanged",
            TransformOutcome::RelativePath => "relative_path",
            TransformOutcome::GithubArchive => "github_archive",
            TransformOutcome::RewritePath => "rewrite_path",
        }
    }
}

impl fmt::Display for TransformOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite `document`'s `Source-Url` for a manifest fetched from `fetch_url`
///
/// `requested_version` is selected first (see [`select_version`]); its
/// failure aborts the transform. `force_rewrite` skips the "already fully
/// qualified" short-circuit.
pub fn transform(
    mut document: ManifestDocument,
    fetch_url: &Url,
    requested_version: Option<&str>,
    force_rewrite: bool,
) -> Result<(ManifestDocument, TransformOutcome), ManifestError> {
    if let Some(version) = requested_version {
        select_version(&mut document, version)?;
    }

    let raw_source = document.source_url().map(String::from);
    let source = raw_source.as_deref().and_then(ParsedUrl::parse);

    if let Some(source) = &source {
        if source.has_host() && !force_rewrite {
            tracing::info!(%fetch_url, "manifest already has a source-url");
            return Ok((document, TransformOutcome::Unchanged));
        }

        if is_relative(&source.path) {
            if let Some(joined) = raw_source.as_deref().and_then(|raw| fetch_url.join(raw).ok()) {
                tracing::info!(%fetch_url, source = %joined, "joining relative path to manifest URL");
                document.set_source_url(joined.as_str());
                return Ok((document, TransformOutcome::RelativePath));
            }
        }
    }

    let host = fetch_url.host_str().unwrap_or_default();
    if let Some(github) = match_raw_github_manifest(host, fetch_url.path()) {
        tracing::info!(
            user = %github.user,
            project = %github.project,
            commit = %github.commit,
            "matched github hosted raw manifest"
        );
        document.set_source_url(github.archive_url());
        return Ok((document, TransformOutcome::GithubArchive));
    }

    // A bare host has no segment to name the archive after
    let has_name = !fetch_url.path().trim_matches('/').is_empty();
    if has_name && !is_manifest_path(fetch_url.path()) {
        let mut archive = fetch_url.clone();
        archive.set_path(&derive_archive_path(fetch_url.path()));
        tracing::info!(source = %archive, "generic path, assuming archive next to manifest");
        document.set_source_url(archive.as_str());
        return Ok((document, TransformOutcome::RewritePath));
    }

    tracing::info!(%fetch_url, "no rewrite rule applies");
    Ok((document, TransformOutcome::Unchanged))
}

/// Output of [`reflect`]: the manifest text to return and the rule that fired
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub body: String,
    pub outcome: TransformOutcome,
}

/// Decode, transform and re-encode a fetched manifest
///
/// When nothing changed (no version requested and outcome `unchanged`) the
/// original text is returned byte for byte.
pub fn reflect(
    bytes: &[u8],
    fetch_url: &Url,
    requested_version: Option<&str>,
    force_rewrite: bool,
) -> Result<Reflection, ManifestError> {
    let document = ManifestDocument::parse(bytes).map_err(|err| {
        tracing::warn!(%fetch_url, error = %err, "manifest could not be safely parsed");
        ManifestError::from(err)
    })?;

    let (document, outcome) = transform(document, fetch_url, requested_version, force_rewrite)?;

    let untouched = outcome == TransformOutcome::Unchanged && requested_version.is_none();
    let body = if untouched {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        document.to_yaml()?
    };

    Ok(Reflection { body, outcome })
}
