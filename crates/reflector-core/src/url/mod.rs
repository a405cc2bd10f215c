//! URL classification
//!
//! Pure predicates over parsed URLs used to decide how a manifest's
//! `Source-Url` gets rewritten.
//!
//! ## Recognized shapes
//!
//! - `bar.zip`, `../dist/bar.tar.gz` - relative references
//! - `https://github.com/user/project/raw/<commit>/metadata/manifest.yml` - raw GitHub file
//! - `https://raw.github.com/user/project/<commit>/metadata/manifest.yml` - raw GitHub file
//! - `https://example.com/cart/metadata/manifest.yml` - canonical manifest path

pub mod fetch;

pub use fetch::{
    FetchError, ManifestFetcher, ManifestSource, CONNECT_TIMEOUT, MAX_MANIFEST_SIZE,
    REQUEST_TIMEOUT,
};

use regex::Regex;
use std::sync::LazyLock;

/// `github.com/<user>/<project>/raw/<commit>/metadata/manifest.y(a)ml`
static GITHUB_RAW_MANIFEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([^/]+)/([^/]+)/raw/([^/]+)/metadata/manifest\.ya?ml$")
        .expect("github raw manifest regex is valid")
});

/// `raw.github.com/<user>/<project>/<commit>/metadata/manifest.y(a)ml`
static RAW_GITHUB_MANIFEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([^/]+)/([^/]+)/([^/]+)/metadata/manifest\.ya?ml$")
        .expect("raw.github.com manifest regex is valid")
});

const MANIFEST_SUFFIXES: [&str; 2] = ["/metadata/manifest.yml", "/metadata/manifest.yaml"];

/// Suffix appended by [`derive_archive_path`]
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Minimal URL decomposition used for classification
///
/// Unlike [`url::Url`], this also represents relative references such as
/// `bar.zip` or `/dist/bar.zip`, which have neither scheme nor host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedUrl {
    /// URL scheme (`http`, `https`, ...), absent for relative references
    pub scheme: Option<String>,
    /// Host name, absent for relative references and host-less schemes
    pub host: Option<String>,
    /// Path, possibly empty
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
}

impl ParsedUrl {
    /// Parse an absolute URL or a relative reference
    ///
    /// Returns `None` only when the input looks absolute but is invalid
    /// (for example a bad port or an empty host).
    pub fn parse(raw: &str) -> Option<Self> {
        match ::url::Url::parse(raw) {
            Ok(url) => Some(Self::from(&url)),
            Err(::url::ParseError::RelativeUrlWithoutBase) => Some(Self::relative(raw)),
            Err(_) => None,
        }
    }

    /// Whether this URL names a host, i.e. is fully qualified
    pub fn has_host(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.is_empty())
    }

    fn relative(raw: &str) -> Self {
        let without_fragment = raw.split_once('#').map_or(raw, |(head, _)| head);
        let (rest, query) = match without_fragment.split_once('?') {
            Some((head, query)) => (head, Some(query.to_string())),
            None => (without_fragment, None),
        };

        // Scheme-relative reference: //host/path
        if let Some(authority_and_path) = rest.strip_prefix("//") {
            let (authority, path) = match authority_and_path.find('/') {
                Some(idx) => authority_and_path.split_at(idx),
                None => (authority_and_path, ""),
            };
            let host = authority.rsplit('@').next().unwrap_or(authority);
            let host = host.split(':').next().unwrap_or(host);
            return Self {
                scheme: None,
                host: Some(host.to_string()).filter(|h| !h.is_empty()),
                path: path.to_string(),
                query,
            };
        }

        Self {
            scheme: None,
            host: None,
            path: rest.to_string(),
            query,
        }
    }
}

impl From<&::url::Url> for ParsedUrl {
    fn from(url: &::url::Url) -> Self {
        Self {
            scheme: Some(url.scheme().to_string()),
            host: url.host_str().map(String::from),
            path: url.path().to_string(),
            query: url.query().map(String::from),
        }
    }
}

/// Commit coordinates captured from a raw GitHub manifest URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRef {
    pub user: String,
    pub project: String,
    pub commit: String,
}

impl GithubRef {
    /// GitHub's zip archive URL for this commit
    pub fn archive_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/archive/{}.zip",
            self.user, self.project, self.commit
        )
    }
}

/// True when `path` is non-empty and does not start with `/`
pub fn is_relative(path: &str) -> bool {
    !path.is_empty() && !path.starts_with('/')
}

/// True when `path` ends with `/metadata/manifest.yml` or `/metadata/manifest.yaml`
pub fn is_manifest_path(path: &str) -> bool {
    MANIFEST_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Match a raw GitHub manifest URL and capture `(user, project, commit)`
///
/// Supports patterns:
/// - host `github.com`: `/{user}/{project}/raw/{commit}/metadata/manifest.y(a)ml`
/// - host `raw.github.com`: `/{user}/{project}/{commit}/metadata/manifest.y(a)ml`
pub fn match_raw_github_manifest(host: &str, path: &str) -> Option<GithubRef> {
    let pattern = match host {
        "github.com" => &*GITHUB_RAW_MANIFEST,
        "raw.github.com" => &*RAW_GITHUB_MANIFEST,
        _ => return None,
    };

    let caps = pattern.captures(path)?;
    Some(GithubRef {
        user: caps[1].to_string(),
        project: caps[2].to_string(),
        commit: caps[3].to_string(),
    })
}

/// Derive the archive path that sits next to `path`
///
/// The final segment loses its extension and gains `.tar.gz`, keeping the
/// containing directory:
/// - `/cart/foo` -> `/cart/foo.tar.gz`
/// - `/cart/foo.yml` -> `/cart/foo.tar.gz`
/// - `/cart/` -> `/cart.tar.gz`
pub fn derive_archive_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let (dir, file) = match trimmed.rfind('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    };

    // A leading dot marks a hidden file, not an extension
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };

    format!("{}/{}{}", dir, stem, ARCHIVE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_relative() {
        assert!(is_relative("bar.zip"));
        assert!(is_relative("../bar.zip"));
        assert!(!is_relative(""));
        assert!(!is_relative("/cart/bar.zip"));
    }

    #[test]
    fn test_is_manifest_path() {
        assert!(is_manifest_path("/cart/metadata/manifest.yml"));
        assert!(is_manifest_path("/cart/metadata/manifest.yaml"));
        assert!(!is_manifest_path("/cart/metadata/Manifest.yml"));
        assert!(!is_manifest_path("/cart/metadata/manifest.yml.bak"));
        assert!(!is_manifest_path("metadata/manifest.yml"));
    }

    #[test]
    fn test_match_github_raw() {
        let m = match_raw_github_manifest("github.com", "/me/project/raw/master/metadata/manifest.yml");
        assert_eq!(
            m,
            Some(GithubRef {
                user: "me".to_string(),
                project: "project".to_string(),
                commit: "master".to_string(),
            })
        );
    }

    #[test]
    fn test_match_raw_github_host() {
        let m = match_raw_github_manifest("raw.github.com", "/me/project/3107eb6/metadata/manifest.yaml")
            .unwrap();
        assert_eq!(m.commit, "3107eb6");
        assert_eq!(m.archive_url(), "https://github.com/me/project/archive/3107eb6.zip");
    }

    #[test]
    fn test_match_github_requires_raw_segment() {
        assert_eq!(
            match_raw_github_manifest("github.com", "/me/project/blob/master/metadata/manifest.yml"),
            None
        );
        assert_eq!(
            match_raw_github_manifest("example.com", "/me/project/raw/master/metadata/manifest.yml"),
            None
        );
    }

    #[test]
    fn test_derive_archive_path() {
        assert_eq!(derive_archive_path("/cart/foo"), "/cart/foo.tar.gz");
        assert_eq!(derive_archive_path("/cart/foo.yml"), "/cart/foo.tar.gz");
        assert_eq!(derive_archive_path("/cart/"), "/cart.tar.gz");
        assert_eq!(derive_archive_path("/a/b/.hidden"), "/a/b/.hidden.tar.gz");
    }

    #[test]
    fn test_parse_relative_reference() {
        let parsed = ParsedUrl::parse("bar.zip?x=1#frag").unwrap();
        assert_eq!(parsed.scheme, None);
        assert!(!parsed.has_host());
        assert_eq!(parsed.path, "bar.zip");
        assert_eq!(parsed.query.as_deref(), Some("x=1"));
    }

    #[test]
    fn test_parse_absolute() {
        let parsed = ParsedUrl::parse("http://a.com/cart/bar.zip").unwrap();
        assert_eq!(parsed.scheme.as_deref(), Some("http"));
        assert_eq!(parsed.host.as_deref(), Some("a.com"));
        assert_eq!(parsed.path, "/cart/bar.zip");
    }

    #[test]
    fn test_parse_scheme_relative() {
        let parsed = ParsedUrl::parse("//cdn.example.com/dist/bar.zip").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("cdn.example.com"));
        assert_eq!(parsed.path, "/dist/bar.zip");
    }

    #[test]
    fn test_parse_invalid_absolute() {
        assert_eq!(ParsedUrl::parse("http://a.com:99999/x"), None);
    }
}
