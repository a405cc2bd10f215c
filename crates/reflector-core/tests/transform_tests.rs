//! Integration tests for Source-Url rewriting
//!
//! Exercises the rewrite rules and version selection through the public API
//! with realistic cartridge manifests.

use reflector_core::{reflect, transform, ManifestDocument, ManifestError, TransformOutcome};
use serde_yaml::Value;
use url::Url;

const CARTRIDGE: &str = r#"
Name: mock
Cartridge-Short-Name: MOCK
Display-Name: Mock Cartridge
Version: '0.1'
Versions: ['0.1', '0.2']
Cartridge-Version: 0.0.1
Cartridge-Vendor: redhat
Categories:
  - service
  - web_framework
Version-Overrides:
  '0.2':
    Display-Name: Mock Cartridge 0.2
    Source-Url: mock-0.2.tar.gz
Endpoints:
  - Private-IP-Name: IP
    Private-Port-Name: PORT
    Private-Port: 8080
"#;

fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

fn doc(yaml: &str) -> ManifestDocument {
    ManifestDocument::from_str(yaml).unwrap()
}

#[test]
fn test_qualified_source_is_identity_for_many_hosts() {
    let fetch_urls = [
        "http://a.com/cart/foo",
        "https://github.com/me/project/raw/master/metadata/manifest.yml",
        "https://raw.github.com/me/project/abc/metadata/manifest.yml",
        "http://a.com/cart/metadata/manifest.yml",
    ];
    for fetch_url in fetch_urls {
        let (result, outcome) = transform(
            doc("Source-Url: https://cdn.example.com/mock.zip\n"),
            &url(fetch_url),
            None,
            false,
        )
        .unwrap();
        assert_eq!(outcome, TransformOutcome::Unchanged, "{}", fetch_url);
        assert_eq!(result.source_url(), Some("https://cdn.example.com/mock.zip"));
    }
}

#[test]
fn test_github_archive_for_both_host_shapes() {
    let cases = [
        "https://github.com/me/project/raw/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2/metadata/manifest.yml",
        "https://raw.github.com/me/project/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2/metadata/manifest.yml",
        "https://raw.github.com/me/project/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2/metadata/manifest.yaml",
    ];
    for fetch_url in cases {
        let (result, outcome) = transform(ManifestDocument::new(), &url(fetch_url), None, false).unwrap();
        assert_eq!(outcome, TransformOutcome::GithubArchive, "{}", fetch_url);
        assert_eq!(
            result.source_url(),
            Some("https://github.com/me/project/archive/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2.zip")
        );
    }
}

#[test]
fn test_relative_source_resolves_against_directory() {
    let cases = [
        ("bar.zip", "http://a.com/cart/foo", "http://a.com/cart/bar.zip"),
        ("dist/bar.tar.gz", "https://a.com/x/y/manifest.yml", "https://a.com/x/y/dist/bar.tar.gz"),
        ("../bar.zip", "http://a.com/cart/sub/foo", "http://a.com/cart/bar.zip"),
    ];
    for (source, fetch_url, expected) in cases {
        let yaml = format!("Source-Url: {}\n", source);
        let (result, outcome) = transform(doc(&yaml), &url(fetch_url), None, false).unwrap();
        assert_eq!(outcome, TransformOutcome::RelativePath);
        assert_eq!(result.source_url(), Some(expected));
    }
}

#[test]
fn test_rewrite_path_keeps_scheme_host_and_query() {
    let (result, outcome) =
        transform(ManifestDocument::new(), &url("https://files.example.com:8443/carts/mock?x=1"), None, false)
            .unwrap();
    assert_eq!(outcome, TransformOutcome::RewritePath);
    assert_eq!(
        result.source_url(),
        Some("https://files.example.com:8443/carts/mock.tar.gz?x=1")
    );
}

#[test]
fn test_absolute_path_source_falls_through() {
    // No host and not relative: the manifest URL decides
    let (result, outcome) =
        transform(doc("Source-Url: /cart/bar.zip\n"), &url("http://a.com/cart/foo"), None, false).unwrap();
    assert_eq!(outcome, TransformOutcome::RewritePath);
    assert_eq!(result.source_url(), Some("http://a.com/cart/foo.tar.gz"));
}

#[test]
fn test_force_rewrite_with_qualified_source_on_generic_url() {
    let (result, outcome) = transform(
        doc("Source-Url: http://a.com/cart/bar.zip\n"),
        &url("http://a.com/cart/foo"),
        None,
        true,
    )
    .unwrap();
    assert_eq!(outcome, TransformOutcome::RewritePath);
    assert_eq!(result.source_url(), Some("http://a.com/cart/foo.tar.gz"));
}

#[test]
fn test_version_override_feeds_rewrite() {
    let (result, outcome) = transform(
        doc(CARTRIDGE),
        &url("http://a.com/carts/mock/metadata/manifest.yml"),
        Some("0.2"),
        false,
    )
    .unwrap();

    assert_eq!(outcome, TransformOutcome::RelativePath);
    assert_eq!(
        result.source_url(),
        Some("http://a.com/carts/mock/metadata/mock-0.2.tar.gz")
    );
    assert_eq!(
        result.get("Display-Name").and_then(Value::as_str),
        Some("Mock Cartridge 0.2")
    );
    assert_eq!(result.get("Version").and_then(Value::as_str), Some("0.2"));
    assert!(!result.contains_key("Versions"));
    assert!(!result.contains_key("Version-Overrides"));
}

#[test]
fn test_version_selection_is_idempotent() {
    let fetch_url = url("http://a.com/carts/mock/metadata/manifest.yml");
    let (once, _) = transform(doc(CARTRIDGE), &fetch_url, Some("0.2"), false).unwrap();
    let (twice, _) = transform(once.clone(), &fetch_url, Some("0.2"), false).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_invalid_version_fails_whole_transform() {
    let err = transform(doc(CARTRIDGE), &url("http://a.com/cart/foo"), Some("9.9"), false).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidVersion(ref v) if v == "9.9"));
    assert_eq!(err.kind(), "invalid_version");
}

#[test]
fn test_reflect_serializes_rewritten_manifest() {
    let reflection = reflect(b"Name: mock\nSource-Url: bar.zip\n", &url("http://a.com/cart/foo"), None, false)
        .unwrap();
    assert_eq!(reflection.outcome, TransformOutcome::RelativePath);
    assert_eq!(reflection.body, "Name: mock\nSource-Url: http://a.com/cart/bar.zip\n");
}

#[test]
fn test_reflect_rejects_unsafe_yaml() {
    let err = reflect(
        b"--- !ruby/object:Gem::Requirement\nrequirements: []\n",
        &url("http://a.com/cart/foo"),
        None,
        false,
    )
    .unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)));
    assert_eq!(err.to_string(), "Manifest could not be safely parsed");
}

#[test]
fn test_reflect_reserializes_after_version_selection() {
    let reflection = reflect(
        b"Version: '1.0'\nSource-Url: http://a.com/x.zip\n",
        &url("http://a.com/cart/foo"),
        Some("1.0"),
        false,
    )
    .unwrap();
    assert_eq!(reflection.outcome, TransformOutcome::Unchanged);
    assert_eq!(reflection.body, "Version: '1.0'\nSource-Url: http://a.com/x.zip\n");
}
