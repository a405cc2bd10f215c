//! Manifest document codec
//!
//! Decodes manifest YAML into an ordered mapping and encodes it back.
//! Decoding only accepts the YAML core schema: any application tag such as
//! `!ruby/object:Foo` is rejected before the document is used.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Field holding the source archive location
pub const SOURCE_URL: &str = "Source-Url";

/// Field holding the pinned version
pub const VERSION: &str = "Version";

/// Field listing the selectable versions
pub const VERSIONS: &str = "Versions";

/// Field mapping versions to partial override documents
pub const VERSION_OVERRIDES: &str = "Version-Overrides";

/// Tags of the YAML core schema, without their `!!` prefix
const CORE_TAGS: &[&str] = &[
    "str",
    "int",
    "float",
    "bool",
    "null",
    "map",
    "seq",
    "binary",
    "timestamp",
];

/// Errors that can occur while decoding or encoding a manifest
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not valid UTF-8
    #[error("manifest is not valid UTF-8")]
    Encoding,

    /// Malformed YAML
    #[error("malformed YAML: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// Tag outside the core schema
    #[error("unsafe tag: {0}")]
    UnsafeTag(String),

    /// Top-level value is not a mapping
    #[error("manifest must be a mapping")]
    NotAMapping,
}

/// A cartridge manifest: an ordered mapping of YAML values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestDocument {
    fields: Mapping,
}

impl ManifestDocument {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a manifest from raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;
        Self::from_str(text)
    }

    /// Decode a manifest from text
    ///
    /// An empty document decodes as an empty mapping.
    pub fn from_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_yaml::from_str(text)?;
        reject_unsafe_tags(&value)?;

        match value {
            Value::Mapping(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::new()),
            _ => Err(ParseError::NotAMapping),
        }
    }

    /// Encode the manifest as YAML, without a leading document marker
    pub fn to_yaml(&self) -> Result<String, ParseError> {
        let text = serde_yaml::to_string(&self.fields)?;
        Ok(match text.strip_prefix("---\n") {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Insert a field, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(Value::String(key.into()), value.into())
    }

    /// Insert a field keyed by an arbitrary YAML value
    pub fn insert_value(&mut self, key: Value, value: Value) -> Option<Value> {
        self.fields.insert(key, value)
    }

    /// Remove a field, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The raw `Source-Url` value, if present and a string
    pub fn source_url(&self) -> Option<&str> {
        self.get(SOURCE_URL).and_then(Value::as_str)
    }

    pub fn set_source_url(&mut self, url: impl Into<String>) {
        self.insert(SOURCE_URL, Value::String(url.into()));
    }

    /// Borrow the underlying mapping
    pub fn as_mapping(&self) -> &Mapping {
        &self.fields
    }
}

/// Textual form of a scalar, used to compare version identifiers
///
/// `1.0` written as a YAML float compares equal to the string `"1.0"`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn reject_unsafe_tags(value: &Value) -> Result<(), ParseError> {
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let name = name.strip_prefix("tag:yaml.org,2002:").unwrap_or(name);
            if !CORE_TAGS.contains(&name) {
                return Err(ParseError::UnsafeTag(tag));
            }
            reject_unsafe_tags(&tagged.value)
        }
        Value::Sequence(items) => items.iter().try_for_each(reject_unsafe_tags),
        Value::Mapping(fields) => fields.iter().try_for_each(|(key, value)| {
            reject_unsafe_tags(key)?;
            reject_unsafe_tags(value)
        }),
        _ => Ok(()),
    }
}
