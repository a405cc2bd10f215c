//! Version selection
//!
//! A manifest may declare several versions through `Versions` and carry
//! per-version fragments under `Version-Overrides`. Selecting a version
//! folds its fragment into the top level and pins `Version`.

use crate::document::{scalar_text, ManifestDocument, VERSION, VERSIONS, VERSION_OVERRIDES};
use crate::error::ManifestError;
use serde_yaml::Value;

/// Pin `requested` as the manifest's version
///
/// Fails with [`ManifestError::InvalidVersion`] unless `requested` equals
/// `Version` or is listed in `Versions`; the document is untouched on
/// failure. A missing override fragment is not an error.
pub fn select_version(document: &mut ManifestDocument, requested: &str) -> Result<(), ManifestError> {
    if !is_declared(document, requested) {
        return Err(ManifestError::InvalidVersion(requested.to_string()));
    }

    if let Some(fragment) = take_override(document, requested) {
        match fragment {
            Value::Mapping(fields) => {
                for (key, value) in fields {
                    if is_bookkeeping(&key) {
                        tracing::debug!(version = requested, key = ?key, "skipping bookkeeping key in override");
                        continue;
                    }
                    document.insert_value(key, value);
                }
            }
            other => {
                tracing::debug!(version = requested, fragment = ?other, "ignoring non-mapping override");
            }
        }
    }

    document.insert(VERSION, requested);
    document.remove(VERSIONS);

    tracing::debug!(version = requested, "selected manifest version");
    Ok(())
}

fn is_declared(document: &ManifestDocument, requested: &str) -> bool {
    let is_requested = |value: &Value| scalar_text(value).as_deref() == Some(requested);

    if document.get(VERSION).is_some_and(is_requested) {
        return true;
    }

    match document.get(VERSIONS) {
        Some(Value::Sequence(items)) => items.iter().any(is_requested),
        Some(Value::Mapping(set)) => set.keys().any(is_requested),
        Some(scalar) => is_requested(scalar),
        None => false,
    }
}

fn is_bookkeeping(key: &Value) -> bool {
    matches!(key.as_str(), Some(VERSION_OVERRIDES | VERSIONS))
}

/// Remove and return the override fragment for `requested`
///
/// Drops `Version-Overrides` entirely once its last entry is taken.
fn take_override(document: &mut ManifestDocument, requested: &str) -> Option<Value> {
    let Some(Value::Mapping(overrides)) = document.get_mut(VERSION_OVERRIDES) else {
        return None;
    };

    let key = overrides
        .keys()
        .find(|key| scalar_text(key).as_deref() == Some(requested))
        .cloned()?;
    let fragment = overrides.shift_remove(&key);

    if overrides.is_empty() {
        document.remove(VERSION_OVERRIDES);
    }

    fragment
}
