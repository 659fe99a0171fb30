//! Cache key resolution
//!
//! Turns raw step inputs into the primary key, the ordered fallback prefixes
//! and the path set. Pure: nothing here touches the store or the filesystem.

use crate::error::{CachegateError, CachegateResult};
use crate::inputs::{names, Inputs};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of one cache snapshot, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key, trimming surrounding whitespace
    pub fn new(key: impl AsRef<str>) -> CachegateResult<Self> {
        let trimmed = key.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CachegateError::ConfigMissing(names::KEY.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CachegateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

impl PartialEq<str> for CacheKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Ordered fallback key prefixes, tried after the primary key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreKeys(Vec<String>);

impl RestoreKeys {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self(prefixes)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Non-empty ordered set of paths restored and saved as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths(Vec<String>);

impl CachePaths {
    pub fn new(paths: Vec<String>) -> CachegateResult<Self> {
        if paths.is_empty() {
            return Err(CachegateError::ConfigMissing(names::PATH.to_string()));
        }
        Ok(Self(paths))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Fingerprint of the ordered path set
    ///
    /// Entries are only restored into the path set they were saved from, and
    /// run state is scoped by it so several caches can share one run.
    pub fn version(&self) -> String {
        let joined = self.0.join("|");
        hex::encode(Sha256::digest(joined.as_bytes()))
    }
}

/// Everything a restore needs to know about which entry to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub primary_key: CacheKey,
    pub restore_keys: RestoreKeys,
    pub paths: CachePaths,
}

impl ResolvedKeys {
    /// Primary key followed by every restore key, in lookup order
    pub fn lookup_order(&self) -> Vec<String> {
        std::iter::once(self.primary_key.to_string())
            .chain(self.restore_keys.iter().map(str::to_string))
            .collect()
    }
}

/// Resolve the primary key, restore keys and paths from the step inputs
pub fn resolve(inputs: &Inputs) -> CachegateResult<ResolvedKeys> {
    let primary_key = resolve_primary_key(inputs)?;
    let paths = resolve_paths(inputs)?;
    let restore_keys = RestoreKeys::new(inputs.get_array(names::RESTORE_KEYS));

    Ok(ResolvedKeys {
        primary_key,
        restore_keys,
        paths,
    })
}

/// Resolve only the primary key
pub fn resolve_primary_key(inputs: &Inputs) -> CachegateResult<CacheKey> {
    CacheKey::new(inputs.get_required(names::KEY)?)
}

/// Resolve only the path set
pub fn resolve_paths(inputs: &Inputs) -> CachegateResult<CachePaths> {
    CachePaths::new(inputs.get_array(names::PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Inputs {
        Inputs::empty()
            .with(names::KEY, "v1-deps-a1b2")
            .with(names::PATH, "target\n~/.cargo/registry")
    }

    #[test]
    fn resolves_all_parts() {
        let resolved = resolve(&inputs().with(names::RESTORE_KEYS, "v1-deps-\nv1-")).unwrap();

        assert_eq!(resolved.primary_key.as_str(), "v1-deps-a1b2");
        assert_eq!(resolved.restore_keys.as_slice(), ["v1-deps-", "v1-"]);
        assert_eq!(resolved.paths.as_slice(), ["target", "~/.cargo/registry"]);
    }

    #[test]
    fn restore_keys_default_to_empty() {
        let resolved = resolve(&inputs()).unwrap();
        assert!(resolved.restore_keys.is_empty());
        assert_eq!(resolved.lookup_order(), vec!["v1-deps-a1b2"]);
    }

    #[test]
    fn lookup_order_keeps_duplicates() {
        let resolved = resolve(&inputs().with(names::RESTORE_KEYS, "v1-\nv1-")).unwrap();
        assert_eq!(resolved.lookup_order(), vec!["v1-deps-a1b2", "v1-", "v1-"]);
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = resolve(&Inputs::empty().with(names::PATH, "target")).unwrap_err();
        assert!(matches!(err, CachegateError::ConfigMissing(ref name) if name == "key"));
    }

    #[test]
    fn blank_path_is_configuration_error() {
        let inputs = Inputs::empty()
            .with(names::KEY, "k")
            .with(names::PATH, "\n  \n");
        let err = resolve(&inputs).unwrap_err();
        assert!(matches!(err, CachegateError::ConfigMissing(ref name) if name == "path"));
    }

    #[test]
    fn cache_key_rejects_whitespace_only() {
        assert!(CacheKey::new("   ").is_err());
        assert_eq!(CacheKey::new(" v1 ").unwrap().as_str(), "v1");
    }

    #[test]
    fn cache_key_serde_validates() {
        let key: CacheKey = serde_json::from_str("\"v1-deps\"").unwrap();
        assert_eq!(key.as_str(), "v1-deps");
        assert!(serde_json::from_str::<CacheKey>("\"\"").is_err());
    }

    #[test]
    fn version_depends_on_path_order() {
        let a = CachePaths::new(vec!["a".to_string(), "b".to_string()]).unwrap();
        let b = CachePaths::new(vec!["b".to_string(), "a".to_string()]).unwrap();
        assert_ne!(a.version(), b.version());
        assert_eq!(a.version(), a.clone().version());
    }
}
