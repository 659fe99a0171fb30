//! Artifact store abstraction
//!
//! The orchestrators only ever talk to a store through the `ArtifactStore`
//! trait, so restore/save decisions can be exercised against a fake store
//! without any real transfer:
//! - `local`: directory-per-entry store on the local filesystem

mod factory;
mod local;

pub use factory::create_store;
pub use local::LocalStore;

use crate::cache::{CacheKey, CachePaths, RestoreKeys};
use async_trait::async_trait;
use thiserror::Error;

/// Result type alias for store primitives
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by an artifact store
///
/// Only `Validation` and `ReserveConflict` carry a definite meaning for the
/// orchestrators; every other variant is treated as transient.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed key, path set or chunk size
    #[error("{0}")]
    Validation(String),

    /// Another run already reserved (or finished) an entry under this key
    #[error("{0}")]
    ReserveConflict(String),

    /// None of the cache paths exist, nothing to persist
    #[error("Path Validation Error: Path(s) specified for caching do not exist, hence no cache is being saved.")]
    NothingToSave,

    /// Stored entry cannot be read back
    #[error("Corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend unreachable or refused the request
    #[error("Cache service unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Capability interface over a cache backend
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check whether an entry exists for exactly `key` under this path set
    async fn exists(&self, paths: &CachePaths, key: &CacheKey) -> StoreResult<bool>;

    /// Restore the best matching entry into `paths`
    ///
    /// Tries `primary_key` exactly, then each restore key in order as a
    /// prefix, newest entry first. Returns the key of the restored entry, or
    /// `None` when nothing matched.
    async fn restore(
        &self,
        paths: &CachePaths,
        primary_key: &CacheKey,
        restore_keys: &RestoreKeys,
    ) -> StoreResult<Option<String>>;

    /// Persist `paths` under `key`
    async fn save(
        &self,
        paths: &CachePaths,
        key: &CacheKey,
        chunk_size: Option<u64>,
    ) -> StoreResult<()>;

    /// Get the human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}
