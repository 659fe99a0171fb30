//! Save orchestration
//!
//! A save always goes to the store. By the time it runs the build has done
//! its real work, so only a validation error may fail the step.

use crate::cache::classify::{classify, decide, Disposition, Phase};
use crate::cache::keys::{CacheKey, CachePaths};
use crate::error::CachegateResult;
use crate::store::ArtifactStore;
use std::fmt;
use tracing::{debug, info, warn};

/// Why a save was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another run already owns the key
    Conflict,
}

/// Result of a save attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    /// The store failed; the message was logged as a warning
    WarnedButContinued(String),
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved => write!(f, "saved"),
            Self::Skipped(SkipReason::Conflict) => write!(f, "skipped (conflict)"),
            Self::WarnedButContinued(message) => write!(f, "not saved: {message}"),
        }
    }
}

/// Persist `paths` under `key`
pub async fn save(
    store: &dyn ArtifactStore,
    key: &CacheKey,
    paths: &CachePaths,
    chunk_size: Option<u64>,
) -> CachegateResult<SaveOutcome> {
    debug!("Saving {} to {}", key, store.backend_name());

    let err = match store.save(paths, key, chunk_size).await {
        Ok(()) => {
            info!("Cache saved with key: {}", key);
            return Ok(SaveOutcome::Saved);
        }
        Err(err) => err,
    };

    match decide(classify(&err), Phase::Save) {
        Disposition::Fatal => Err(err.into()),
        Disposition::Benign => {
            info!("{}", err);
            Ok(SaveOutcome::Skipped(SkipReason::Conflict))
        }
        Disposition::Warn => {
            warn!("{}", err);
            Ok(SaveOutcome::WarnedButContinued(err.to_string()))
        }
    }
}
