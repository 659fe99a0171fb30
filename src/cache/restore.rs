//! Restore orchestration
//!
//! Asks the store for the primary key and its fallbacks, then turns the
//! answer into a [`RestoreOutcome`] or an error according to the policy.
//!
//! # Outcomes
//!
//! | Store answer | Required | Optional |
//! |--------------|----------|----------|
//! | primary key  | ExactHit | ExactHit |
//! | fallback key | FallbackHit | FallbackHit |
//! | nothing      | `CacheMiss` error | Miss |
//! | validation error | error | error |
//! | any other error | error | warning + Miss |

use crate::cache::classify::{classify, decide, Disposition, Phase};
use crate::cache::keys::{CacheKey, ResolvedKeys};
use crate::cache::policy::Policy;
use crate::cache::state::RunState;
use crate::error::{CachegateError, CachegateResult};
use crate::store::ArtifactStore;
use std::fmt;
use tracing::{debug, info, warn};

/// Result of a restore attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Restored the entry stored under the primary key
    ExactHit(String),
    /// Restored an older entry matched by a restore key
    FallbackHit(String),
    /// Nothing restored
    Miss,
}

impl RestoreOutcome {
    /// Classify a matched key against the primary key
    pub fn from_match(primary_key: &CacheKey, matched_key: String) -> Self {
        if primary_key.as_str() == matched_key {
            Self::ExactHit(matched_key)
        } else {
            Self::FallbackHit(matched_key)
        }
    }

    /// Key of the restored entry, if any
    pub fn matched_key(&self) -> Option<&str> {
        match self {
            Self::ExactHit(key) | Self::FallbackHit(key) => Some(key),
            Self::Miss => None,
        }
    }

    /// Value of the `cache-hit` output: only an exact match counts
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::ExactHit(_))
    }
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactHit(key) => write!(f, "exact hit ({key})"),
            Self::FallbackHit(key) => write!(f, "fallback hit ({key})"),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// Restore the cache for `keys` into its paths
///
/// The primary key is recorded in `state` before the store is contacted, so
/// a later save step can recover it even when this call fails.
pub async fn restore(
    store: &dyn ArtifactStore,
    state: &mut RunState,
    keys: &ResolvedKeys,
    policy: Policy,
) -> CachegateResult<RestoreOutcome> {
    state.record_primary_key(&keys.primary_key)?;

    debug!(
        "Restoring {} from {} ({} restore keys, {})",
        keys.primary_key,
        store.backend_name(),
        keys.restore_keys.len(),
        policy
    );

    let result = store
        .restore(&keys.paths, &keys.primary_key, &keys.restore_keys)
        .await;

    match result {
        Ok(Some(matched_key)) => {
            state.record_matched_key(&matched_key)?;
            info!("Cache restored from key: {}", matched_key);
            Ok(RestoreOutcome::from_match(&keys.primary_key, matched_key))
        }
        Ok(None) => {
            let miss = CachegateError::CacheMiss {
                keys: keys.lookup_order(),
            };
            if policy.is_required() {
                return Err(miss);
            }
            info!("{}", miss);
            Ok(RestoreOutcome::Miss)
        }
        Err(err) => {
            let class = classify(&err);
            match decide(class, Phase::Restore(policy)) {
                Disposition::Fatal => Err(err.into()),
                Disposition::Benign => {
                    info!("{}", err);
                    Ok(RestoreOutcome::Miss)
                }
                Disposition::Warn => {
                    warn!("{}", err);
                    Ok(RestoreOutcome::Miss)
                }
            }
        }
    }
}
