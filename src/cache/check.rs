//! Existence check without transfer

use crate::cache::keys::{CacheKey, CachePaths};
use crate::error::CachegateResult;
use crate::store::ArtifactStore;
use tracing::info;

/// Ask the store whether an entry exists for exactly `key`
///
/// Store failures are always fatal here: there is no policy input for a
/// check.
pub async fn check(
    store: &dyn ArtifactStore,
    key: &CacheKey,
    paths: &CachePaths,
) -> CachegateResult<bool> {
    let available = store.exists(paths, key).await?;

    if available {
        info!("Cache available for input key: {}", key);
    } else {
        info!("Cache missing for input key: {}", key);
    }

    Ok(available)
}
