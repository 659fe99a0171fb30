//! Store factory
//!
//! Picks the backend named in the configuration.

use crate::config::{Config, ConfigManager, StoreBackend};
use crate::store::local::LocalStore;
use crate::store::ArtifactStore;
use std::path::PathBuf;
use tracing::debug;

/// Create the artifact store for a configuration
///
/// # Arguments
/// * `config` - The application configuration
/// * `root_override` - Store root given on the command line, if any
pub fn create_store(config: &Config, root_override: Option<PathBuf>) -> Box<dyn ArtifactStore> {
    match config.store.backend {
        StoreBackend::Local => {
            let root = root_override.unwrap_or_else(|| ConfigManager::store_dir_for(config));
            debug!("Using local store at {}", root.display());
            Box::new(LocalStore::new(root))
        }
    }
}
