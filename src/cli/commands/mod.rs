//! CLI command implementations

pub mod check;
pub mod config;
pub mod key;
pub mod restore;
pub mod save;

pub use check::execute as check;
pub use config::execute as config;
pub use key::execute as key;
pub use restore::execute as restore;
pub use save::execute as save;

use crate::cache::{detect_run_id, Outputs, RunStateStore};
use crate::cli::args::StepArgs;
use crate::config::{Config, ConfigManager};
use crate::store::{create_store, ArtifactStore};

/// Collaborators of one pipeline step, built from flags and configuration
pub struct StepContext<'a> {
    step: &'a StepArgs,
    config: &'a Config,
}

impl<'a> StepContext<'a> {
    pub fn new(step: &'a StepArgs, config: &'a Config) -> Self {
        Self { step, config }
    }

    /// Artifact store for this step
    pub fn store(&self) -> Box<dyn ArtifactStore> {
        create_store(self.config, self.step.store_dir.clone())
    }

    /// Run state persistence, honoring `--state-dir`
    pub fn runs(&self) -> RunStateStore {
        let dir = match &self.step.state_dir {
            Some(state_dir) => state_dir.join("runs"),
            None => ConfigManager::runs_dir_for(self.config),
        };
        RunStateStore::new(dir)
    }

    pub fn run_id(&self) -> String {
        detect_run_id(self.step.run_id.as_deref())
    }

    /// Output sink: `--output-file` / `GITHUB_OUTPUT`, else stdout
    pub fn outputs(&self) -> Outputs {
        Outputs::new(self.step.output_file.clone())
    }
}
