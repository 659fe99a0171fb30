//! Cache key resolution and restore/save decisions
//!
//! The pieces a pipeline step composes:
//!
//! - [`keys`]: primary key, restore keys and path set from the step inputs
//! - [`policy`]: whether a miss is fatal
//! - [`restore`] / [`save`] / [`check`]: orchestration against an
//!   [`ArtifactStore`](crate::store::ArtifactStore)
//! - [`classify`]: the failure policy shared by both orchestrators
//! - [`state`]: values carried from the restore step to the save step
//! - [`outputs`]: values exposed to later pipeline steps
//!
//! # Failure handling
//!
//! | Failure | Restore (required) | Restore (optional) | Save |
//! |---------|--------------------|--------------------|------|
//! | Validation | fatal | fatal | fatal |
//! | Reservation conflict | fatal | warning | skipped |
//! | Anything else | fatal | warning | warning |

pub mod check;
pub mod classify;
pub mod keys;
pub mod outputs;
pub mod policy;
pub mod restore;
pub mod save;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use check::check;
pub use classify::{classify, decide, Disposition, ErrorClass, Phase};
pub use keys::{
    resolve, resolve_paths, resolve_primary_key, CacheKey, CachePaths, ResolvedKeys, RestoreKeys,
};
pub use outputs::Outputs;
pub use policy::{is_cache_required, Policy};
pub use restore::{restore, RestoreOutcome};
pub use save::{save, SaveOutcome, SkipReason};
pub use state::{detect_run_id, state_scope, RunState, RunStateStore};
