//! Restore command - restore the cache and record the keys for save

use crate::cache::{self, state_scope, Policy, RestoreOutcome, RunState};
use crate::cli::args::RestoreArgs;
use crate::cli::commands::StepContext;
use crate::config::Config;
use crate::error::CachegateResult;
use crate::ui::{TaskSpinner, UiContext};
use tracing::{debug, warn};

/// Execute the restore command
///
/// `cache-primary-key` is emitted before the store is contacted and the run
/// state is persisted whatever the outcome, so a later save step still finds
/// the key after a failed restore.
pub async fn execute(args: RestoreArgs, config: &Config, ui: &UiContext) -> CachegateResult<()> {
    let inputs = args.inputs();
    let keys = cache::resolve(&inputs)?;
    let policy = Policy::from_inputs(&inputs);

    let ctx = StepContext::new(&args.step, config);
    let store = ctx.store();
    let runs = ctx.runs();

    // A restore starts the lifecycle of its path set; state left by an
    // unfinished earlier attempt is replaced
    let mut state = RunState::new(ctx.run_id(), state_scope(&keys.paths));
    let stale = runs.file_path(&state.run_id, &state.scope);
    if stale.exists() {
        debug!("Replacing stale run state {}", stale.display());
    }
    let mut outputs = ctx.outputs();

    outputs.set_primary_key(&keys.primary_key).await?;

    let mut spinner = TaskSpinner::new(ui);
    spinner.start(&format!("Restoring cache for {}...", keys.primary_key));

    let result = cache::restore(store.as_ref(), &mut state, &keys, policy).await;

    if let Err(e) = runs.save(&state).await {
        if result.is_ok() {
            spinner.stop_error("Failed to record run state");
            return Err(e);
        }
        warn!("Failed to record run state: {}", e);
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Cache restore failed");
            return Err(e);
        }
    };

    // the orchestrator already logged the outcome with its key
    match &outcome {
        RestoreOutcome::ExactHit(_) => spinner.stop("Restored (exact hit)"),
        RestoreOutcome::FallbackHit(_) => spinner.stop("Restored (fallback hit)"),
        RestoreOutcome::Miss => spinner.stop_warn("Nothing restored"),
    }

    if let Some(matched_key) = outcome.matched_key() {
        outputs.set_matched_key(matched_key).await?;
    }
    outputs.set_cache_hit(outcome.is_cache_hit()).await
}
