//! Save command - save the cache under the primary key

use crate::cache::{self, resolve_paths, state_scope, CacheKey, SaveOutcome};
use crate::cli::args::SaveArgs;
use crate::cli::commands::StepContext;
use crate::config::Config;
use crate::error::{CachegateError, CachegateResult};
use crate::inputs::names;
use crate::ui::{TaskSpinner, UiContext};
use tracing::{debug, warn};

/// Execute the save command
pub async fn execute(args: SaveArgs, config: &Config, ui: &UiContext) -> CachegateResult<()> {
    let inputs = args.inputs();
    let paths = resolve_paths(&inputs)?;

    let ctx = StepContext::new(&args.step, config);
    let runs = ctx.runs();
    let run_id = ctx.run_id();
    let scope = state_scope(&paths);
    let state = runs.load(&run_id, &scope).await?;

    // An explicit key wins over the one recorded by restore
    let key = match inputs.get(names::KEY) {
        Some(key) => CacheKey::new(key)?,
        None => {
            let recorded = state
                .as_ref()
                .and_then(|state| state.primary_key())
                .ok_or_else(|| CachegateError::ConfigMissing(names::KEY.to_string()))?;
            debug!("Using primary key recorded for run {}", run_id);
            CacheKey::new(recorded)?
        }
    };
    let chunk_size = inputs
        .get_int(names::UPLOAD_CHUNK_SIZE)?
        .or(config.store.upload_chunk_size);

    let store = ctx.store();
    let mut spinner = TaskSpinner::new(ui);
    spinner.start(&format!("Saving cache for {}...", key));

    let outcome = match cache::save(store.as_ref(), &key, &paths, chunk_size).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Cache save failed");
            return Err(e);
        }
    };

    match &outcome {
        SaveOutcome::Saved => spinner.stop("Saved"),
        other => spinner.stop_warn(&format!("Cache {}", other)),
    }

    if state.is_some() {
        if let Err(e) = runs.delete(&run_id, &scope).await {
            warn!("Failed to discard run state: {}", e);
        }
    }

    Ok(())
}
