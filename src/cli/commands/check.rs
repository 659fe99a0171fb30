//! Check command - look up the primary key without transferring anything

use crate::cache::{self, resolve_paths, resolve_primary_key};
use crate::cli::args::CheckArgs;
use crate::cli::commands::StepContext;
use crate::config::Config;
use crate::error::CachegateResult;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config, ui: &UiContext) -> CachegateResult<()> {
    let inputs = args.inputs();
    let key = resolve_primary_key(&inputs)?;
    let paths = resolve_paths(&inputs)?;

    let ctx = StepContext::new(&args.step, config);
    let store = ctx.store();
    let mut outputs = ctx.outputs();
    outputs.set_primary_key(&key).await?;

    let mut spinner = TaskSpinner::new(ui);
    spinner.start(&format!("Checking cache for {}...", key));

    let available = match cache::check(store.as_ref(), &key, &paths).await {
        Ok(available) => available,
        Err(e) => {
            spinner.stop_error("Cache check failed");
            return Err(e);
        }
    };

    if available {
        spinner.stop("Available");
    } else {
        spinner.stop_warn("Missing");
    }

    outputs.set_cache_hit(available).await
}
