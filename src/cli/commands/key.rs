//! Key command - resolve and emit the primary cache key

use crate::cache::resolve_primary_key;
use crate::cli::args::KeyArgs;
use crate::cli::commands::StepContext;
use crate::config::Config;
use crate::error::CachegateResult;
use tracing::debug;

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> CachegateResult<()> {
    let key = resolve_primary_key(&args.inputs())?;
    debug!("Resolved primary key: {}", key);

    let mut outputs = StepContext::new(&args.step, config).outputs();
    outputs.set_primary_key(&key).await
}
