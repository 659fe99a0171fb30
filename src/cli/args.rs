//! CLI argument definitions using clap derive

use crate::inputs::{names, Inputs};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// cachegate - Cache restore/save steps for CI pipelines
///
/// Each subcommand is one pipeline step. Step inputs come from flags or from
/// `INPUT_<NAME>` environment variables.
#[derive(Parser, Debug)]
#[command(name = "cachegate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CACHEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress progress spinners
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the primary cache key and emit it
    Key(KeyArgs),

    /// Check whether an entry exists for the primary key
    Check(CheckArgs),

    /// Restore the cache, falling back to restore keys
    Restore(RestoreArgs),

    /// Save the cache under the primary key
    Save(SaveArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Options shared by every pipeline step
#[derive(Args, Debug, Clone, Default)]
pub struct StepArgs {
    /// Identifier tying the restore and save steps of one run together
    #[arg(long, env = "CACHEGATE_RUN_ID")]
    pub run_id: Option<String>,

    /// File to append step outputs to (stdout if unset)
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,

    /// Local store root (overrides config)
    #[arg(long, env = "CACHEGATE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Run state directory (overrides config)
    #[arg(long, env = "CACHEGATE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Primary cache key
    #[arg(short, long)]
    pub key: Option<String>,

    #[command(flatten)]
    pub step: StepArgs,
}

impl KeyArgs {
    /// Step inputs with flags overlaid on the environment
    pub fn inputs(&self) -> Inputs {
        overlay(Inputs::from_env(), names::KEY, self.key.clone())
    }
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Primary cache key
    #[arg(short, long)]
    pub key: Option<String>,

    /// Path to cache (repeatable)
    #[arg(short, long)]
    pub path: Vec<String>,

    #[command(flatten)]
    pub step: StepArgs,
}

impl CheckArgs {
    pub fn inputs(&self) -> Inputs {
        let inputs = overlay(Inputs::from_env(), names::KEY, self.key.clone());
        overlay(inputs, names::PATH, join_lines(&self.path))
    }
}

/// Arguments for the restore command
#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Primary cache key
    #[arg(short, long)]
    pub key: Option<String>,

    /// Path to restore into (repeatable)
    #[arg(short, long)]
    pub path: Vec<String>,

    /// Fallback key prefix, tried in order (repeatable)
    #[arg(short, long = "restore-key")]
    pub restore_keys: Vec<String>,

    /// Fail on a miss unless set to "false"
    #[arg(long, value_name = "BOOL")]
    pub required: Option<String>,

    #[command(flatten)]
    pub step: StepArgs,
}

impl RestoreArgs {
    pub fn inputs(&self) -> Inputs {
        let inputs = overlay(Inputs::from_env(), names::KEY, self.key.clone());
        let inputs = overlay(inputs, names::PATH, join_lines(&self.path));
        let inputs = overlay(inputs, names::RESTORE_KEYS, join_lines(&self.restore_keys));
        overlay(inputs, names::REQUIRED, self.required.clone())
    }
}

/// Arguments for the save command
#[derive(Parser, Debug)]
pub struct SaveArgs {
    /// Primary cache key (defaults to the key recorded by restore)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Path to save (repeatable)
    #[arg(short, long)]
    pub path: Vec<String>,

    /// Copy buffer size in bytes
    #[arg(long)]
    pub upload_chunk_size: Option<u64>,

    #[command(flatten)]
    pub step: StepArgs,
}

impl SaveArgs {
    pub fn inputs(&self) -> Inputs {
        let inputs = overlay(Inputs::from_env(), names::KEY, self.key.clone());
        let inputs = overlay(inputs, names::PATH, join_lines(&self.path));
        overlay(
            inputs,
            names::UPLOAD_CHUNK_SIZE,
            self.upload_chunk_size.map(|size| size.to_string()),
        )
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn overlay(inputs: Inputs, name: &str, value: Option<String>) -> Inputs {
    match value {
        Some(value) => inputs.with(name, value),
        None => inputs,
    }
}

/// Repeated flags become one newline-separated input, `None` when absent
fn join_lines(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join("\n"))
    }
}
