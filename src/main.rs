//! cachegate - Cache restore/save steps for CI pipelines
//!
//! CLI entry point that dispatches to subcommands.

use cachegate::cli::{Cli, Commands};
use cachegate::config::{ConfigManager, LogFormat};
use cachegate::error::CachegateResult;
use cachegate::ui::UiContext;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CachegateResult<()> {
    let cli = Cli::parse();

    // Load configuration first: it picks the log format
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = info (step outcomes are always reported), 1 = debug, 2+ = trace
    let filter = match cli.verbose {
        0 => EnvFilter::new("cachegate=info"),
        1 => EnvFilter::new("cachegate=debug"),
        _ => EnvFilter::new("cachegate=trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    match config.general.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    let ui = UiContext::detect().with_quiet(cli.quiet);

    match cli.command {
        Commands::Key(args) => cachegate::cli::commands::key(args, &config).await,
        Commands::Check(args) => cachegate::cli::commands::check(args, &config, &ui).await,
        Commands::Restore(args) => cachegate::cli::commands::restore(args, &config, &ui).await,
        Commands::Save(args) => cachegate::cli::commands::save(args, &config, &ui).await,
        Commands::Config(args) => {
            cachegate::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
