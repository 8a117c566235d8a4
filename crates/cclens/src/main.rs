mod cli;
mod commands;

use crate::cli::{Commands, LensCli};
use anyhow::{Context, Result};
use diagnostics_engine::{CheckerConfig, CheckerContext};
use logging::LogMode;
use std::path::{Path, PathBuf};
use tracing::debug;

fn load_config(cli: &LensCli) -> Result<CheckerConfig> {
    let mut config = match &cli.config {
        Some(path) => CheckerConfig::load(path)
            .with_context(|| format!("Could not load configuration {}", path.display()))?,
        None => CheckerConfig::default(),
    };

    if let Some(output) = &cli.output {
        config = config.with_output_folder(absolute(output)?);
    }
    config
        .validate()
        .context("Pass --output or set output_folder and enabled in the configuration")?;

    Ok(config)
}

/// Metadata stores absolute source paths, so user input is resolved against the
/// current directory first.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LensCli::parse_args();

    let mode = match &cli.log_dir {
        Some(log_dir) => LogMode::File {
            log_dir: log_dir.clone(),
        },
        None => LogMode::Cli,
    };
    let _guards = logging::init(mode, cli.verbose)?;

    let config = load_config(&cli)?;
    debug!("Using configuration {:?}", config);
    let context = CheckerContext::new(config);

    match cli.command {
        Commands::Summary => commands::summary::run(&context).await,
        Commands::Bugs {
            files,
            steps,
            json,
            expand,
        } => {
            let files = files
                .iter()
                .map(|file| absolute(file))
                .collect::<Result<Vec<_>>>()?;
            commands::bugs::run(
                &context,
                commands::bugs::BugsArgs {
                    files,
                    steps,
                    json,
                    expand,
                },
            )
            .await
        }
        Commands::List { sort } => commands::list::run(&context, sort.into()).await,
        Commands::Jump { file, bug, step } => {
            commands::jump::run(&context, &absolute(&file)?, bug, step).await
        }
        Commands::Reload => commands::reload::run(&context).await,
    }
}
