//! Logging initialization for the checker front ends.
//!
//! Two modes are supported:
//! - Cli: human-readable logs on STDERR, so command output on STDOUT stays clean.
//! - File: JSON lines written to a rolling file inside the given directory.
//!
//! Rolled files are capped at 5 MB each and compressed on rotation. At most 20
//! rotated files are kept.

use anyhow::{Context, Result};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

const LOG_FILE_NAME: &str = "cclens.log";
const MAX_LOG_FILE_BYTES: usize = 5 * 1024 * 1024;
const MAX_ROTATED_FILES: usize = 20;

pub enum LogMode {
    Cli,
    File { log_dir: PathBuf },
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = env_filter(verbose);

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
        LogMode::File { log_dir } => {
            std::fs::create_dir_all(&log_dir).with_context(|| {
                format!("Failed to create log directory {}", log_dir.display())
            })?;

            let writer = FileRotate::new(
                log_dir.join(LOG_FILE_NAME),
                AppendCount::new(MAX_ROTATED_FILES),
                ContentLimit::Bytes(MAX_LOG_FILE_BYTES),
                Compression::OnRotate(1),
                None,
            );

            let (non_blocking, guard) = tracing_appender::non_blocking(writer);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.with_max_level(tracing::Level::DEBUG))
                .with_ansi(false)
                .json()
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![guard],
            }))
        }
    }
}
