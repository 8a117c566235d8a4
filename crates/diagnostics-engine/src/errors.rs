//! Error types for the diagnostics-engine crate

use report_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for diagnostics engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Metadata or a report could not be read or parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to read configuration {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("The checker is disabled")]
    Disabled,

    #[error("No output folder is configured")]
    NoOutputFolder,
}
