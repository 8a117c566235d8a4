//! Error types for the report-parser crate

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Everything that can go wrong while reading a metadata file or an analysis report
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file does not exist. Callers treat this as "no data yet".
    #[error("File not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Any other IO failure while reading the file
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report is not a property list, or its contents do not match the report schema
    #[error("Invalid report: {0}")]
    Plist(#[from] plist::Error),

    /// The metadata document did not match the expected schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported metadata version {found}, expected {expected}")]
    UnsupportedVersion { found: u64, expected: u64 },

    #[error("Metadata file does not contain any analyzer run")]
    NoRuns,

    /// A location points outside of the report's `files` list
    #[error("File index {index} out of range, report lists {file_count} files")]
    InvalidFileIndex { index: usize, file_count: usize },
}

impl ParseError {
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ParseError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ParseError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ParseError::NotFound { .. })
    }
}
