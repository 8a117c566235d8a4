//! # Report Parser
//!
//! Readers for the two kinds of files an analyzer run leaves in its output folder:
//!
//! - `metadata.json`, describing the run and which report belongs to which source file
//! - one plist report per translation unit, holding the diagnostics and their paths
//!
//! Both readers distinguish a missing file ([`ParseError::NotFound`]) from every other
//! failure so that callers can treat "no run yet" as an empty state.

pub mod errors;
pub mod metadata;
pub mod report;

pub use errors::{ParseError, Result};
pub use metadata::{
    AnalyzerMetadata, AnalyzerStatistics, CommandLine, METADATA_SCHEMA_VERSION, Metadata,
    RunTimestamps, parse_metadata, parse_metadata_str,
};
pub use report::{
    ControlEdge, DiagnosticEntry, Location, ParsedReport, PathElement, PathEvent, SourceFiles,
    parse_report, parse_report_str,
};
