//! Fixture writers for analyzer output.
//!
//! Tests across the workspace build metadata files and plist reports with these
//! builders instead of checking in generated analyzer output.

pub mod metadata;
pub mod output_dir;
pub mod plist;

pub use metadata::MetadataFixture;
pub use output_dir::TestOutputDir;
pub use plist::{DiagnosticFixture, EventFixture, Loc, ReportFixture};
