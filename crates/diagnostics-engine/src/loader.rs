use async_trait::async_trait;
use report_parser::{Metadata, ParsedReport, parse_metadata, parse_report};
use std::path::Path;

/// The engine's only way of reading analyzer output.
///
/// Implementations must report a missing file as [`report_parser::ParseError::NotFound`]
/// so that "no run yet" is not mistaken for a broken run.
#[async_trait]
pub trait ReportLoader: Send + Sync {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata>;

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport>;
}

/// Reads metadata and reports from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReportLoader;

#[async_trait]
impl ReportLoader for FsReportLoader {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata> {
        parse_metadata(path).await
    }

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport> {
        parse_report(path).await
    }
}
