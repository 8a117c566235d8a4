use report_parser::ParsedReport;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source file to the cached reports that actually mention it.
///
/// Unlike [`crate::MetadataIndex`] this follows the parsed `files` lists, so a header
/// pulled in by a translation unit is indexed under every report that includes it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceIndex {
    generation: u64,
    by_source: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl SourceIndex {
    /// Indexes `reports`, which are expected in report-path order
    pub fn build(generation: u64, reports: &[Arc<ParsedReport>]) -> Self {
        let mut by_source: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

        for report in reports {
            for file in report.files.iter() {
                let entry = by_source.entry(file.clone()).or_default();
                if entry.last() != Some(&report.path) {
                    entry.push(report.path.clone());
                }
            }
        }

        Self {
            generation,
            by_source,
        }
    }

    /// Reconcile generation this index was built from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reports_for(&self, source_file: &Path) -> &[PathBuf] {
        self.by_source
            .get(source_file)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, source_file: &Path) -> bool {
        self.by_source.contains_key(source_file)
    }

    pub fn source_files(&self) -> impl Iterator<Item = &Path> {
        self.by_source.keys().map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}
