use report_parser::Metadata;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Source file to the reports the analyzer declared for it.
///
/// Built by inverting the metadata's `result_source_files`. Relative report paths are
/// resolved against the directory holding the metadata file. Report lists are in
/// report-path order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetadataIndex {
    by_source: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl MetadataIndex {
    /// The index used when no analyzer run exists
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(metadata: &Metadata, base_dir: &Path) -> Self {
        let mut by_source: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

        let mut declared: Vec<(PathBuf, PathBuf)> = metadata
            .result_source_files
            .iter()
            .map(|(report, source)| (base_dir.join(report), PathBuf::from(source)))
            .collect();
        declared.sort();

        for (report, source) in declared {
            let reports = by_source.entry(source).or_default();
            if !reports.contains(&report) {
                reports.push(report);
            }
        }

        Self { by_source }
    }

    pub fn declared_reports_for(&self, source_file: &Path) -> &[PathBuf] {
        self.by_source
            .get(source_file)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every report declared for any of `source_files`
    pub fn required_reports<'a>(
        &self,
        source_files: impl IntoIterator<Item = &'a Path>,
    ) -> BTreeSet<PathBuf> {
        source_files
            .into_iter()
            .flat_map(|file| self.declared_reports_for(file).iter().cloned())
            .collect()
    }

    pub fn source_files(&self) -> impl Iterator<Item = &Path> {
        self.by_source.keys().map(PathBuf::as_path)
    }

    /// `(source file, declared reports)` pairs in source-path order
    pub fn entries(&self) -> impl Iterator<Item = (&Path, &[PathBuf])> {
        self.by_source
            .iter()
            .map(|(source, reports)| (source.as_path(), reports.as_slice()))
    }

    pub fn report_count(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}
