use crate::metadata::MetadataFixture;
use crate::plist::ReportFixture;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Temporary analyzer output folder: metadata.json plus plist reports.
// example usage:
// ```rust,ignore
// let out = TestOutputDir::new();
// let report = out.write_report("unit1.plist", &ReportFixture::new(["/src/main.cpp"]));
// out.write_metadata(&MetadataFixture::new("codechecker").report(report.to_str().unwrap(), "/src/main.cpp"));
// ```
pub struct TestOutputDir {
    dir: TempDir,
}

impl TestOutputDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path a report with the given file name would have
    pub fn report_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_report(&self, name: &str, report: &ReportFixture) -> PathBuf {
        self.write_raw(name, &report.to_xml())
    }

    pub fn write_metadata(&self, metadata: &MetadataFixture) -> PathBuf {
        self.write_raw("metadata.json", &metadata.to_json())
    }

    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write fixture file");
        path
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.dir.path().join(name)).expect("Failed to remove fixture file");
    }
}

impl Default for TestOutputDir {
    fn default() -> Self {
        Self::new()
    }
}
