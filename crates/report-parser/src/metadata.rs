use crate::errors::{ParseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// The only metadata schema version this crate understands
pub const METADATA_SCHEMA_VERSION: u64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerStatistics {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub failed_sources: Vec<String>,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub successful_sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerMetadata {
    /// Checker name to enabled flag
    #[serde(default)]
    pub checkers: BTreeMap<String, bool>,
    #[serde(default)]
    pub analyzer_statistics: AnalyzerStatistics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTimestamps {
    /// Seconds since the Unix epoch
    pub begin: f64,
    pub end: f64,
}

/// The analyzer writes the command either as one string or as an argument list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Args(Vec<String>),
}

impl Default for CommandLine {
    fn default() -> Self {
        CommandLine::Args(Vec::new())
    }
}

impl CommandLine {
    pub fn args(&self) -> Vec<String> {
        match self {
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Args(args) => args.clone(),
        }
    }
}

/// Descriptor of one analyzer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub timestamps: RunTimestamps,
    #[serde(default)]
    pub command: CommandLine,
    /// Version of the tool that produced the run
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default)]
    pub output_path: String,
    /// Analysis report path to the source file it was produced for
    #[serde(default)]
    pub result_source_files: BTreeMap<String, String>,
    #[serde(default)]
    pub analyzers: BTreeMap<String, AnalyzerMetadata>,
    #[serde(default)]
    pub action_num: u64,
    #[serde(default)]
    pub skipped: u64,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    version: u64,
    #[serde(default)]
    tools: Vec<Metadata>,
}

/// Reads `metadata.json` and returns the first analyzer run it describes.
pub async fn parse_metadata(path: &Path) -> Result<Metadata> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParseError::from_io(path, e))?;

    parse_metadata_str(&content)
}

pub fn parse_metadata_str(content: &str) -> Result<Metadata> {
    let file: MetadataFile = serde_json::from_str(content)?;

    if file.version != METADATA_SCHEMA_VERSION {
        return Err(ParseError::UnsupportedVersion {
            found: file.version,
            expected: METADATA_SCHEMA_VERSION,
        });
    }

    let run_count = file.tools.len();
    let metadata = file.tools.into_iter().next().ok_or(ParseError::NoRuns)?;
    if run_count > 1 {
        warn!(
            "Metadata describes {} runs, only {:?} is used",
            run_count, metadata.name
        );
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::metadata::MetadataFixture;

    #[test]
    fn test_parse_metadata() {
        let json = MetadataFixture::new("codechecker")
            .report("/out/unit1.plist", "/src/main.cpp")
            .report("/out/unit2.plist", "/src/util.cpp")
            .analyzer("clangsa")
            .timestamps(1_600_000_000.0, 1_600_000_042.5)
            .to_json();

        let metadata = parse_metadata_str(&json).unwrap();
        assert_eq!(metadata.name, "codechecker");
        assert_eq!(metadata.result_source_files.len(), 2);
        assert_eq!(
            metadata.result_source_files["/out/unit1.plist"],
            "/src/main.cpp"
        );
        assert!(metadata.analyzers.contains_key("clangsa"));
        assert_eq!(metadata.timestamps.end, 1_600_000_042.5);
    }

    #[test]
    fn test_command_line_forms() {
        let line: CommandLine = serde_json::from_str("\"CodeChecker analyze -o out\"").unwrap();
        let args: CommandLine = serde_json::from_str("[\"CodeChecker\", \"analyze\"]").unwrap();

        assert_eq!(line.args(), vec!["CodeChecker", "analyze", "-o", "out"]);
        assert_eq!(args.args(), vec!["CodeChecker", "analyze"]);
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = parse_metadata_str(r#"{"version": 1, "tools": []}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnsupportedVersion {
                found: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn test_rejects_empty_tool_list() {
        let err = parse_metadata_str(r#"{"version": 2, "tools": []}"#).unwrap_err();
        assert!(matches!(err, ParseError::NoRuns));
    }

    #[tokio::test]
    async fn test_missing_metadata_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = parse_metadata(&dir.path().join("metadata.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
