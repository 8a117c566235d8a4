use crate::errors::{ParseError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A position inside a report, as written by the analyzer.
///
/// `file` indexes into the owning report's [`SourceFiles`]; `line` and `col` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub col: u32,
    pub file: usize,
}

/// The ordered list of source files referenced by one report.
///
/// Every diagnostic parsed from the same report holds a clone of the same `Arc`,
/// so file-index lookups agree across all entries of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles(Arc<[PathBuf]>);

impl SourceFiles {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self(files.into())
    }

    pub fn resolve(&self, location: &Location) -> Option<&Path> {
        self.0.get(location.file).map(PathBuf::as_path)
    }

    /// True when both handles point to the same underlying list.
    pub fn ptr_eq(&self, other: &SourceFiles) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for SourceFiles {
    type Target = [PathBuf];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEdge {
    #[serde(default)]
    pub start: Vec<Location>,
    #[serde(default)]
    pub end: Vec<Location>,
}

/// A visible step of a diagnostic's causal path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEvent {
    pub location: Location,
    pub message: String,
    #[serde(default)]
    pub extended_message: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
    /// Highlighted source ranges, each as an inclusive `(start, end)` pair
    #[serde(default)]
    pub ranges: Option<Vec<(Location, Location)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// Branch and edge markers; never rendered
    Control(Vec<ControlEdge>),
    Event(PathEvent),
}

impl PathElement {
    pub fn as_event(&self) -> Option<&PathEvent> {
        match self {
            PathElement::Event(event) => Some(event),
            PathElement::Control(_) => None,
        }
    }
}

/// One finding of the analyzer
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub description: String,
    pub category: String,
    pub kind: String,
    pub check_name: Option<String>,
    pub issue_hash: Option<String>,
    pub location: Location,
    pub path: Vec<PathElement>,
    files: SourceFiles,
}

impl DiagnosticEntry {
    pub fn files(&self) -> &SourceFiles {
        &self.files
    }

    /// Absolute path of the file a location of this entry points into
    pub fn file_of(&self, location: &Location) -> Option<&Path> {
        self.files.resolve(location)
    }

    /// The `Event` elements of the path, in order
    pub fn events(&self) -> impl Iterator<Item = &PathEvent> {
        self.path.iter().filter_map(PathElement::as_event)
    }

    pub fn event_count(&self) -> usize {
        self.events().count()
    }

    /// The event that marks the bug itself.
    ///
    /// By convention this is the event whose message repeats the description. Reports
    /// that break the convention fall back to the last event.
    pub fn bug_event(&self) -> Option<&PathEvent> {
        self.events()
            .find(|event| event.message == self.description)
            .or_else(|| self.events().last())
    }
}

#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub path: PathBuf,
    pub files: SourceFiles,
    /// Name of the analyzer that produced the report, when the report records it
    pub analyzer_name: Option<String>,
    pub diagnostics: Vec<Arc<DiagnosticEntry>>,
}

#[derive(Deserialize)]
struct RawReport {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    diagnostics: Vec<RawDiagnostic>,
    #[serde(default)]
    metadata: Option<RawReportMetadata>,
}

#[derive(Deserialize)]
struct RawReportMetadata {
    #[serde(default)]
    analyzer: Option<RawAnalyzer>,
}

#[derive(Deserialize)]
struct RawAnalyzer {
    name: String,
}

#[derive(Deserialize)]
struct RawDiagnostic {
    description: String,
    #[serde(default)]
    category: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    check_name: Option<String>,
    #[serde(default)]
    issue_hash_content_of_line_in_context: Option<String>,
    location: Location,
    #[serde(default)]
    path: Vec<RawPathElement>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawPathElement {
    Control {
        #[serde(default)]
        edges: Vec<ControlEdge>,
    },
    Event(PathEvent),
    #[serde(other)]
    Unknown,
}

/// Reads and parses one analysis report from disk.
pub async fn parse_report(path: &Path) -> Result<ParsedReport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParseError::from_io(path, e))?;

    parse_report_str(path, &content)
}

/// Parses the plist content of a report. `path` is recorded, not read.
pub fn parse_report_str(path: &Path, content: &str) -> Result<ParsedReport> {
    let raw: RawReport = plist::from_bytes(content.as_bytes())?;

    let files = SourceFiles::new(raw.files.into_iter().map(PathBuf::from).collect());
    let mut diagnostics = Vec::with_capacity(raw.diagnostics.len());

    for raw_diagnostic in raw.diagnostics {
        let entry = build_entry(raw_diagnostic, &files)?;
        diagnostics.push(Arc::new(entry));
    }

    Ok(ParsedReport {
        path: path.to_path_buf(),
        files,
        analyzer_name: raw.metadata.and_then(|m| m.analyzer).map(|a| a.name),
        diagnostics,
    })
}

fn build_entry(raw: RawDiagnostic, files: &SourceFiles) -> Result<DiagnosticEntry> {
    check_location(&raw.location, files)?;

    let mut path = Vec::with_capacity(raw.path.len());
    for element in raw.path {
        match element {
            RawPathElement::Control { edges } => path.push(PathElement::Control(edges)),
            RawPathElement::Event(event) => {
                check_location(&event.location, files)?;
                for (start, end) in event.ranges.iter().flatten() {
                    check_location(start, files)?;
                    check_location(end, files)?;
                }
                path.push(PathElement::Event(event));
            }
            RawPathElement::Unknown => {
                debug!(
                    "Ignoring path element of unknown kind in diagnostic {:?}",
                    raw.description
                );
            }
        }
    }

    Ok(DiagnosticEntry {
        description: raw.description,
        category: raw.category,
        kind: raw.kind,
        check_name: raw.check_name,
        issue_hash: raw.issue_hash_content_of_line_in_context,
        location: raw.location,
        path,
        files: files.clone(),
    })
}

fn check_location(location: &Location, files: &SourceFiles) -> Result<()> {
    if location.file < files.len() {
        Ok(())
    } else {
        Err(ParseError::InvalidFileIndex {
            index: location.file,
            file_count: files.len(),
        })
    }
}
