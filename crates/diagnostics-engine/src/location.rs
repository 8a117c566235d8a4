//! Editor-facing positions.
//!
//! Reports use 1-based lines and columns; everything here is 0-based.

use report_parser::Location;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    pub fn from_report(location: &Location) -> Self {
        Self {
            line: location.line.saturating_sub(1),
            character: location.col.saturating_sub(1),
        }
    }
}

/// Inclusive on both ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Converts a report range. The end column is kept as is, which makes the range
    /// cover the character the analyzer's end column points at.
    pub fn from_report(start: &Location, end: &Location) -> Self {
        Self {
            start: Position::from_report(start),
            end: Position {
                line: end.line.saturating_sub(1),
                character: end.col,
            },
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A position in a specific file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilePosition {
    pub file: PathBuf,
    pub position: Position,
}

impl FilePosition {
    pub fn new(file: impl Into<PathBuf>, position: Position) -> Self {
        Self {
            file: file.into(),
            position,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}
