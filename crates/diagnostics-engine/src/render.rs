use crate::diagnostics::DiagnosticsApi;
use crate::location::Range;
use crate::repro_path::{RelatedLink, ReproductionPath};
use report_parser::{DiagnosticEntry, PathEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub const DIAGNOSTIC_SOURCE: &str = "CodeChecker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Information,
}

/// One squiggle as an editor would show it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDiagnostic {
    pub message: String,
    pub range: Range,
    pub severity: Severity,
    pub related: Vec<RelatedLink>,
    pub source: &'static str,
}

/// File to the diagnostics it should now display. An empty list clears the file.
pub type RenderedFiles = BTreeMap<PathBuf, Vec<RenderedDiagnostic>>;

/// Projects the working set into per-file editor diagnostics.
///
/// Each diagnostic is shown at its bug event, except the active one, which is shown
/// with its whole reproduction path. Files rendered last time but not visible any more
/// receive an empty list.
pub struct DiagnosticRenderer {
    diagnostics: Arc<DiagnosticsApi>,
    last_rendered: Mutex<Vec<PathBuf>>,
}

impl DiagnosticRenderer {
    pub fn new(diagnostics: Arc<DiagnosticsApi>) -> Self {
        Self {
            diagnostics,
            last_rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn render(&self, visible_files: &[PathBuf]) -> RenderedFiles {
        let mut shown: Vec<PathBuf> = visible_files.to_vec();
        if let Some(sticky) = self.diagnostics.sticky_file() {
            shown.push(sticky);
        }

        let mut rendered: RenderedFiles = shown
            .iter()
            .map(|file| (file.clone(), Vec::new()))
            .collect();

        let with_data: Vec<&Path> = shown
            .iter()
            .map(PathBuf::as_path)
            .filter(|file| self.diagnostics.has_diagnostics(file))
            .collect();
        let active = self
            .diagnostics
            .active_diagnostic()
            .map(|(_, entry)| entry);

        for entry in self.diagnostics.diagnostics_for_any(&with_data) {
            if active
                .as_ref()
                .is_some_and(|active| Arc::ptr_eq(active, &entry))
            {
                continue;
            }
            render_primary(&mut rendered, &entry);
        }

        if let Some(active) = &active {
            render_reproduction_path(&mut rendered, active);
        }

        let updated: Vec<PathBuf> = rendered.keys().cloned().collect();
        {
            let mut last = self
                .last_rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for closed in last.iter() {
                rendered.entry(closed.clone()).or_default();
            }
            *last = updated;
        }

        rendered
    }
}

fn render_primary(rendered: &mut RenderedFiles, entry: &DiagnosticEntry) {
    let Some(bug) = entry.bug_event() else {
        debug!("Diagnostic {:?} has no events to render", entry.description);
        return;
    };

    let path = ReproductionPath::new(entry);
    let mut links = Vec::new();
    path.push_origin_link(&mut links, bug);
    render_event(rendered, entry, bug, Severity::Error, links);
}

fn render_reproduction_path(rendered: &mut RenderedFiles, entry: &DiagnosticEntry) {
    let path = ReproductionPath::new(entry);
    let Some(terminal) = path.terminal() else {
        return;
    };

    render_event(rendered, entry, terminal, Severity::Error, path.terminal_links());
    for (idx, step) in path.steps().iter().enumerate() {
        render_event(
            rendered,
            entry,
            step,
            Severity::Information,
            path.step_links(idx),
        );
    }
}

fn render_event(
    rendered: &mut RenderedFiles,
    entry: &DiagnosticEntry,
    event: &PathEvent,
    severity: Severity,
    related: Vec<RelatedLink>,
) {
    let Some(file) = entry.file_of(&event.location) else {
        return;
    };

    let diagnostics = rendered.entry(file.to_path_buf()).or_default();
    for (_, range) in ReproductionPath::event_ranges(event) {
        diagnostics.push(RenderedDiagnostic {
            message: event.message.clone(),
            range,
            severity,
            related: related.clone(),
            source: DIAGNOSTIC_SOURCE,
        });
    }
}
