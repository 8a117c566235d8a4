use crate::diagnostics::DiagnosticsApi;
use crate::location::{FilePosition, Position};
use crate::repro_path::ReproductionPath;
use report_parser::{DiagnosticEntry, Location};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpStatus {
    Found,
    /// The bug index did not resolve; the target is the requested file
    BugNotFound,
    /// The step index did not resolve; the target is the bug location
    StepNotFound,
}

/// Where the caller should move the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub file: PathBuf,
    /// `None` opens the file without moving the cursor
    pub position: Option<Position>,
}

impl NavigationTarget {
    fn at(entry: &DiagnosticEntry, location: &Location) -> Option<Self> {
        entry.file_of(location).map(|file| Self {
            file: file.to_path_buf(),
            position: Some(Position::from_report(location)),
        })
    }

    fn file_only(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            position: None,
        }
    }
}

impl From<FilePosition> for NavigationTarget {
    fn from(value: FilePosition) -> Self {
        Self {
            file: value.file,
            position: Some(value.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jump {
    pub target: NavigationTarget,
    pub status: JumpStatus,
}

/// Editor commands over the diagnostics of the working set
pub struct NavigationHandler {
    diagnostics: Arc<DiagnosticsApi>,
}

impl NavigationHandler {
    pub fn new(diagnostics: Arc<DiagnosticsApi>) -> Self {
        Self { diagnostics }
    }

    /// Expands `file`'s diagnostic `bug_index`, or collapses it when it is already the
    /// active one. `target_state` forces one or the other. Returns whether the
    /// selection changed.
    pub fn toggle_steps(&self, file: &Path, bug_index: usize, target_state: Option<bool>) -> bool {
        let expand = target_state.unwrap_or_else(|| {
            let requested = self.diagnostics.diagnostic(file, bug_index);
            let active = self.diagnostics.active_diagnostic();
            match (requested, active) {
                (Some(requested), Some((_, active))) => !Arc::ptr_eq(&requested, &active),
                _ => true,
            }
        });

        if expand {
            self.diagnostics.set_active_repr_path(file, bug_index)
        } else {
            self.diagnostics.clear_active_repr_path()
        }
    }

    /// Resolves the location of `file`'s diagnostic `bug_index`.
    ///
    /// With `keep_current_file`, jumping into another file pins `file` so its
    /// diagnostics stay loaded.
    pub async fn jump_to_bug(&self, file: &Path, bug_index: usize, keep_current_file: bool) -> Jump {
        let jump = match self.diagnostics.diagnostic(file, bug_index) {
            Some(entry) => match NavigationTarget::at(&entry, &entry.location) {
                Some(target) => Jump {
                    target,
                    status: JumpStatus::Found,
                },
                None => self.bug_not_found(file, bug_index),
            },
            None => self.bug_not_found(file, bug_index),
        };

        self.keep_file(file, &jump.target, keep_current_file).await;
        jump
    }

    /// Resolves event `step_index` of `file`'s diagnostic `bug_index`. The terminal
    /// event counts as the last step.
    pub async fn jump_to_step(
        &self,
        file: &Path,
        bug_index: usize,
        step_index: usize,
        keep_current_file: bool,
    ) -> Jump {
        let Some(entry) = self.diagnostics.diagnostic(file, bug_index) else {
            let jump = self.bug_not_found(file, bug_index);
            self.keep_file(file, &jump.target, keep_current_file).await;
            return jump;
        };

        let path = ReproductionPath::new(&entry);
        let step_target = path
            .events()
            .get(step_index)
            .and_then(|step| NavigationTarget::at(&entry, &step.location));

        let jump = match step_target {
            Some(target) => Jump {
                target,
                status: JumpStatus::Found,
            },
            None => {
                warn!(
                    "Unable to find reproduction step {step_index} of {}#{bug_index}, using its bug instead",
                    file.display()
                );
                Jump {
                    target: NavigationTarget::at(&entry, &entry.location)
                        .unwrap_or_else(|| NavigationTarget::file_only(file)),
                    status: JumpStatus::StepNotFound,
                }
            }
        };

        self.keep_file(file, &jump.target, keep_current_file).await;
        jump
    }

    /// Moves from the event under the cursor to the following one of the active path
    pub fn next_step(&self, cursor: &FilePosition) -> Option<NavigationTarget> {
        let (_, entry) = self.diagnostics.active_diagnostic()?;
        let path = ReproductionPath::new(&entry);
        let idx = path.next_event(cursor)?;
        path.resolve(&path.events()[idx].location).map(Into::into)
    }

    /// Moves from the event under the cursor to the preceding one of the active path
    pub fn previous_step(&self, cursor: &FilePosition) -> Option<NavigationTarget> {
        let (_, entry) = self.diagnostics.active_diagnostic()?;
        let path = ReproductionPath::new(&entry);
        let idx = path.previous_event(cursor)?;
        path.resolve(&path.events()[idx].location).map(Into::into)
    }

    fn bug_not_found(&self, file: &Path, bug_index: usize) -> Jump {
        warn!(
            "Unable to find bug {}#{bug_index}, opening its file instead",
            file.display()
        );
        Jump {
            target: NavigationTarget::file_only(file),
            status: JumpStatus::BugNotFound,
        }
    }

    async fn keep_file(&self, file: &Path, target: &NavigationTarget, keep_current_file: bool) {
        if keep_current_file && target.file != file {
            debug!("Keeping {} loaded while navigating away", file.display());
            self.diagnostics.set_sticky_file(file).await;
        }
    }
}
