use crate::cache::{ReconcileOutcome, ReconcileReport, ReportCache};
use crate::metadata::MetadataApi;
use crate::source_index::SourceIndex;
use chrono::Utc;
use event_bus::types::report_failure::to_ts_report_failure;
use event_bus::{
    CheckerEvent, DiagnosticsUpdated, EventBus, FailureStage, ReportsFailed, TSActiveSelection,
};
use report_parser::DiagnosticEntry;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// The diagnostic whose reproduction path is expanded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveSelection {
    pub source_file: PathBuf,
    pub diagnostic_index: usize,
}

impl ActiveSelection {
    pub fn new(source_file: impl Into<PathBuf>, diagnostic_index: usize) -> Self {
        Self {
            source_file: source_file.into(),
            diagnostic_index,
        }
    }
}

/// How a working-set change ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    Applied {
        generation: u64,
        loaded: usize,
        evicted: usize,
        failed: usize,
    },
    Superseded,
}

#[derive(Default)]
struct DiagnosticsState {
    open_files: BTreeSet<PathBuf>,
    sticky_file: Option<PathBuf>,
    source_index: Arc<SourceIndex>,
    active: Option<ActiveSelection>,
}

impl DiagnosticsState {
    fn working_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.open_files.iter().cloned().collect();
        if let Some(sticky) = &self.sticky_file {
            if !self.open_files.contains(sticky) {
                files.push(sticky.clone());
            }
        }
        files
    }
}

/// Working-set resolver, diagnostic queries and the active reproduction selection.
///
/// This is the only component that reconciles the report cache or writes the source
/// index. Every applied working-set change and every selection change sends exactly one
/// `DiagnosticsUpdated` event.
pub struct DiagnosticsApi {
    cache: Arc<ReportCache>,
    metadata: Arc<MetadataApi>,
    events: EventBus,
    state: RwLock<DiagnosticsState>,
}

impl DiagnosticsApi {
    pub fn new(cache: Arc<ReportCache>, metadata: Arc<MetadataApi>, events: EventBus) -> Self {
        Self {
            cache,
            metadata,
            events,
            state: RwLock::new(DiagnosticsState::default()),
        }
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&DiagnosticsState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DiagnosticsState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    pub fn open_files(&self) -> Vec<PathBuf> {
        self.with_state(|state| state.open_files.iter().cloned().collect())
    }

    pub fn sticky_file(&self) -> Option<PathBuf> {
        self.with_state(|state| state.sticky_file.clone())
    }

    /// Open files plus the sticky file
    pub fn working_files(&self) -> Vec<PathBuf> {
        self.with_state(DiagnosticsState::working_files)
    }

    pub fn source_index(&self) -> Arc<SourceIndex> {
        self.with_state(|state| state.source_index.clone())
    }

    /// Replaces both the open files and the sticky file, then reconciles
    pub async fn set_working_files(
        &self,
        open_files: impl IntoIterator<Item = PathBuf>,
        sticky_file: Option<PathBuf>,
    ) -> ReconcileStatus {
        let open_files: BTreeSet<PathBuf> = open_files.into_iter().collect();
        self.with_state_mut(|state| {
            state.open_files = open_files;
            state.sticky_file = sticky_file;
        });
        self.reconcile(false).await
    }

    /// Replaces the open files and keeps the sticky file
    pub async fn set_open_files(
        &self,
        open_files: impl IntoIterator<Item = PathBuf>,
    ) -> ReconcileStatus {
        let open_files: BTreeSet<PathBuf> = open_files.into_iter().collect();
        self.with_state_mut(|state| state.open_files = open_files);
        self.reconcile(false).await
    }

    /// Pins a file into the working set. Always reconciles, even if the file is open.
    pub async fn set_sticky_file(&self, sticky_file: impl Into<PathBuf>) -> ReconcileStatus {
        let sticky_file = sticky_file.into();
        debug!("Pinning {} into the working set", sticky_file.display());
        self.with_state_mut(|state| state.sticky_file = Some(sticky_file));
        self.reconcile(false).await
    }

    pub async fn clear_sticky_file(&self) -> ReconcileStatus {
        self.with_state_mut(|state| state.sticky_file = None);
        self.reconcile(false).await
    }

    /// Follows a metadata reload.
    ///
    /// An active selection is dropped together with the sticky file, then every
    /// required report is parsed again.
    pub async fn on_metadata_reloaded(&self) -> ReconcileStatus {
        self.with_state_mut(|state| {
            if state.active.take().is_some() {
                debug!("Metadata reloaded, clearing active selection and sticky file");
                state.sticky_file = None;
            }
        });
        self.reconcile(true).await
    }

    /// Brings the cache in line with the working set and rebuilds the source index
    pub async fn reconcile(&self, force_reload: bool) -> ReconcileStatus {
        let working_files = self.working_files();
        let index = self.metadata.index();
        let required = index.required_reports(working_files.iter().map(PathBuf::as_path));

        match self.cache.reconcile(&required, force_reload).await {
            ReconcileOutcome::Superseded { generation } => {
                debug!("Dropping results of superseded reconcile #{generation}");
                ReconcileStatus::Superseded
            }
            ReconcileOutcome::Applied(report) => self.apply(report),
        }
    }

    fn apply(&self, report: ReconcileReport) -> ReconcileStatus {
        let source_index = Arc::new(SourceIndex::build(report.generation, &report.snapshot));

        let applied = self.with_state_mut(|state| {
            if source_index.generation() <= state.source_index.generation() {
                return false;
            }
            state.source_index = source_index;
            true
        });
        if !applied {
            return ReconcileStatus::Superseded;
        }

        let unreachable = self
            .active_selection()
            .filter(|active| self.diagnostic(&active.source_file, active.diagnostic_index).is_none());
        if let Some(active) = unreachable {
            info!(
                "Active diagnostic {}#{} is no longer reachable",
                active.source_file.display(),
                active.diagnostic_index
            );
            self.with_state_mut(|state| {
                if state.active.as_ref() == Some(&active) {
                    state.active = None;
                }
            });
        }

        if !report.failures.is_empty() {
            warn!("{} reports failed to parse", report.failures.len());
            self.events.send(&CheckerEvent::ReportsFailed(ReportsFailed {
                stage: FailureStage::Reconcile,
                failures: report
                    .failures
                    .iter()
                    .map(|failure| to_ts_report_failure(&failure.path, &failure.error))
                    .collect(),
                failed_at: Utc::now(),
            }));
        }

        self.notify(report.snapshot.iter().map(|r| r.path.clone()).collect());

        ReconcileStatus::Applied {
            generation: report.generation,
            loaded: report.loaded.len(),
            evicted: report.evicted.len(),
            failed: report.failures.len(),
        }
    }

    fn notify(&self, cached_reports: Vec<PathBuf>) {
        let (working_files, active) = self.with_state(|state| {
            (state.working_files(), state.active.clone())
        });

        self.events
            .send(&CheckerEvent::DiagnosticsUpdated(DiagnosticsUpdated {
                working_files: working_files
                    .iter()
                    .map(|file| file.to_string_lossy().to_string())
                    .collect(),
                cached_reports: cached_reports
                    .iter()
                    .map(|path| path.to_string_lossy().to_string())
                    .collect(),
                active_selection: active.map(|active| TSActiveSelection {
                    source_file: active.source_file.to_string_lossy().to_string(),
                    diagnostic_index: active.diagnostic_index,
                }),
                updated_at: Utc::now(),
            }));
    }

    /// Every diagnostic of every report mentioning `source_file`, in report-path order
    /// then diagnostic order.
    pub fn diagnostics_for(&self, source_file: &Path) -> Vec<Arc<DiagnosticEntry>> {
        let source_index = self.source_index();
        let mut diagnostics = Vec::new();

        for report_path in source_index.reports_for(source_file) {
            match self.cache.cached(report_path) {
                Some(report) => diagnostics.extend(report.diagnostics.iter().cloned()),
                None => debug!(
                    "Indexed report {} is no longer cached",
                    report_path.display()
                ),
            }
        }

        diagnostics
    }

    /// Diagnostics touching any of `source_files`, each entry once, in first-seen order
    pub fn diagnostics_for_any<P: AsRef<Path>>(
        &self,
        source_files: &[P],
    ) -> Vec<Arc<DiagnosticEntry>> {
        let mut seen: HashSet<*const DiagnosticEntry> = HashSet::new();
        let mut diagnostics = Vec::new();

        for file in source_files {
            for entry in self.diagnostics_for(file.as_ref()) {
                if seen.insert(Arc::as_ptr(&entry)) {
                    diagnostics.push(entry);
                }
            }
        }

        diagnostics
    }

    pub fn has_diagnostics(&self, source_file: &Path) -> bool {
        self.with_state(|state| state.source_index.contains(source_file))
    }

    pub fn diagnostic(&self, source_file: &Path, index: usize) -> Option<Arc<DiagnosticEntry>> {
        self.diagnostics_for(source_file).into_iter().nth(index)
    }

    pub fn active_selection(&self) -> Option<ActiveSelection> {
        self.with_state(|state| state.active.clone())
    }

    /// The selected diagnostic, if it still resolves
    pub fn active_diagnostic(&self) -> Option<(ActiveSelection, Arc<DiagnosticEntry>)> {
        let active = self.active_selection()?;
        let entry = self.diagnostic(&active.source_file, active.diagnostic_index)?;
        Some((active, entry))
    }

    /// Selects a diagnostic. Returns false and does nothing when the index does not
    /// resolve or the selection is unchanged.
    pub fn set_active_repr_path(&self, source_file: &Path, index: usize) -> bool {
        if self.diagnostic(source_file, index).is_none() {
            debug!(
                "No diagnostic {}#{index}, keeping the current selection",
                source_file.display()
            );
            return false;
        }

        let selection = ActiveSelection::new(source_file, index);
        let changed = self.with_state_mut(|state| {
            if state.active.as_ref() == Some(&selection) {
                return false;
            }
            state.active = Some(selection);
            true
        });

        if changed {
            self.notify(self.cache.cached_paths());
        }
        changed
    }

    /// Clears the selection. Returns false when nothing was selected.
    pub fn clear_active_repr_path(&self) -> bool {
        let changed = self.with_state_mut(|state| state.active.take().is_some());
        if changed {
            self.notify(self.cache.cached_paths());
        }
        changed
    }
}
