use crate::loader::ReportLoader;
use futures::future::join_all;
use report_parser::{ParseError, ParsedReport};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// A report that could not be parsed during a reconcile
#[derive(Debug)]
pub struct ReportFailure {
    pub path: PathBuf,
    pub error: ParseError,
}

/// What an applied reconcile did to the cache
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub generation: u64,
    pub loaded: Vec<PathBuf>,
    pub evicted: Vec<PathBuf>,
    /// Required reports whose file does not exist
    pub missing: Vec<PathBuf>,
    pub failures: Vec<ReportFailure>,
    /// Cache contents right after the reconcile, sorted by report path
    pub snapshot: Vec<Arc<ParsedReport>>,
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    Applied(ReconcileReport),
    /// A later reconcile started before this one finished; nothing was changed
    Superseded { generation: u64 },
}

#[derive(Default)]
struct CacheState {
    reports: BTreeMap<PathBuf, Arc<ParsedReport>>,
    generation: u64,
}

/// Owner of all parsed report content.
///
/// Reports are parsed on first use and kept until a reconcile no longer requires them.
/// Every reconcile takes a new generation number and only the most recently started one
/// is allowed to write its results.
pub struct ReportCache {
    loader: Arc<dyn ReportLoader>,
    state: RwLock<CacheState>,
}

impl ReportCache {
    pub fn new(loader: Arc<dyn ReportLoader>) -> Self {
        Self {
            loader,
            state: RwLock::new(CacheState::default()),
        }
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CacheState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CacheState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn has(&self, report_path: &Path) -> bool {
        self.with_state(|state| state.reports.contains_key(report_path))
    }

    /// Returns the cached report without loading it
    pub fn cached(&self, report_path: &Path) -> Option<Arc<ParsedReport>> {
        self.with_state(|state| state.reports.get(report_path).cloned())
    }

    /// Returns the cached report, parsing and caching it on a miss.
    ///
    /// A parse that a reconcile started in the meantime is returned but not cached.
    pub async fn get(&self, report_path: &Path) -> report_parser::Result<Arc<ParsedReport>> {
        let (cached, generation) = self.with_state(|state| {
            (state.reports.get(report_path).cloned(), state.generation)
        });
        if let Some(report) = cached {
            return Ok(report);
        }

        debug!("Report cache miss for {}", report_path.display());
        let parsed = Arc::new(self.loader.load_report(report_path).await?);

        Ok(self.with_state_mut(|state| {
            if state.generation != generation {
                debug!(
                    "Not caching {}, a reconcile started while it was parsed",
                    report_path.display()
                );
                return parsed;
            }
            state
                .reports
                .entry(report_path.to_path_buf())
                .or_insert(parsed)
                .clone()
        }))
    }

    pub fn len(&self) -> usize {
        self.with_state(|state| state.reports.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.with_state(|state| state.generation)
    }

    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.with_state(|state| state.reports.keys().cloned().collect())
    }

    pub fn snapshot(&self) -> Vec<Arc<ParsedReport>> {
        self.with_state(|state| state.reports.values().cloned().collect())
    }

    /// Loads every report in `required` that is not cached yet, then evicts every cached
    /// report outside of `required`.
    ///
    /// With `force_reload` every required report is parsed again and the previous
    /// contents are replaced as a whole once the parses are done. Until then queries
    /// keep seeing the old contents. Parses of one call run concurrently. Failures are
    /// collected per file and never abort the batch.
    pub async fn reconcile(
        &self,
        required: &BTreeSet<PathBuf>,
        force_reload: bool,
    ) -> ReconcileOutcome {
        let (generation, to_load) = self.with_state_mut(|state| {
            state.generation += 1;
            let to_load: Vec<PathBuf> = required
                .iter()
                .filter(|path| force_reload || !state.reports.contains_key(*path))
                .cloned()
                .collect();
            (state.generation, to_load)
        });

        debug!(
            "Reconcile #{generation}: {} required, {} to load, forced {force_reload}",
            required.len(),
            to_load.len()
        );

        let results = join_all(to_load.into_iter().map(|path| async move {
            let result = self.loader.load_report(&path).await;
            (path, result)
        }))
        .await;

        self.with_state_mut(|state| {
            if state.generation != generation {
                debug!(
                    "Reconcile #{generation} superseded by #{}, discarding results",
                    state.generation
                );
                return ReconcileOutcome::Superseded { generation };
            }

            let mut report = ReconcileReport {
                generation,
                ..Default::default()
            };

            let previous = std::mem::take(&mut state.reports);
            let mut reports = BTreeMap::new();
            for (path, parsed) in previous {
                if !required.contains(&path) {
                    report.evicted.push(path);
                } else if !force_reload {
                    reports.insert(path, parsed);
                }
            }

            for (path, result) in results {
                match result {
                    Ok(parsed) => {
                        reports.insert(path.clone(), Arc::new(parsed));
                        report.loaded.push(path);
                    }
                    Err(error) if error.is_not_found() => {
                        debug!("Report {} does not exist", path.display());
                        report.missing.push(path);
                    }
                    Err(error) => {
                        warn!("Failed to parse report {}: {}", path.display(), error);
                        report.failures.push(ReportFailure { path, error });
                    }
                }
            }

            state.reports = reports;
            report.snapshot = state.reports.values().cloned().collect();

            info!(
                "Reconcile #{generation}: loaded {}, evicted {}, missing {}, failed {}, cached {}",
                report.loaded.len(),
                report.evicted.len(),
                report.missing.len(),
                report.failures.len(),
                state.reports.len()
            );

            ReconcileOutcome::Applied(report)
        })
    }

    /// Drops every cached report and invalidates reconciles still in flight
    pub fn clear(&self) {
        self.with_state_mut(|state| {
            state.generation += 1;
            state.reports.clear();
        });
    }
}
