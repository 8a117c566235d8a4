use crate::cache::ReportFailure;
use crate::loader::ReportLoader;
use crate::metadata::MetadataApi;
use chrono::{DateTime, TimeDelta, Utc};
use event_bus::types::report_failure::to_ts_report_failure;
use event_bus::types::run_info::epoch_seconds_to_utc;
use event_bus::{AggregateUpdated, CheckerEvent, EventBus, FailureStage, ReportsFailed};
use futures::stream::{self, StreamExt};
use report_parser::{DiagnosticEntry, Metadata};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateLocation {
    /// Absolute file the diagnostic points into
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    /// Source file the report was declared for
    pub source_file: PathBuf,
    /// Position in that source file's diagnostic list
    pub source_idx: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    pub description: String,
    pub location: AggregateLocation,
    pub category: String,
    pub check_name: Option<String>,
    pub analyzer_name: String,
    /// Number of events in the diagnostic's path
    pub path_length: usize,
}

impl AggregateEntry {
    fn new(
        entry: &DiagnosticEntry,
        source_file: &Path,
        source_idx: usize,
        analyzer_name: &str,
    ) -> Self {
        let file = entry
            .file_of(&entry.location)
            .unwrap_or(source_file)
            .to_path_buf();

        Self {
            description: entry.description.clone(),
            location: AggregateLocation {
                file,
                line: entry.location.line,
                col: entry.location.col,
                source_file: source_file.to_path_buf(),
                source_idx,
            },
            category: entry.category.clone(),
            check_name: entry.check_name.clone(),
            analyzer_name: analyzer_name.to_string(),
            path_length: entry.event_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub name: String,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: Vec<AggregateEntry>,
    pub analyzers: Vec<String>,
    pub action_num: u64,
    pub skipped: u64,
}

/// How entries are grouped for listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    FileName,
    ReproPathLength,
    Analyzer,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::FileName => write!(f, "file name"),
            SortKey::ReproPathLength => write!(f, "reproduction path length"),
            SortKey::Analyzer => write!(f, "analyzer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    File(PathBuf),
    PathLength(usize),
    Analyzer(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::File(file) => write!(f, "{}", file.display()),
            GroupKey::PathLength(length) => write!(f, "{length}"),
            GroupKey::Analyzer(name) if name.is_empty() => write!(f, "(unknown analyzer)"),
            GroupKey::Analyzer(name) => write!(f, "{name}"),
        }
    }
}

impl AggregateSummary {
    pub fn bug_count(&self) -> usize {
        self.entries.len()
    }

    pub fn build_length(&self) -> TimeDelta {
        self.end - self.begin
    }

    /// Entries grouped under `key`, each with its index into `entries`
    pub fn group_by(&self, key: SortKey) -> BTreeMap<GroupKey, Vec<(usize, &AggregateEntry)>> {
        let mut groups: BTreeMap<GroupKey, Vec<(usize, &AggregateEntry)>> = BTreeMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            let group = match key {
                SortKey::FileName => GroupKey::File(entry.location.file.clone()),
                SortKey::ReproPathLength => GroupKey::PathLength(entry.path_length),
                SortKey::Analyzer => GroupKey::Analyzer(entry.analyzer_name.clone()),
            };
            groups.entry(group).or_default().push((idx, entry));
        }
        groups
    }
}

/// `1:02:03 s` above a minute, `4.250 s` below
pub fn format_build_length(length: TimeDelta) -> String {
    let total_ms = length.num_milliseconds().max(0);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02} s")
    } else if minutes > 0 {
        format!("{minutes}:{seconds:02} s")
    } else {
        format!("{seconds}.{millis:03} s")
    }
}

/// Result of the last aggregate rebuild
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AggregateData {
    /// No analyzer run exists
    #[default]
    NoData,
    Summary(Arc<AggregateSummary>),
}

impl AggregateData {
    pub fn summary(&self) -> Option<&Arc<AggregateSummary>> {
        match self {
            AggregateData::NoData => None,
            AggregateData::Summary(summary) => Some(summary),
        }
    }
}

#[derive(Debug)]
pub struct AggregateRebuild {
    pub data: AggregateData,
    pub failures: Vec<ReportFailure>,
}

/// Project-wide listing built from every declared report.
///
/// Rebuilds read reports straight through the loader and never touch the working-set
/// cache.
pub struct AggregateApi {
    loader: Arc<dyn ReportLoader>,
    metadata: Arc<MetadataApi>,
    events: EventBus,
    concurrency: AtomicUsize,
    generation: AtomicU64,
    data: RwLock<(u64, AggregateData)>,
}

impl AggregateApi {
    pub fn new(
        loader: Arc<dyn ReportLoader>,
        metadata: Arc<MetadataApi>,
        events: EventBus,
        concurrency: usize,
    ) -> Self {
        Self {
            loader,
            metadata,
            events,
            concurrency: AtomicUsize::new(concurrency.max(1)),
            generation: AtomicU64::new(0),
            data: RwLock::new((0, AggregateData::NoData)),
        }
    }

    pub fn set_concurrency(&self, concurrency: usize) {
        self.concurrency.store(concurrency.max(1), Ordering::Relaxed);
    }

    pub fn data(&self) -> AggregateData {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }

    pub async fn rebuild(&self) -> AggregateRebuild {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(metadata) = self.metadata.metadata() else {
            debug!("No metadata, aggregate has no data");
            self.store(generation, AggregateData::NoData);
            return AggregateRebuild {
                data: AggregateData::NoData,
                failures: Vec::new(),
            };
        };

        let (entries, failures) = self.scan().await;
        let summary = Arc::new(summarize(&metadata, entries));
        info!(
            "Aggregated {} diagnostics of run {:?}",
            summary.bug_count(),
            summary.name
        );

        if !failures.is_empty() {
            warn!("{} reports failed during aggregate rebuild", failures.len());
            self.events.send(&CheckerEvent::ReportsFailed(ReportsFailed {
                stage: FailureStage::Aggregate,
                failures: failures
                    .iter()
                    .map(|failure| to_ts_report_failure(&failure.path, &failure.error))
                    .collect(),
                failed_at: Utc::now(),
            }));
        }

        let data = AggregateData::Summary(summary);
        self.store(generation, data.clone());
        AggregateRebuild { data, failures }
    }

    async fn scan(&self) -> (Vec<AggregateEntry>, Vec<ReportFailure>) {
        let index = self.metadata.index();
        let jobs: Vec<(PathBuf, PathBuf)> = index
            .entries()
            .flat_map(|(source, reports)| {
                reports
                    .iter()
                    .map(move |report| (source.to_path_buf(), report.clone()))
            })
            .collect();
        let concurrency = self.concurrency.load(Ordering::Relaxed);
        debug!(
            "Scanning {} reports with concurrency {concurrency}",
            jobs.len()
        );

        let loader = &self.loader;
        let results: Vec<_> = stream::iter(jobs)
            .map(|(source, report)| async move {
                let result = loader.load_report(&report).await;
                (source, report, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        let mut offsets: HashMap<PathBuf, usize> = HashMap::new();

        for (source, report_path, result) in results {
            match result {
                Ok(report) => {
                    let analyzer_name = report.analyzer_name.as_deref().unwrap_or_default();
                    let offset = offsets.entry(source.clone()).or_default();
                    for (idx, diagnostic) in report.diagnostics.iter().enumerate() {
                        entries.push(AggregateEntry::new(
                            diagnostic,
                            &source,
                            *offset + idx,
                            analyzer_name,
                        ));
                    }
                    *offset += report.diagnostics.len();
                }
                Err(error) if error.is_not_found() => {
                    debug!("Declared report {} does not exist", report_path.display());
                }
                Err(error) => {
                    warn!("Failed to parse report {}: {}", report_path.display(), error);
                    failures.push(ReportFailure {
                        path: report_path,
                        error,
                    });
                }
            }
        }

        (entries, failures)
    }

    fn store(&self, generation: u64, data: AggregateData) {
        let event = match &data {
            AggregateData::NoData => AggregateUpdated::NoData {
                updated_at: Utc::now(),
            },
            AggregateData::Summary(summary) => AggregateUpdated::Summary {
                run_name: summary.name.clone(),
                bug_count: summary.bug_count(),
                updated_at: Utc::now(),
            },
        };

        let stored = {
            let mut current = self.data.write().unwrap_or_else(PoisonError::into_inner);
            if current.0 > generation {
                false
            } else {
                *current = (generation, data);
                true
            }
        };

        if stored {
            self.events.send(&CheckerEvent::AggregateUpdated(event));
        } else {
            debug!("Aggregate rebuild #{generation} superseded");
        }
    }
}

fn summarize(metadata: &Metadata, entries: Vec<AggregateEntry>) -> AggregateSummary {
    AggregateSummary {
        name: metadata.name.clone(),
        begin: epoch_seconds_to_utc(metadata.timestamps.begin).unwrap_or_default(),
        end: epoch_seconds_to_utc(metadata.timestamps.end).unwrap_or_default(),
        entries,
        analyzers: metadata.analyzers.keys().cloned().collect(),
        action_num: metadata.action_num,
        skipped: metadata.skipped,
    }
}
