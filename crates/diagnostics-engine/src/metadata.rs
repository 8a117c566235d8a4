use crate::errors::{EngineError, Result};
use crate::loader::ReportLoader;
use crate::metadata_index::MetadataIndex;
use chrono::Utc;
use event_bus::types::report_failure::to_ts_report_failure;
use event_bus::types::run_info::to_ts_run_info;
use event_bus::{CheckerEvent, EventBus, FailureStage, MetadataUpdated, ReportsFailed};
use report_parser::Metadata;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Result of a successful metadata reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStatus {
    Loaded,
    /// The metadata file does not exist; no analyzer run yet
    Absent,
    /// The checker is disabled or has no output folder
    Disabled,
    /// A later reload started before this one finished
    Superseded,
}

struct MetadataState {
    metadata_path: Option<PathBuf>,
    metadata: Option<Arc<Metadata>>,
    index: Arc<MetadataIndex>,
    generation: u64,
}

/// Holds the current analyzer run and the index derived from it.
pub struct MetadataApi {
    loader: Arc<dyn ReportLoader>,
    events: EventBus,
    state: RwLock<MetadataState>,
}

impl MetadataApi {
    /// `metadata_path` is `None` while the checker is disabled
    pub fn new(
        loader: Arc<dyn ReportLoader>,
        events: EventBus,
        metadata_path: Option<PathBuf>,
    ) -> Self {
        Self {
            loader,
            events,
            state: RwLock::new(MetadataState {
                metadata_path,
                metadata: None,
                index: Arc::new(MetadataIndex::empty()),
                generation: 0,
            }),
        }
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&MetadataState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut MetadataState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn metadata(&self) -> Option<Arc<Metadata>> {
        self.with_state(|state| state.metadata.clone())
    }

    pub fn index(&self) -> Arc<MetadataIndex> {
        self.with_state(|state| state.index.clone())
    }

    pub fn metadata_path(&self) -> Option<PathBuf> {
        self.with_state(|state| state.metadata_path.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.with_state(|state| state.metadata_path.is_some())
    }

    /// Points the API at another metadata file, or disables it with `None`.
    /// Takes effect on the next [`MetadataApi::reload`].
    pub fn set_metadata_path(&self, metadata_path: Option<PathBuf>) {
        self.with_state_mut(|state| state.metadata_path = metadata_path);
    }

    /// Re-reads the metadata file and rebuilds the index.
    ///
    /// A missing file leaves an empty index and is not an error. Any other failure
    /// also leaves an empty index, and is returned after the state has been cleared.
    pub async fn reload(&self) -> Result<MetadataStatus> {
        let (generation, metadata_path) = self.with_state_mut(|state| {
            state.generation += 1;
            (state.generation, state.metadata_path.clone())
        });

        let Some(metadata_path) = metadata_path else {
            debug!("Checker disabled, clearing metadata");
            self.store(generation, None, Path::new(""));
            return Ok(MetadataStatus::Disabled);
        };

        let result = self.loader.load_metadata(&metadata_path).await;
        if self.with_state(|state| state.generation != generation) {
            debug!("Metadata reload #{generation} superseded");
            return Ok(MetadataStatus::Superseded);
        }

        match result {
            Ok(metadata) => {
                let base_dir = metadata_path.parent().unwrap_or(Path::new(""));
                info!(
                    "Loaded metadata for run {:?} with {} reports",
                    metadata.name,
                    metadata.result_source_files.len()
                );
                self.store(generation, Some(metadata), base_dir);
                Ok(MetadataStatus::Loaded)
            }
            Err(error) if error.is_not_found() => {
                info!("No metadata at {}", metadata_path.display());
                self.store(generation, None, Path::new(""));
                Ok(MetadataStatus::Absent)
            }
            Err(error) => {
                warn!(
                    "Failed to read metadata {}: {}",
                    metadata_path.display(),
                    error
                );
                self.store(generation, None, Path::new(""));
                self.events.send(&CheckerEvent::ReportsFailed(ReportsFailed {
                    stage: FailureStage::Metadata,
                    failures: vec![to_ts_report_failure(&metadata_path, &error)],
                    failed_at: Utc::now(),
                }));
                Err(EngineError::Parse(error))
            }
        }
    }

    fn store(&self, generation: u64, metadata: Option<Metadata>, base_dir: &Path) {
        let metadata = metadata.map(Arc::new);
        let index = match &metadata {
            Some(metadata) => MetadataIndex::build(metadata, base_dir),
            None => MetadataIndex::empty(),
        };

        let stored = self.with_state_mut(|state| {
            if state.generation != generation {
                return false;
            }
            state.metadata = metadata.clone();
            state.index = Arc::new(index);
            true
        });

        if stored {
            self.events
                .send(&CheckerEvent::MetadataUpdated(MetadataUpdated {
                    run: metadata.as_deref().map(to_ts_run_info),
                    updated_at: Utc::now(),
                }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryLoader;
    use testing::metadata::MetadataFixture;

    fn api(loader: Arc<MemoryLoader>, path: Option<&str>) -> MetadataApi {
        MetadataApi::new(loader, EventBus::new(), path.map(PathBuf::from))
    }

    #[tokio::test]
    async fn test_reload_builds_index() {
        let loader = Arc::new(MemoryLoader::default());
        loader.insert(
            "/out/metadata.json",
            MetadataFixture::new("run")
                .report("unit1.plist", "/src/main.cpp")
                .to_json(),
        );
        let api = api(loader, Some("/out/metadata.json"));

        assert_eq!(api.reload().await.unwrap(), MetadataStatus::Loaded);
        assert_eq!(api.metadata().unwrap().name, "run");
        assert_eq!(
            api.index().declared_reports_for(Path::new("/src/main.cpp")),
            &[PathBuf::from("/out/unit1.plist")]
        );
    }

    #[tokio::test]
    async fn test_missing_metadata_is_empty_state() {
        let api = api(Arc::new(MemoryLoader::default()), Some("/out/metadata.json"));
        let mut events = api.events.subscribe();

        assert_eq!(api.reload().await.unwrap(), MetadataStatus::Absent);
        assert!(api.metadata().is_none());
        assert!(api.index().is_empty());
        assert_eq!(events.recv().await.unwrap().kind(), "MetadataUpdated");
    }

    #[tokio::test]
    async fn test_broken_metadata_clears_state_and_fails() {
        let loader = Arc::new(MemoryLoader::default());
        loader.insert(
            "/out/metadata.json",
            MetadataFixture::new("run")
                .report("unit1.plist", "/src/main.cpp")
                .to_json(),
        );
        let api = api(loader.clone(), Some("/out/metadata.json"));
        api.reload().await.unwrap();

        loader.insert("/out/metadata.json", "{ not json".to_string());
        let mut events = api.events.subscribe();
        let err = api.reload().await.unwrap_err();

        assert!(matches!(err, EngineError::Parse(_)));
        assert!(api.metadata().is_none());
        assert!(api.index().is_empty());
        assert_eq!(events.recv().await.unwrap().kind(), "MetadataUpdated");
        assert_eq!(events.recv().await.unwrap().kind(), "ReportsFailed");
    }

    #[tokio::test]
    async fn test_disabled_reload_clears() {
        let api = api(Arc::new(MemoryLoader::default()), None);
        assert!(!api.is_enabled());
        assert_eq!(api.reload().await.unwrap(), MetadataStatus::Disabled);
        assert!(api.index().is_empty());
    }
}
