use crate::aggregate::{AggregateApi, AggregateData};
use crate::cache::ReportCache;
use crate::config::CheckerConfig;
use crate::diagnostics::{DiagnosticsApi, ReconcileStatus};
use crate::errors::Result;
use crate::loader::{FsReportLoader, ReportLoader};
use crate::metadata::{MetadataApi, MetadataStatus};
use crate::navigation::NavigationHandler;
use crate::render::DiagnosticRenderer;
use event_bus::EventBus;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// What a full reload did
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadSummary {
    pub metadata: MetadataStatus,
    pub diagnostics: Option<ReconcileStatus>,
    pub aggregate: Option<AggregateData>,
}

/// The single engine instance: every component, wired together once.
pub struct CheckerContext {
    config: RwLock<CheckerConfig>,
    events: EventBus,
    metadata: Arc<MetadataApi>,
    diagnostics: Arc<DiagnosticsApi>,
    aggregate: Arc<AggregateApi>,
    navigation: NavigationHandler,
    renderer: DiagnosticRenderer,
}

impl CheckerContext {
    pub fn new(config: CheckerConfig) -> Self {
        Self::with_loader(config, Arc::new(FsReportLoader), EventBus::new())
    }

    pub fn with_loader(
        config: CheckerConfig,
        loader: Arc<dyn ReportLoader>,
        events: EventBus,
    ) -> Self {
        let metadata = Arc::new(MetadataApi::new(
            loader.clone(),
            events.clone(),
            config.metadata_path(),
        ));
        let cache = Arc::new(ReportCache::new(loader.clone()));
        let diagnostics = Arc::new(DiagnosticsApi::new(
            cache,
            metadata.clone(),
            events.clone(),
        ));
        let aggregate = Arc::new(AggregateApi::new(
            loader,
            metadata.clone(),
            events.clone(),
            config.aggregate_concurrency(),
        ));

        Self {
            navigation: NavigationHandler::new(diagnostics.clone()),
            renderer: DiagnosticRenderer::new(diagnostics.clone()),
            config: RwLock::new(config),
            events,
            metadata,
            diagnostics,
            aggregate,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metadata(&self) -> &Arc<MetadataApi> {
        &self.metadata
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticsApi> {
        &self.diagnostics
    }

    pub fn aggregate(&self) -> &Arc<AggregateApi> {
        &self.aggregate
    }

    pub fn navigation(&self) -> &NavigationHandler {
        &self.navigation
    }

    pub fn renderer(&self) -> &DiagnosticRenderer {
        &self.renderer
    }

    pub fn config(&self) -> CheckerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reloads metadata, re-parses the working set and rebuilds the aggregate.
    ///
    /// A metadata failure still empties the working set and the aggregate before it is
    /// returned.
    pub async fn reload(&self) -> Result<ReloadSummary> {
        let metadata = self.metadata.reload().await;
        if matches!(metadata, Ok(MetadataStatus::Superseded)) {
            return Ok(ReloadSummary {
                metadata: MetadataStatus::Superseded,
                diagnostics: None,
                aggregate: None,
            });
        }

        let diagnostics = self.diagnostics.on_metadata_reloaded().await;
        let aggregate = self.aggregate.rebuild().await.data;

        let metadata = metadata?;
        info!("Reload finished: metadata {:?}", metadata);
        Ok(ReloadSummary {
            metadata,
            diagnostics: Some(diagnostics),
            aggregate: Some(aggregate),
        })
    }

    /// Called when an external analyzer run has written new output
    pub async fn on_build_finished(&self) -> Result<ReloadSummary> {
        info!("Analyzer run finished, reloading");
        self.reload().await
    }

    /// Switches to a new configuration and reloads everything
    pub async fn apply_config(&self, config: CheckerConfig) -> Result<ReloadSummary> {
        self.metadata.set_metadata_path(config.metadata_path());
        self.aggregate
            .set_concurrency(config.aggregate_concurrency());
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.reload().await
    }

    /// Disabling clears all analyzer data; enabling loads it again
    pub async fn set_enabled(&self, enabled: bool) -> Result<ReloadSummary> {
        let config = self.config().with_enabled(enabled);
        if enabled && config.output_folder.is_none() {
            warn!("Enabling the checker without an output folder");
        }
        self.apply_config(config).await
    }
}
