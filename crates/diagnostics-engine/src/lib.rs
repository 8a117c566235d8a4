//! # Diagnostics Engine
//!
//! Keeps a bounded, always consistent view of which analyzer diagnostics touch which
//! source files, and lets a caller walk a diagnostic's reproduction path.
//!
//! ```text
//!  metadata.json ──▶ MetadataIndex ──┐ declared reports
//!                                    ▼
//!  open files + sticky file ──▶ DiagnosticsApi ──reconcile──▶ ReportCache
//!                                    │                           │
//!                                    ◀────── SourceIndex ◀───────┘ parsed files
//!                                    │
//!                      queries, selection, navigation, rendering
//! ```
//!
//! The [`CheckerContext`] owns one instance of every component. Changes are announced
//! on its [`event_bus::EventBus`].

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod loader;
pub mod location;
pub mod metadata;
pub mod metadata_index;
pub mod navigation;
pub mod render;
pub mod repro_path;
pub mod source_index;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::{
    AggregateApi, AggregateData, AggregateEntry, AggregateLocation, AggregateRebuild,
    AggregateSummary, GroupKey, SortKey, format_build_length,
};
pub use cache::{ReconcileOutcome, ReconcileReport, ReportCache, ReportFailure};
pub use config::CheckerConfig;
pub use context::{CheckerContext, ReloadSummary};
pub use diagnostics::{ActiveSelection, DiagnosticsApi, ReconcileStatus};
pub use errors::{EngineError, Result};
pub use loader::{FsReportLoader, ReportLoader};
pub use location::{FilePosition, Position, Range};
pub use metadata::{MetadataApi, MetadataStatus};
pub use metadata_index::MetadataIndex;
pub use navigation::{Jump, JumpStatus, NavigationHandler, NavigationTarget};
pub use render::{DiagnosticRenderer, RenderedDiagnostic, RenderedFiles, Severity};
pub use repro_path::{Anchor, LinkKind, RelatedLink, ReproductionPath};
pub use source_index::SourceIndex;
