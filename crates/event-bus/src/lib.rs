//! # Checker Event Bus
//!
//! Broadcasts what the diagnostics engine has just finished doing, with enough state in
//! each payload for a consumer to refresh itself without querying back.
//!
//! ## Event kinds
//!
//! - `MetadataUpdated` after every metadata reload (including "no run found")
//! - `DiagnosticsUpdated` after every applied working-set reconcile or selection change
//! - `AggregateUpdated` after every project-wide aggregate rebuild
//! - `ReportsFailed` once per batch in which one or more files could not be parsed
//!
//! Every logical change produces exactly one event; a reconcile that was superseded by a
//! newer one produces none.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │  Diagnostics    │    │  Event Bus   │    │   Consumers     │
//! │  Engine         │───▶│  (Broadcast) │───▶│   • CLI         │
//! │ • Metadata      │    │              │    │   • Editor      │
//! │ • Working set   │    │              │    │     front ends  │
//! │ • Aggregate     │    │              │    │                 │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```
//!
//! Payload types derive `ts_rs::TS`, so editor front ends get matching TypeScript
//! definitions when the test suite runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};
use ts_rs::TS;

use crate::types::{report_failure::TSReportFailure, run_info::TSRunInfo};
pub mod types;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
#[serde(tag = "type", content = "payload")]
pub enum CheckerEvent {
    MetadataUpdated(MetadataUpdated),
    DiagnosticsUpdated(DiagnosticsUpdated),
    AggregateUpdated(AggregateUpdated),
    ReportsFailed(ReportsFailed),
}

impl CheckerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckerEvent::MetadataUpdated(_) => "MetadataUpdated",
            CheckerEvent::DiagnosticsUpdated(_) => "DiagnosticsUpdated",
            CheckerEvent::AggregateUpdated(_) => "AggregateUpdated",
            CheckerEvent::ReportsFailed(_) => "ReportsFailed",
        }
    }
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
pub struct MetadataUpdated {
    /// `None` when the output folder holds no analyzer run
    pub run: Option<TSRunInfo>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, TS, PartialEq, Eq)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
pub struct TSActiveSelection {
    pub source_file: String,
    pub diagnostic_index: usize,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
pub struct DiagnosticsUpdated {
    pub working_files: Vec<String>,
    pub cached_reports: Vec<String>,
    pub active_selection: Option<TSActiveSelection>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
#[serde(tag = "status")]
pub enum AggregateUpdated {
    NoData {
        updated_at: DateTime<Utc>,
    },
    Summary {
        run_name: String,
        bug_count: usize,
        updated_at: DateTime<Utc>,
    },
}

#[derive(Clone, Copy, Debug, Serialize, TS, PartialEq, Eq)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Metadata,
    Reconcile,
    Aggregate,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../packages/cclens/src/events.ts")]
pub struct ReportsFailed {
    pub stage: FailureStage,
    pub failures: Vec<TSReportFailure>,
    pub failed_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: Sender<CheckerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn send(&self, event: &CheckerEvent) {
        if self.sender.send(event.clone()).is_err() {
            // No subscriber yet; the event is dropped.
            tracing::debug!("No receivers for event bus, dropping {}", event.kind());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CheckerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn metadata_event() -> CheckerEvent {
        CheckerEvent::MetadataUpdated(MetadataUpdated {
            run: None,
            updated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.send(&metadata_event());
        bus.send(&CheckerEvent::AggregateUpdated(AggregateUpdated::NoData {
            updated_at: Utc::now(),
        }));

        assert_eq!(receiver.recv().await.unwrap().kind(), "MetadataUpdated");
        assert_eq!(receiver.recv().await.unwrap().kind(), "AggregateUpdated");
    }

    #[traced_test]
    #[test]
    fn test_send_without_receivers_is_ignored() {
        let bus = EventBus::new();
        bus.send(&metadata_event());
        assert!(logs_contain("No receivers for event bus"));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = CheckerEvent::ReportsFailed(ReportsFailed {
            stage: FailureStage::Reconcile,
            failures: vec![TSReportFailure {
                path: "/out/unit1.plist".to_string(),
                error: "boom".to_string(),
            }],
            failed_at: Utc::now(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ReportsFailed");
        assert_eq!(value["payload"]["stage"], "reconcile");
        assert_eq!(value["payload"]["failures"][0]["path"], "/out/unit1.plist");
    }
}
