use chrono::{DateTime, Utc};
use report_parser::Metadata;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Default, Clone, Debug, PartialEq)]
#[ts(export, export_to = "../../../packages/cclens/src/run_info.ts")]
pub struct TSRunInfo {
    pub name: String,
    pub tool_version: String,
    pub began_at: Option<String>,
    pub ended_at: Option<String>,
    pub analyzers: Vec<String>,
    pub report_count: usize,
    pub action_num: u64,
    pub skipped: u64,
}

/// Converts seconds since the Unix epoch, as written in metadata, into a UTC date-time
pub fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

pub fn to_ts_run_info(metadata: &Metadata) -> TSRunInfo {
    TSRunInfo {
        name: metadata.name.clone(),
        tool_version: metadata.version.clone(),
        began_at: epoch_seconds_to_utc(metadata.timestamps.begin).map(|dt| dt.to_rfc3339()),
        ended_at: epoch_seconds_to_utc(metadata.timestamps.end).map(|dt| dt.to_rfc3339()),
        analyzers: metadata.analyzers.keys().cloned().collect(),
        report_count: metadata.result_source_files.len(),
        action_num: metadata.action_num,
        skipped: metadata.skipped,
    }
}
