use serde::{Deserialize, Serialize};
use std::path::Path;
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Default, Clone, Debug, PartialEq)]
#[ts(export, export_to = "../../../packages/cclens/src/report_failure.ts")]
pub struct TSReportFailure {
    pub path: String,
    pub error: String,
}

pub fn to_ts_report_failure(path: &Path, error: &impl std::fmt::Display) -> TSReportFailure {
    TSReportFailure {
        path: path.to_string_lossy().to_string(),
        error: error.to_string(),
    }
}
