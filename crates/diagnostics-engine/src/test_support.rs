use crate::loader::ReportLoader;
use async_trait::async_trait;
use report_parser::{
    Metadata, ParseError, ParsedReport, parse_metadata_str, parse_report_str,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use testing::plist::{DiagnosticFixture, EventFixture, ReportFixture};
use tokio::sync::Notify;

/// A report over `files` with `count` single-event diagnostics in the first file
pub(crate) fn report_xml(files: &[&str], count: usize) -> String {
    let mut report = ReportFixture::new(files.iter().copied());
    for idx in 0..count {
        let description = format!("bug {idx}");
        let line = idx as u32 + 1;
        report = report.diagnostic(
            DiagnosticFixture::new(&description, (0, line, 1))
                .event(EventFixture::new(&description, (0, line, 1))),
        );
    }
    report.to_xml()
}

/// Serves file contents from memory and records every load
#[derive(Default)]
pub(crate) struct MemoryLoader {
    files: Mutex<HashMap<PathBuf, String>>,
    report_loads: Mutex<Vec<PathBuf>>,
}

impl MemoryLoader {
    pub(crate) fn insert(&self, path: &str, content: String) {
        self.files.lock().unwrap().insert(PathBuf::from(path), content);
    }

    pub(crate) fn report_loads(&self) -> usize {
        self.report_loads.lock().unwrap().len()
    }

    pub(crate) fn loads_of(&self, path: &str) -> usize {
        self.report_loads
            .lock()
            .unwrap()
            .iter()
            .filter(|loaded| loaded.as_path() == Path::new(path))
            .count()
    }

    fn read(&self, path: &Path) -> report_parser::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ParseError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

#[async_trait]
impl ReportLoader for MemoryLoader {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata> {
        parse_metadata_str(&self.read(path)?)
    }

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport> {
        self.report_loads.lock().unwrap().push(path.to_path_buf());
        parse_report_str(path, &self.read(path)?)
    }
}

/// Parses from memory, then waits on the next queued hold before returning.
///
/// `parsed` is notified after every report parse, before the hold.
#[derive(Default)]
pub(crate) struct HeldLoader {
    pub(crate) memory: MemoryLoader,
    pub(crate) parsed: Notify,
    holds: Mutex<VecDeque<Arc<Notify>>>,
}

impl HeldLoader {
    /// Queues a hold for the next report load that has none yet
    pub(crate) fn hold_next(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.holds.lock().unwrap().push_back(hold.clone());
        hold
    }
}

#[async_trait]
impl ReportLoader for HeldLoader {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata> {
        self.memory.load_metadata(path).await
    }

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport> {
        let result = self.memory.load_report(path).await;
        self.parsed.notify_one();
        let hold = self.holds.lock().unwrap().pop_front();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        result
    }
}
