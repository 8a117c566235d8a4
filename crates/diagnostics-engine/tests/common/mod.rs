#![allow(dead_code)]

use async_trait::async_trait;
use diagnostics_engine::{CheckerConfig, CheckerContext, FsReportLoader, ReportLoader};
use event_bus::{CheckerEvent, EventBus};
use report_parser::{Metadata, ParsedReport};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use testing::{DiagnosticFixture, EventFixture, MetadataFixture, ReportFixture, TestOutputDir};
use tokio::sync::Notify;
use tokio::sync::broadcast::Receiver;

pub const MAIN_CPP: &str = "/project/main.cpp";
pub const HEADER_H: &str = "/project/header.h";
pub const UTIL_CPP: &str = "/project/util.cpp";

/// Filesystem loader that records every report it parses
#[derive(Default)]
pub struct CountingLoader {
    inner: FsReportLoader,
    loads: Mutex<Vec<PathBuf>>,
}

impl CountingLoader {
    pub fn report_loads(&self) -> usize {
        self.loads.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportLoader for CountingLoader {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata> {
        self.inner.load_metadata(path).await
    }

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport> {
        self.loads.lock().unwrap().push(path.to_path_buf());
        self.inner.load_report(path).await
    }
}

/// Filesystem loader that holds one report until released
pub struct GatedLoader {
    inner: FsReportLoader,
    gated: PathBuf,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedLoader {
    pub fn new(gated: PathBuf) -> Self {
        Self {
            inner: FsReportLoader,
            gated,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ReportLoader for GatedLoader {
    async fn load_metadata(&self, path: &Path) -> report_parser::Result<Metadata> {
        self.inner.load_metadata(path).await
    }

    async fn load_report(&self, path: &Path) -> report_parser::Result<ParsedReport> {
        if path == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.load_report(path).await
    }
}

/// Output folder of a run over `main.cpp` and `util.cpp`.
///
/// `unit1.plist` was produced for `main.cpp` and also mentions `header.h`;
/// `unit2.plist` was produced for `util.cpp`.
pub fn write_run(out: &TestOutputDir) {
    out.write_report(
        "unit1.plist",
        &ReportFixture::new([MAIN_CPP, HEADER_H])
            .analyzer("clangsa")
            .diagnostic(
                DiagnosticFixture::new("X", (0, 12, 5))
                    .check_name("core.NullDereference")
                    .control()
                    .event(EventFixture::new("Assuming pointer is null", (1, 4, 3)))
                    .event(EventFixture::new("X", (0, 12, 5)).range((0, 12, 5), (0, 12, 9))),
            ),
    );
    out.write_report(
        "unit2.plist",
        &ReportFixture::new([UTIL_CPP])
            .analyzer("clangsa")
            .diagnostic(
                DiagnosticFixture::new("Dead store", (0, 3, 1))
                    .event(EventFixture::new("Dead store", (0, 3, 1))),
            )
            .diagnostic(
                DiagnosticFixture::new("Leak", (0, 9, 2))
                    .event(EventFixture::new("Allocated", (0, 7, 2)))
                    .event(EventFixture::new("Leak", (0, 9, 2))),
            ),
    );
    out.write_metadata(
        &MetadataFixture::new("codechecker")
            .report("unit1.plist", MAIN_CPP)
            .report("unit2.plist", UTIL_CPP)
            .analyzer("clangsa"),
    );
}

pub fn config(out: &TestOutputDir) -> CheckerConfig {
    CheckerConfig::default().with_output_folder(out.path())
}

pub fn context_with(out: &TestOutputDir, loader: Arc<dyn ReportLoader>) -> CheckerContext {
    CheckerContext::with_loader(config(out), loader, EventBus::new())
}

pub fn path(p: &str) -> PathBuf {
    PathBuf::from(p)
}

/// Kinds of every event already delivered to `receiver`
pub fn drain(receiver: &mut Receiver<CheckerEvent>) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        kinds.push(event.kind());
    }
    kinds
}
