mod common;

use common::*;
use diagnostics_engine::{AggregateData, CheckerConfig, CheckerContext, MetadataStatus, ReconcileStatus};
use std::path::Path;
use std::sync::Arc;
use testing::{DiagnosticFixture, EventFixture, MetadataFixture, ReportFixture, TestOutputDir};

#[tokio::test]
async fn test_report_reaches_every_file_it_mentions() {
    let out = TestOutputDir::new();
    write_run(&out);
    let context = CheckerContext::new(config(&out));
    context.reload().await.unwrap();

    let diagnostics = context.diagnostics();
    diagnostics.set_open_files([path(MAIN_CPP)]).await;

    let in_main = diagnostics.diagnostics_for(Path::new(MAIN_CPP));
    let in_header = diagnostics.diagnostics_for(Path::new(HEADER_H));
    assert_eq!(in_main.len(), 1);
    assert_eq!(in_main[0].description, "X");
    assert_eq!(in_header.len(), 1);
    assert!(Arc::ptr_eq(&in_main[0], &in_header[0]));
    assert!(diagnostics.diagnostics_for(Path::new(UTIL_CPP)).is_empty());

    assert_eq!(
        diagnostics.cache().cached_paths(),
        vec![out.report_path("unit1.plist")]
    );
}

#[tokio::test]
async fn test_working_set_change_evicts_unneeded_reports() {
    let out = TestOutputDir::new();
    write_run(&out);
    let context = CheckerContext::new(config(&out));
    context.reload().await.unwrap();
    let diagnostics = context.diagnostics();

    diagnostics.set_open_files([path(MAIN_CPP)]).await;
    let status = diagnostics.set_open_files([path(UTIL_CPP)]).await;

    assert!(matches!(
        status,
        ReconcileStatus::Applied {
            loaded: 1,
            evicted: 1,
            failed: 0,
            ..
        }
    ));
    assert_eq!(
        diagnostics.cache().cached_paths(),
        vec![out.report_path("unit2.plist")]
    );
    assert!(diagnostics.diagnostics_for(Path::new(MAIN_CPP)).is_empty());
    assert!(diagnostics.diagnostics_for(Path::new(HEADER_H)).is_empty());
    assert_eq!(diagnostics.diagnostics_for(Path::new(UTIL_CPP)).len(), 2);
}

#[tokio::test]
async fn test_repeated_working_set_parses_nothing() {
    let out = TestOutputDir::new();
    write_run(&out);
    let loader = Arc::new(CountingLoader::default());
    let context = context_with(&out, loader.clone());
    context.metadata().reload().await.unwrap();
    let diagnostics = context.diagnostics();

    diagnostics.set_open_files([path(MAIN_CPP), path(UTIL_CPP)]).await;
    assert_eq!(loader.report_loads(), 2);

    let status = diagnostics.set_open_files([path(UTIL_CPP), path(MAIN_CPP)]).await;
    assert!(matches!(
        status,
        ReconcileStatus::Applied {
            loaded: 0,
            evicted: 0,
            ..
        }
    ));
    assert_eq!(loader.report_loads(), 2);
}

#[tokio::test]
async fn test_sticky_file_survives_closing() {
    let out = TestOutputDir::new();
    write_run(&out);
    let context = CheckerContext::new(config(&out));
    context.reload().await.unwrap();
    let diagnostics = context.diagnostics();

    diagnostics
        .set_working_files([path(UTIL_CPP)], Some(path(MAIN_CPP)))
        .await;
    diagnostics.set_open_files(Vec::new()).await;
    assert_eq!(diagnostics.working_files(), vec![path(MAIN_CPP)]);
    assert_eq!(diagnostics.diagnostics_for(Path::new(MAIN_CPP)).len(), 1);
    assert!(diagnostics.diagnostics_for(Path::new(UTIL_CPP)).is_empty());

    diagnostics.clear_sticky_file().await;
    assert!(diagnostics.cache().is_empty());
}

#[tokio::test]
async fn test_diagnostics_for_any_deduplicates() {
    let out = TestOutputDir::new();
    write_run(&out);
    let context = CheckerContext::new(config(&out));
    context.reload().await.unwrap();
    let diagnostics = context.diagnostics();
    diagnostics.set_open_files([path(MAIN_CPP)]).await;

    let same_file = diagnostics.diagnostics_for_any(&[MAIN_CPP, MAIN_CPP]);
    assert_eq!(same_file.len(), 1);

    // header.h only sees the entry main.cpp already contributed
    let both = diagnostics.diagnostics_for_any(&[MAIN_CPP, HEADER_H]);
    assert_eq!(both.len(), 1);
}

#[tokio::test]
async fn test_missing_metadata_means_no_data() {
    let out = TestOutputDir::new();
    let context = CheckerContext::new(config(&out));
    let summary = context.reload().await.unwrap();

    assert_eq!(summary.metadata, MetadataStatus::Absent);
    assert_eq!(summary.aggregate, Some(AggregateData::NoData));

    let diagnostics = context.diagnostics();
    diagnostics.set_open_files([path(MAIN_CPP)]).await;
    assert!(diagnostics.diagnostics_for(Path::new(MAIN_CPP)).is_empty());
    assert!(diagnostics.cache().is_empty());
    assert!(!diagnostics.has_diagnostics(Path::new(MAIN_CPP)));
}

#[tokio::test]
async fn test_missing_report_is_not_a_failure() {
    let out = TestOutputDir::new();
    write_run(&out);
    out.remove("unit2.plist");
    let context = CheckerContext::new(config(&out));
    let mut receiver = context.events().subscribe();
    context.reload().await.unwrap();

    let status = context
        .diagnostics()
        .set_open_files([path(MAIN_CPP), path(UTIL_CPP)])
        .await;
    assert!(matches!(
        status,
        ReconcileStatus::Applied {
            loaded: 1,
            failed: 0,
            ..
        }
    ));
    assert!(!drain(&mut receiver).contains(&"ReportsFailed"));
}

#[tokio::test]
async fn test_broken_report_is_reported_once() {
    let out = TestOutputDir::new();
    write_run(&out);
    out.write_raw("unit2.plist", "<plist><dict><key>files</key>");
    let context = CheckerContext::new(config(&out));
    context.reload().await.unwrap();
    let mut receiver = context.events().subscribe();

    let status = context
        .diagnostics()
        .set_open_files([path(MAIN_CPP), path(UTIL_CPP)])
        .await;

    assert!(matches!(
        status,
        ReconcileStatus::Applied {
            loaded: 1,
            failed: 1,
            ..
        }
    ));
    assert_eq!(
        drain(&mut receiver),
        vec!["ReportsFailed", "DiagnosticsUpdated"]
    );
    assert_eq!(
        context.diagnostics().diagnostics_for(Path::new(MAIN_CPP)).len(),
        1
    );
}

#[tokio::test]
async fn test_report_path_is_split_into_steps() {
    let out = TestOutputDir::new();
    out.write_report(
        "deep.plist",
        &ReportFixture::new([MAIN_CPP]).diagnostic(
            DiagnosticFixture::new("Division by zero", (0, 30, 7))
                .event(EventFixture::new("Assigning 0", (0, 10, 3)))
                .control()
                .event(EventFixture::new("Taking true branch", (0, 20, 5)))
                .event(EventFixture::new("Division by zero", (0, 30, 7))),
        ),
    );
    out.write_metadata(&MetadataFixture::new("run").report("deep.plist", MAIN_CPP));

    let context = CheckerContext::new(
        CheckerConfig::default().with_output_folder(out.path()),
    );
    context.reload().await.unwrap();
    let diagnostics = context.diagnostics();
    diagnostics.set_open_files([path(MAIN_CPP)]).await;

    let entry = diagnostics.diagnostic(Path::new(MAIN_CPP), 0).unwrap();
    let path = diagnostics_engine::ReproductionPath::new(&entry);
    assert_eq!(path.len(), 3);
    assert_eq!(path.steps().len(), 2);
    assert_eq!(path.terminal().unwrap().message, "Division by zero");

    let summary = context.aggregate().data();
    let summary = summary.summary().unwrap();
    assert_eq!(summary.entries[0].path_length, 3);
}
