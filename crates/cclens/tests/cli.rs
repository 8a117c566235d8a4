use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use testing::{DiagnosticFixture, EventFixture, MetadataFixture, ReportFixture, TestOutputDir};

const MAIN_CPP: &str = "/project/main.cpp";
const HEADER_H: &str = "/project/header.h";

fn output_dir() -> TestOutputDir {
    let out = TestOutputDir::new();
    out.write_report(
        "unit1.plist",
        &ReportFixture::new([MAIN_CPP, HEADER_H])
            .analyzer("clangsa")
            .diagnostic(
                DiagnosticFixture::new("Null dereference", (0, 12, 5))
                    .check_name("core.NullDereference")
                    .event(EventFixture::new("Assuming pointer is null", (1, 4, 3)))
                    .event(EventFixture::new("Null dereference", (0, 12, 5))),
            ),
    );
    out.write_metadata(
        &MetadataFixture::new("nightly")
            .report("unit1.plist", MAIN_CPP)
            .analyzer("clangsa")
            .timestamps(1_600_000_000.0, 1_600_000_125.0),
    );
    out
}

fn cclens(out: &TestOutputDir) -> Command {
    let mut cmd = Command::cargo_bin("cclens").expect("cargo bin cclens");
    cmd.arg("--output").arg(out.path());
    cmd
}

#[test]
fn summary_shows_run() {
    let out = output_dir();
    cclens(&out)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run: nightly"))
        .stdout(predicate::str::contains("Build length: 2:05 s"))
        .stdout(predicate::str::contains("Bugs: 1"));
}

#[test]
fn summary_without_run() {
    let out = TestOutputDir::new();
    cclens(&out)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("No analyzer run found"));
}

#[test]
fn bugs_lists_steps() {
    let out = output_dir();
    cclens(&out)
        .args(["bugs", HEADER_H, MAIN_CPP, "--steps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/project/header.h (1 bugs)"))
        .stdout(predicate::str::contains("[0] /project/main.cpp:12:5 Null dereference"))
        .stdout(predicate::str::contains("1. /project/header.h:4:3 Assuming pointer is null"));
}

#[test]
fn bugs_renders_json() {
    let out = output_dir();
    let assert = cclens(&out)
        .args(["bugs", MAIN_CPP, "--json", "--expand", "0"])
        .assert()
        .success();

    let rendered: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(rendered[HEADER_H][0]["severity"], "information");
    assert_eq!(rendered[MAIN_CPP][0]["source"], "CodeChecker");
}

#[test]
fn list_groups_by_analyzer() {
    let out = output_dir();
    cclens(&out)
        .args(["list", "--sort", "analyzer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 bugs grouped by analyzer"))
        .stdout(predicate::str::contains("clangsa (1)"));
}

#[test]
fn jump_prints_target() {
    let out = output_dir();
    let assert = cclens(&out)
        .args(["jump", MAIN_CPP, "0", "0"])
        .assert()
        .success();

    let jump: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(jump["status"], "found");
    assert_eq!(jump["target"]["file"], HEADER_H);
    assert_eq!(jump["target"]["position"]["line"], 3);
}

#[test]
fn reload_prints_events() {
    let out = output_dir();
    cclens(&out)
        .arg("reload")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"MetadataUpdated""#))
        .stdout(predicate::str::contains(r#""type":"AggregateUpdated""#));
}

#[test]
fn missing_output_folder_fails() {
    Command::cargo_bin("cclens")
        .expect("cargo bin cclens")
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No output folder is configured"));
}
