//! Test helpers for behavioral specifications.
//!
//! Fixture paths, fixed timestamps and small report builders shared by the
//! spec modules.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

pub use harvest::collect::{AggregateRequest, AggregatedResults, Collector};
pub use harvest::{
    CompareStrategy, Comparer, Error, FileCoverage, Framework, FsStore, LoadOptions, Metric,
    Normalizer, RunStore, TestId, TestRunResult, TestStatus, TrendAnalyzer, TrendDirection,
};

/// Repository root (two levels above the crate manifest).
pub fn repo_root() -> PathBuf {
    let manifest_dir =
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR should be set");
    PathBuf::from(manifest_dir)
        .parent()
        .expect("parent should exist")
        .parent()
        .expect("grandparent should exist")
        .to_path_buf()
}

/// Path to a fixture directory or file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    repo_root().join("tests").join("fixtures").join(name)
}

/// A report from the `ci-run` fixture: one build's worth of reports.
pub fn ci_report(name: &str) -> PathBuf {
    fixture("ci-run").join(name)
}

/// All result reports of the `ci-run` fixture, in merge order.
pub fn ci_result_files() -> Vec<PathBuf> {
    [
        "pytest-report.json",
        "TEST-com.shop.CartServiceTest.xml",
        "testng-results.xml",
        "output.xml",
    ]
    .into_iter()
    .map(ci_report)
    .collect()
}

/// Load a JSON document shipped with the repository (e.g. a schema).
pub fn repo_json(relative: &str) -> serde_json::Value {
    let content = std::fs::read_to_string(repo_root().join(relative)).unwrap();
    serde_json::from_str(&content).unwrap()
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn id(framework: Framework, name: &str) -> TestId {
    TestId::new(framework, name)
}

/// Write `content` to `dir/name` and return the path.
pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A pytest-json-report document with the given (nodeid, outcome) pairs.
pub fn pytest_report(tests: &[(&str, &str)]) -> String {
    let tests: Vec<serde_json::Value> = tests
        .iter()
        .map(|(nodeid, outcome)| {
            serde_json::json!({
                "nodeid": nodeid,
                "outcome": outcome,
                "call": {"duration": 0.1},
            })
        })
        .collect();
    serde_json::json!({ "tests": tests }).to_string()
}

/// A pytest report whose pass rate is `passed` percent of 20 tests.
pub fn pytest_pass_rate(passed_percent: usize) -> String {
    let passed = passed_percent * 20 / 100;
    let tests: Vec<(String, &str)> = (0..20)
        .map(|i| {
            let outcome = if i < passed { "passed" } else { "failed" };
            (format!("tests/test_app.py::test_{i:02}"), outcome)
        })
        .collect();
    let refs: Vec<(&str, &str)> = tests.iter().map(|(n, o)| (n.as_str(), *o)).collect();
    pytest_report(&refs)
}
