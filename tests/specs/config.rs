//! Behavioral specs for `harvest.toml`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use harvest::config::{self, CONFIG_FILE_NAME};

use crate::prelude::*;

const MISCOUNTED: &str = r#"<testsuite name="Orders" tests="3">
  <testcase classname="Orders" name="places"/>
  <testcase classname="Orders" name="cancels"/>
</testsuite>"#;

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config::discover(dir.path()).unwrap();

    assert_eq!(config.compare.strategy, CompareStrategy::Strict);
    assert_eq!(config.compare.performance_threshold, 0.2);
    assert_eq!(config.trend.min_data_points, 3);
    assert_eq!(config.storage.root, std::path::Path::new(".harvest/runs"));
}

#[test]
fn config_drives_every_component() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        r#"version = 1

[storage]
root = "history"

[normalize]
strict_counts = true

[compare]
strategy = "status_only"

[trend]
min_data_points = 5
window = "30d"
"#,
    );
    let config = config::discover(dir.path()).unwrap();

    let store = FsStore::from_config(dir.path(), &config.storage);
    assert_eq!(store.root(), dir.path().join("history"));

    let report = write(dir.path(), "orders.xml", MISCOUNTED);
    let results = Collector::new(config.normalize.clone())
        .aggregate(&AggregateRequest::new([report]).with_created_at(at(1, 0)));
    assert_eq!(results.errors.len(), 1, "strict counts reject the report");
    assert!(matches!(results.errors[0].error, Error::Parse { .. }));

    let comparer = Comparer::new(config.compare.clone());
    let run = TestRunResult::new("r", at(1, 0));
    assert_eq!(
        comparer.compare_default(&run, &run).strategy,
        CompareStrategy::StatusOnly
    );

    assert_eq!(config.trend.min_data_points, 5);
    let options = config.trend.load_options(at(30, 0));
    assert_eq!(options.since, Some(at(30, 0) - chrono::Duration::days(30)));
}

#[test]
fn lenient_counts_record_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let report = write(dir.path(), "orders.xml", MISCOUNTED);
    let results = Collector::default()
        .aggregate(&AggregateRequest::new([&report]).with_created_at(at(1, 0)));

    assert!(results.errors.is_empty());
    let warnings = results.run.metadata.extra["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("report declares 3, parsed 2"));
}

#[test]
fn unsupported_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), CONFIG_FILE_NAME, "version = 2\n");
    let err = config::discover(dir.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported config version 2"));
}

#[test]
fn invalid_threshold_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        "version = 1\n[trend]\nanomaly_k = 0.0\n",
    );
    let err = config::discover(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("trend.anomaly_k"));
}
