//! Behavioral specs for aggregation.
//!
//! One CI build's reports (four frameworks, two coverage formats and a
//! flaky report) are merged into a single run and persisted.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::prelude::*;

fn ci_request() -> AggregateRequest {
    AggregateRequest::new(ci_result_files())
        .with_coverage(ci_report("jacoco.xml"))
        .with_coverage(ci_report("coverage.json"))
        .with_flaky_report(ci_report("flaky.json"))
        .with_run_id("build-1")
        .with_created_at(at(1, 10))
}

#[test]
fn build_reports_merge_into_one_run() {
    let results = Collector::default().aggregate(&ci_request());

    assert!(results.errors.is_empty(), "{:?}", results.errors);
    assert!(results.duplicates.is_empty());

    let run = &results.run;
    assert_eq!(run.run_id, "build-1");
    assert_eq!(run.created_at, at(1, 10));
    assert_eq!(run.total(), 13);
    assert_eq!(
        run.frameworks.iter().copied().collect::<Vec<_>>(),
        vec![Framework::Pytest, Framework::Junit, Framework::Testng, Framework::Robot]
    );
    // 5 of the 10 executed tests passed; the flaky one counts against.
    assert_eq!(run.passed(), 5);
    assert_eq!(run.failed(), 4);
    assert_eq!(run.skipped(), 3);
    assert_eq!(run.flaky(), 1);
    assert!((run.pass_rate() - 50.0).abs() < 1e-9);
}

#[test]
fn coverage_from_both_formats_is_weighted_by_lines() {
    let run = Collector::default().aggregate(&ci_request()).run;

    let paths: Vec<&str> = run.coverage.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        [
            "com/shop/CartService.java",
            "com/shop/PaymentService.java",
            "shop/cart.py",
            "shop/checkout.py",
        ]
    );
    assert_eq!(run.coverage["com/shop/CartService.java"], FileCoverage::new(36, 40).unwrap());
    let overall = run.overall_coverage().unwrap();
    assert!((overall - 131.0 / 190.0 * 100.0).abs() < 1e-9, "overall = {overall}");
}

#[test]
fn overall_coverage_is_not_an_average_of_percentages() {
    let dir = tempfile::tempdir().unwrap();
    let coverage = write(
        dir.path(),
        "coverage.json",
        r#"{"files": {
            "a.py": {"summary": {"covered_lines": 10, "num_statements": 10}},
            "b.py": {"summary": {"covered_lines": 0, "num_statements": 90}}
        }}"#,
    );
    let results = Collector::default()
        .aggregate(&AggregateRequest::default().with_coverage(coverage).with_created_at(at(1, 0)));
    assert_eq!(results.run.overall_coverage(), Some(10.0));
}

#[test]
fn flaky_report_annotates_without_changing_status() {
    let run = Collector::default().aggregate(&ci_request()).run;

    let cart = run
        .test(&id(Framework::Pytest, "tests/test_cart.py::test_remove_item"))
        .unwrap();
    assert!(cart.is_flaky());
    assert_eq!(cart.historical_pass_rate(), Some(62.5));
    assert_eq!(cart.status, TestStatus::Failed);

    // No framework in the entry: matched by name in any framework.
    let merges = run
        .test(&id(Framework::Junit, "com.shop.CartServiceTest.mergesCarts"))
        .unwrap();
    assert!(merges.is_flaky());

    assert_eq!(
        run.metadata.extra["unmatched_flaky"],
        serde_json::json!(["com.shop.LegacyTest.retired"])
    );
}

#[test]
fn broken_files_are_recorded_not_fatal() {
    let mut request = ci_request();
    request.result_files.push(fixture("broken/truncated.xml"));
    request.result_files.push(fixture("broken/pom.xml"));
    request.coverage_files.push(fixture("broken/pom.xml"));

    let results = Collector::default().aggregate(&request);
    assert_eq!(results.run.total(), 13);
    assert_eq!(results.errors.len(), 3);

    let failed = results.run.metadata.extra["failed_files"].as_array().unwrap();
    assert_eq!(failed.len(), 3);
}

#[test]
fn later_file_wins_for_duplicate_tests() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(
        dir.path(),
        "first.json",
        &pytest_report(&[("t.py::shared", "failed"), ("t.py::only_first", "passed")]),
    );
    let second = write(dir.path(), "second.json", &pytest_report(&[("t.py::shared", "passed")]));
    let shared = id(Framework::Pytest, "t.py::shared");

    let forward = Collector::default()
        .aggregate(&AggregateRequest::new([&first, &second]).with_created_at(at(1, 0)));
    let backward = Collector::default()
        .aggregate(&AggregateRequest::new([&second, &first]).with_created_at(at(1, 0)));

    assert_eq!(forward.run.test(&shared).unwrap().status, TestStatus::Passed);
    assert_eq!(backward.run.test(&shared).unwrap().status, TestStatus::Failed);
    assert_eq!(forward.run.total(), backward.run.total());
    assert_eq!(forward.duplicates, backward.duplicates);
    assert_eq!(
        forward.run.metadata.extra["duplicate_tests"],
        serde_json::json!(["pytest:t.py::shared"])
    );
}

#[test]
fn aggregated_run_is_persisted_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));

    let results = Collector::default().aggregate_run(&ci_request(), &store).unwrap();
    let key = results.record.clone().unwrap();
    assert_eq!(key.as_str(), "20240601T100000000Z_build-1.json");

    let loaded = store.load_runs(&LoadOptions::all()).unwrap();
    assert_eq!(loaded.len(), 1);
    let run = &loaded[0];
    assert_eq!(run.run_id, results.run.run_id);
    assert_eq!(run.created_at, results.run.created_at);
    assert!(run.test_ids().eq(results.run.test_ids()));
    assert!(run.tests().zip(results.run.tests()).all(|(a, b)| a.status == b.status));
    assert_eq!(run.coverage, results.run.coverage);
    assert_eq!(run.metadata.extra["sources"], results.run.metadata.extra["sources"]);
}

#[test]
fn persisted_record_matches_schema() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let results = Collector::default().aggregate_run(&ci_request(), &store).unwrap();

    let path = dir.path().join(results.record.unwrap().as_str());
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let schema = repo_json("docs/specs/run-record.schema.json");
    let validator = jsonschema::validator_for(&schema).expect("schema should be valid");

    let errors: Vec<String> = validator.iter_errors(&record).map(|e| e.to_string()).collect();
    assert!(errors.is_empty(), "record should match schema: {errors:#?}");
}

#[test]
fn storing_the_same_run_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let collector = Collector::default();

    collector.aggregate_run(&ci_request(), &store).unwrap();
    let err = collector.aggregate_run(&ci_request(), &store).unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "expected Storage, got {err:?}");
}
