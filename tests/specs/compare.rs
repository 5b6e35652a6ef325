//! Behavioral specs for run comparison.
//!
//! Runs are built from report files through the full pipeline, then
//! compared pairwise.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use crate::prelude::*;

fn aggregate(dir: &Path, name: &str, tests: &[(&str, &str)], hour: u32) -> TestRunResult {
    let path = write(dir, &format!("{name}.json"), &pytest_report(tests));
    Collector::default()
        .aggregate(
            &AggregateRequest::new([path])
                .with_run_id(name)
                .with_created_at(at(2, hour)),
        )
        .run
}

#[test]
fn status_transitions_between_builds() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = aggregate(dir.path(), "base", &[("t1", "passed"), ("t2", "failed")], 9);
    let current = aggregate(
        dir.path(),
        "head",
        &[("t1", "failed"), ("t2", "passed"), ("t3", "passed")],
        10,
    );

    let result = Comparer::default().compare(&baseline, &current, CompareStrategy::Strict);
    let ids = |names: &[&str]| -> std::collections::BTreeSet<TestId> {
        names.iter().map(|n| id(Framework::Pytest, n)).collect()
    };

    assert_eq!(result.new_tests, ids(&["t3"]));
    assert_eq!(result.newly_failing, ids(&["t1"]));
    assert_eq!(result.newly_passing, ids(&["t2"]));
    assert!(result.removed_tests.is_empty());
}

#[test]
fn self_comparison_is_empty() {
    let run = Collector::default()
        .aggregate(
            &AggregateRequest::new(ci_result_files())
                .with_coverage(ci_report("jacoco.xml"))
                .with_created_at(at(1, 10)),
        )
        .run;

    let result = Comparer::default().compare(&run, &run, CompareStrategy::Strict);
    assert_eq!(result.regressions(), 0);
    assert_eq!(result.improvements(), 0);
    assert!(result.new_tests.is_empty());
    assert!(result.removed_tests.is_empty());
    assert_eq!(result.overall_coverage_delta, Some(0.0));
}

#[test]
fn flaky_failures_are_not_regression_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = aggregate(
        dir.path(),
        "base",
        &[("tests/test_cart.py::test_remove_item", "passed"), ("t2", "passed")],
        9,
    );
    let report = write(
        dir.path(),
        "head.json",
        &pytest_report(&[("tests/test_cart.py::test_remove_item", "failed"), ("t2", "failed")]),
    );
    let current = Collector::default()
        .aggregate(
            &AggregateRequest::new([report])
                .with_flaky_report(ci_report("flaky.json"))
                .with_created_at(at(2, 10)),
        )
        .run;

    let comparer = Comparer::default();
    let comparison = comparer.compare_default(&baseline, &current);
    assert_eq!(comparison.newly_failing.len(), 2);

    let candidates = comparer.find_regression_candidates(&comparison, &current);
    assert_eq!(
        candidates.into_iter().collect::<Vec<_>>(),
        vec![id(Framework::Pytest, "t2")]
    );
}

#[test]
fn summary_lists_sections_in_fixed_order() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = aggregate(dir.path(), "base", &[("t1", "passed"), ("t2", "failed")], 9);
    let current = aggregate(
        dir.path(),
        "head",
        &[("t1", "failed"), ("t2", "passed"), ("t3", "passed")],
        10,
    );

    let comparer = Comparer::default();
    let summary =
        comparer.generate_summary(&comparer.compare(&baseline, &current, CompareStrategy::StatusOnly));
    similar_asserts::assert_eq!(
        summary,
        "\
Comparison base -> head (status_only)
New tests: 1
  pytest:t3
Removed tests: 0
Newly failing: 1
  pytest:t1
Newly passing: 1
  pytest:t2
Regressions: 1
  failing pytest:t1
Improvements: 1
  passing pytest:t2
"
    );
}
