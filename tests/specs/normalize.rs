//! Behavioral specs for report normalization.
//!
//! Every supported framework is read from a real report and checked in
//! canonical form: identity, status, duration, message and tags.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::prelude::*;
use yare::parameterized;

fn normalize(name: &str) -> TestRunResult {
    Normalizer::default().normalize(&ci_report(name), None).unwrap()
}

// =============================================================================
// Detection
// =============================================================================

#[parameterized(
    pytest = { "pytest-report.json", Framework::Pytest },
    junit = { "TEST-com.shop.CartServiceTest.xml", Framework::Junit },
    testng = { "testng-results.xml", Framework::Testng },
    robot = { "output.xml", Framework::Robot },
)]
fn framework_is_detected_from_content(report: &str, expected: Framework) {
    let run = normalize(report);
    assert_eq!(run.frameworks.iter().copied().collect::<Vec<_>>(), vec![expected]);
    assert!(run.tests().all(|t| t.framework == expected));
}

#[test]
fn unrelated_xml_is_an_unknown_framework() {
    let err = Normalizer::default()
        .normalize(&fixture("broken/pom.xml"), None)
        .unwrap_err();
    assert!(
        matches!(err, Error::UnknownFramework { .. }),
        "expected UnknownFramework, got {err:?}"
    );
}

#[test]
fn truncated_report_is_a_parse_error() {
    let err = Normalizer::default()
        .normalize(&fixture("broken/truncated.xml"), None)
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "expected Parse, got {err:?}");
    assert!(err.to_string().contains("truncated.xml"));
}

#[test]
fn hint_overrides_detection() {
    let run = Normalizer::default()
        .normalize(&ci_report("TEST-com.shop.CartServiceTest.xml"), Some(Framework::Testng))
        .unwrap();
    assert!(run
        .test(&id(Framework::Testng, "com.shop.CartServiceTest.addsItem"))
        .is_some());
    assert!(run.test(&id(Framework::Junit, "com.shop.CartServiceTest.addsItem")).is_none());
}

// =============================================================================
// Canonical results per framework
// =============================================================================

#[test]
fn pytest_report_is_normalized() {
    let run = normalize("pytest-report.json");

    assert_eq!(run.run_id, "pytest-report");
    assert_eq!(run.created_at, at(1, 9));
    assert_eq!((run.total(), run.passed(), run.failed(), run.skipped()), (4, 2, 1, 1));

    let failed = run
        .test(&id(Framework::Pytest, "tests/test_cart.py::test_remove_item"))
        .unwrap();
    assert_eq!(failed.status, TestStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("AssertionError: assert 2 == 1"));
    assert!((failed.duration_ms - 34.0).abs() < 1e-9);

    let smoke = run
        .test(&id(Framework::Pytest, "tests/test_cart.py::test_add_item"))
        .unwrap();
    assert_eq!(smoke.tags.iter().collect::<Vec<_>>(), ["smoke"]);
    assert_eq!(smoke.error_message, None);

    let param = run
        .test(&id(Framework::Pytest, "tests/test_checkout.py::test_pay[visa]"))
        .unwrap();
    assert!(param.tags.is_empty(), "implicit keywords are not tags: {:?}", param.tags);
}

#[test]
fn junit_report_is_normalized() {
    let run = normalize("TEST-com.shop.CartServiceTest.xml");

    assert_eq!(run.created_at, at(1, 9) + chrono::Duration::minutes(1));
    assert_eq!(run.total(), 4);

    let failed = run
        .test(&id(Framework::Junit, "com.shop.CartServiceTest.appliesDiscount"))
        .unwrap();
    assert_eq!(failed.status, TestStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("expected: <90> but was: <100>"));
    assert_eq!(failed.metadata["error_type"], "org.opentest4j.AssertionFailedError");

    let rerun = run
        .test(&id(Framework::Junit, "com.shop.CartServiceTest.mergesCarts"))
        .unwrap();
    assert_eq!(rerun.status, TestStatus::Flaky);
    assert_eq!(rerun.metadata["reruns"], 1);

    let skipped = run
        .test(&id(Framework::Junit, "com.shop.CartServiceTest.exportsCsv"))
        .unwrap();
    assert_eq!(skipped.status, TestStatus::Skipped);
    assert!(run.metadata.extra.get("warnings").is_none(), "counts agree");
}

#[test]
fn testng_native_report_is_normalized() {
    let run = normalize("testng-results.xml");

    assert_eq!(run.total(), 3, "configuration methods are not tests");
    assert_eq!(run.created_at, at(1, 9) + chrono::Duration::minutes(2));

    let refunds = run
        .test(&id(Framework::Testng, "com.shop.PaymentTest.refunds"))
        .unwrap();
    assert_eq!(refunds.status, TestStatus::Failed);
    assert_eq!(refunds.error_message.as_deref(), Some("expected [200] but found [500]"));
    assert_eq!(refunds.duration_ms, 420.0);
    assert!(refunds.tags.contains("integration"));

    let voids = run.test(&id(Framework::Testng, "com.shop.PaymentTest.voids")).unwrap();
    assert_eq!(voids.status, TestStatus::Skipped);
}

#[test]
fn robot_output_is_normalized() {
    let run = normalize("output.xml");

    assert_eq!(run.created_at, at(1, 9) + chrono::Duration::minutes(3));
    assert_eq!(run.total(), 2);

    let valid = run
        .test(&id(Framework::Robot, "Checkout.Login.Valid Login"))
        .unwrap();
    assert_eq!(valid.status, TestStatus::Passed);
    assert_eq!(valid.duration_ms, 1250.0);
    assert!(valid.tags.contains("smoke"));

    let invalid = run
        .test(&id(Framework::Robot, "Checkout.Login.Invalid Password"))
        .unwrap();
    assert_eq!(invalid.status, TestStatus::Failed);
    assert_eq!(
        invalid.error_message.as_deref(),
        Some("Page should have contained text 'Invalid'")
    );
}

// =============================================================================
// Properties
// =============================================================================

#[parameterized(
    pytest = { "pytest-report.json" },
    junit = { "TEST-com.shop.CartServiceTest.xml" },
    testng = { "testng-results.xml" },
    robot = { "output.xml" },
)]
fn normalization_is_pure(report: &str) {
    let first = serde_json::to_string(&normalize(report)).unwrap();
    let second = serde_json::to_string(&normalize(report)).unwrap();
    similar_asserts::assert_eq!(first, second);
}

#[test]
fn batch_isolates_failures() {
    let mut files = ci_result_files();
    files.insert(1, fixture("broken/truncated.xml"));
    files.push(fixture("broken/pom.xml"));

    let outcome = Normalizer::default().normalize_batch(&files, None);
    assert_eq!(outcome.runs.len(), 4);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors.iter().all(|e| e.error.is_per_file()));
}
