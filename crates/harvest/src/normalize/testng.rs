// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TestNG results: native `testng-results.xml`, or JUnit-style XML written by
//! TestNG's JUnit reporter (recognized by its `signature` attributes).

use std::collections::{BTreeMap, BTreeSet};

use super::junit::parse_suites;
use super::xml::Element;
use super::{Confidence, FormatAdapter, Notes, Report, check_count, parse_timestamp};
use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::model::{Framework, TestResult, TestRunResult, TestStatus};

pub struct TestngAdapter;

impl FormatAdapter for TestngAdapter {
    fn framework(&self) -> Framework {
        Framework::Testng
    }

    fn detect(&self, report: &Report) -> Confidence {
        match report.xml_root_name() {
            Some("testng-results") => Confidence::Certain,
            Some("testsuites" | "testsuite") => match report.xml() {
                Ok(root) if root.any(&|e| e.attr("signature").is_some()) => Confidence::Certain,
                _ => Confidence::None,
            },
            _ => Confidence::None,
        }
    }

    fn parse(&self, report: &Report, config: &NormalizeConfig) -> Result<TestRunResult> {
        let root = report.xml()?;
        if root.name == "testng-results" {
            parse_native(report, root, config)
        } else {
            parse_suites(report, root, Framework::Testng, config)
        }
    }
}

/// Methods seen in a native report, by outcome.
#[derive(Default)]
struct Tally {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

fn parse_native(
    report: &Report,
    root: &Element,
    config: &NormalizeConfig,
) -> Result<TestRunResult> {
    let created_at = root
        .children_named("suite")
        .find_map(|s| s.attr("started-at").and_then(parse_timestamp));
    let mut run = report.empty_run(Framework::Testng, created_at);
    let mut notes = Notes::default();
    let mut tally = Tally::default();

    for suite in root.children_named("suite") {
        let groups = suite_groups(suite);
        for test in suite.children_named("test") {
            for class in test.children_named("class") {
                let class_name = class
                    .attr("name")
                    .ok_or_else(|| report.error("<class> without name attribute"))?;
                for method in class.children_named("test-method") {
                    if method.attr("is-config") == Some("true") {
                        continue;
                    }
                    let result = test_method(report, class_name, method, &groups)?;
                    tally.total += 1;
                    match result.status {
                        TestStatus::Passed => tally.passed += 1,
                        TestStatus::Skipped => tally.skipped += 1,
                        _ => tally.failed += 1,
                    }
                    notes.insert(&mut run, result);
                }
            }
        }
    }

    for (attr, parsed) in [
        ("total", tally.total),
        ("passed", tally.passed),
        ("failed", tally.failed),
        ("skipped", tally.skipped),
    ] {
        check_count(
            report,
            config,
            &mut notes.warnings,
            &format!("<testng-results> {attr}"),
            root.attr(attr),
            parsed,
        )?;
    }

    notes.record(&mut run);
    Ok(run)
}

fn test_method(
    report: &Report,
    class_name: &str,
    method: &Element,
    groups: &BTreeMap<(String, String), BTreeSet<String>>,
) -> Result<TestResult> {
    let method_name = method
        .attr("name")
        .ok_or_else(|| report.error(format!("{class_name}: <test-method> without name")))?;
    let mut name = format!("{class_name}.{method_name}");
    let params = method_params(method);
    if !params.is_empty() {
        name = format!("{name}({})", params.join(", "));
    }

    let exception = method.child("exception");
    let status = match method.attr("status") {
        Some("PASS") => TestStatus::Passed,
        Some("SKIP") => TestStatus::Skipped,
        Some("FAIL") => match exception.and_then(|e| e.attr("class")) {
            Some(class) if !is_assertion(class) => TestStatus::Error,
            _ => TestStatus::Failed,
        },
        Some(other) => return Err(report.error(format!("{name}: unknown status {other:?}"))),
        None => return Err(report.error(format!("{name}: missing status"))),
    };

    let duration_ms = match method.attr("duration-ms") {
        None => 0.0,
        Some(ms) => ms
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| report.error(format!("{name}: invalid duration-ms {ms:?}")))?,
    };

    let mut test = TestResult::new(Framework::Testng, name, status).with_duration_ms(duration_ms);
    if let Some(exception) = exception {
        let message = exception
            .child("message")
            .map(Element::text)
            .filter(|m| !m.is_empty())
            .or(exception.attr("class"));
        if let Some(message) = message {
            test = test.with_error(message);
        }
        if let Some(class) = exception.attr("class") {
            test = test.with_metadata("error_type", class.into());
        }
    }
    if let Some(description) = method.attr("description") {
        test = test.with_metadata("description", description.into());
    }
    let key = (class_name.to_string(), method_name.to_string());
    for group in groups.get(&key).into_iter().flatten() {
        test = test.with_tag(group.clone());
    }
    Ok(test)
}

/// Assertion failures are test failures; any other exception is an error.
fn is_assertion(exception_class: &str) -> bool {
    let simple = exception_class.rsplit('.').next().unwrap_or(exception_class);
    simple.contains("Assert") || simple.ends_with("ComparisonFailure")
}

fn method_params(method: &Element) -> Vec<String> {
    let Some(params) = method.child("params") else {
        return Vec::new();
    };
    params
        .children_named("param")
        .map(|param| match param.child("value") {
            Some(value) if value.attr("is-null") == Some("true") => "null".to_string(),
            Some(value) => value.text().to_string(),
            None => String::new(),
        })
        .collect()
}

/// Group membership declared in a suite's `<groups>` block, keyed by
/// (class, method).
fn suite_groups(suite: &Element) -> BTreeMap<(String, String), BTreeSet<String>> {
    let mut groups: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    let Some(block) = suite.child("groups") else {
        return groups;
    };
    for group in block.children_named("group") {
        let Some(group_name) = group.attr("name") else {
            continue;
        };
        for method in group.children_named("method") {
            if let (Some(class), Some(name)) = (method.attr("class"), method.attr("name")) {
                groups
                    .entry((class.to_string(), name.to_string()))
                    .or_default()
                    .insert(group_name.to_string());
            }
        }
    }
    groups
}

#[cfg(test)]
#[path = "testng_tests.rs"]
mod tests;
