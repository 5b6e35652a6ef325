// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit XML (`<testsuites>` / `<testsuite>` / `<testcase>`).
//!
//! Surefire's rerun elements are understood: a case whose only failures are
//! `flakyFailure` or `flakyError` passed on retry and is reported as flaky.

use chrono::{DateTime, Utc};

use super::xml::Element;
use super::{
    Confidence, FormatAdapter, Notes, Report, check_count, parse_timestamp, seconds_to_ms,
};
use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::model::{Framework, TestResult, TestRunResult, TestStatus};

/// Outcome elements in precedence order.
const OUTCOMES: &[(&str, TestStatus)] = &[
    ("failure", TestStatus::Failed),
    ("error", TestStatus::Error),
    ("skipped", TestStatus::Skipped),
    ("flakyFailure", TestStatus::Flaky),
    ("flakyError", TestStatus::Flaky),
];

const RERUNS: &[&str] = &["flakyFailure", "flakyError", "rerunFailure", "rerunError"];

pub struct JunitAdapter;

impl FormatAdapter for JunitAdapter {
    fn framework(&self) -> Framework {
        Framework::Junit
    }

    fn detect(&self, report: &Report) -> Confidence {
        if !matches!(report.xml_root_name(), Some("testsuites" | "testsuite")) {
            return if report.has_extension("xml") {
                Confidence::Possible
            } else {
                Confidence::None
            };
        }
        let Ok(root) = report.xml() else {
            return Confidence::Likely;
        };
        // TestNG's JUnit reporter adds method signatures.
        if root.any(&|e| e.attr("signature").is_some()) {
            return Confidence::Likely;
        }
        if root.any(&|e| e.name == "testcase") {
            Confidence::Certain
        } else {
            Confidence::Likely
        }
    }

    fn parse(&self, report: &Report, config: &NormalizeConfig) -> Result<TestRunResult> {
        parse_suites(report, report.xml()?, Framework::Junit, config)
    }
}

/// Read a JUnit-style document into a run attributed to `framework`.
pub(super) fn parse_suites(
    report: &Report,
    root: &Element,
    framework: Framework,
    config: &NormalizeConfig,
) -> Result<TestRunResult> {
    if !matches!(root.name.as_str(), "testsuites" | "testsuite") {
        return Err(report.error(format!("unexpected root element <{}>", root.name)));
    }

    let mut reader = SuiteReader {
        report,
        config,
        framework,
        run: report.empty_run(framework, first_timestamp(root)),
        notes: Notes::default(),
    };
    reader.suite(root)?;

    let SuiteReader {
        mut run, notes, ..
    } = reader;
    notes.record(&mut run);
    Ok(run)
}

/// Test cases seen below a suite element.
#[derive(Default)]
struct Tally {
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
}

impl Tally {
    fn add(&mut self, other: &Tally) {
        self.tests += other.tests;
        self.failures += other.failures;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }
}

struct SuiteReader<'r, 'a> {
    report: &'r Report<'a>,
    config: &'r NormalizeConfig,
    framework: Framework,
    run: TestRunResult,
    notes: Notes,
}

impl SuiteReader<'_, '_> {
    fn suite(&mut self, suite: &Element) -> Result<Tally> {
        let mut tally = Tally::default();
        for child in &suite.children {
            match child.name.as_str() {
                "testsuite" => tally.add(&self.suite(child)?),
                "testcase" => {
                    tally.tests += 1;
                    match self.testcase(child)? {
                        TestStatus::Failed => tally.failures += 1,
                        TestStatus::Error => tally.errors += 1,
                        TestStatus::Skipped => tally.skipped += 1,
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let label = match suite.attr("name") {
            Some(name) => format!("<{} name={name:?}>", suite.name),
            None => format!("<{}>", suite.name),
        };
        for (attr, parsed) in [
            ("tests", tally.tests),
            ("failures", tally.failures),
            ("errors", tally.errors),
            ("skipped", tally.skipped),
        ] {
            check_count(
                self.report,
                self.config,
                &mut self.notes.warnings,
                &format!("{label} {attr}"),
                suite.attr(attr),
                parsed,
            )?;
        }
        Ok(tally)
    }

    fn testcase(&mut self, case: &Element) -> Result<TestStatus> {
        let name = case
            .attr("name")
            .ok_or_else(|| self.report.error("<testcase> without name attribute"))?;
        let name = match case.attr("classname").filter(|c| !c.is_empty()) {
            Some(class) => format!("{class}.{name}"),
            None => name.to_string(),
        };

        let duration_ms = match case.attr("time").filter(|t| !t.trim().is_empty()) {
            None => 0.0,
            Some(time) => seconds_to_ms(time)
                .ok_or_else(|| self.report.error(format!("{name}: invalid time {time:?}")))?,
        };

        let (status, outcome) = OUTCOMES
            .iter()
            .find_map(|(tag, status)| case.child(tag).map(|el| (*status, Some(el))))
            .unwrap_or((TestStatus::Passed, None));

        let mut test = TestResult::new(self.framework, name, status).with_duration_ms(duration_ms);
        if let Some(outcome) = outcome {
            if let Some(message) = outcome_message(outcome) {
                test = test.with_error(message);
            }
            if let Some(kind) = outcome.attr("type") {
                test = test.with_metadata("error_type", kind.into());
            }
        }

        let reruns = case
            .children
            .iter()
            .filter(|c| RERUNS.contains(&c.name.as_str()))
            .count();
        if reruns > 0 {
            test = test.with_metadata("reruns", reruns.into());
        }
        for attr in ["file", "line"] {
            if let Some(value) = case.attr(attr) {
                test = test.with_metadata(attr, value.into());
            }
        }
        if let Some(properties) = case.child("properties") {
            for property in properties.children_named("property") {
                if let Some(key) = property.attr("name") {
                    let value = property.attr("value").unwrap_or_else(|| property.text());
                    test = test.with_metadata(key, value.into());
                }
            }
        }

        self.notes.insert(&mut self.run, test);
        Ok(status)
    }
}

fn outcome_message(outcome: &Element) -> Option<String> {
    outcome
        .attr("message")
        .filter(|m| !m.trim().is_empty())
        .or_else(|| Some(outcome.text()).filter(|t| !t.is_empty()))
        .map(str::to_string)
}

/// First suite `timestamp`, depth first.
fn first_timestamp(element: &Element) -> Option<DateTime<Utc>> {
    if let Some(ts) = element.attr("timestamp").and_then(parse_timestamp) {
        return Some(ts);
    }
    element
        .children_named("testsuite")
        .find_map(first_timestamp)
}

#[cfg(test)]
#[path = "junit_tests.rs"]
mod tests;
