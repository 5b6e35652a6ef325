// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pytest-json-report output.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Confidence, FormatAdapter, Notes, Report, check_count};
use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::model::{Framework, TestResult, TestRunResult, TestStatus};

/// Keywords pytest attaches to every test that are not user markers.
const IMPLICIT_KEYWORDS: &[&str] = &["pytestmark", "parametrize", "usefixtures", "()"];

/// Reads the JSON written by `pytest --json-report`.
pub struct PytestAdapter;

impl FormatAdapter for PytestAdapter {
    fn framework(&self) -> Framework {
        Framework::Pytest
    }

    fn detect(&self, report: &Report) -> Confidence {
        let Some(tests) = report.json().and_then(|v| v.get("tests")).and_then(Value::as_array)
        else {
            return if report.has_extension("json") {
                Confidence::Possible
            } else {
                Confidence::None
            };
        };

        match tests.first() {
            Some(test) if test.get("nodeid").is_some() && test.get("outcome").is_some() => {
                Confidence::Certain
            }
            Some(_) => Confidence::None,
            None => Confidence::Likely,
        }
    }

    fn parse(&self, report: &Report, config: &NormalizeConfig) -> Result<TestRunResult> {
        let doc = report
            .json()
            .ok_or_else(|| report.error("invalid JSON"))?;
        let tests = doc
            .get("tests")
            .and_then(Value::as_array)
            .ok_or_else(|| report.error("missing \"tests\" array"))?;

        let created_at = doc.get("created").and_then(Value::as_f64).and_then(epoch_seconds);
        let mut run = report.empty_run(Framework::Pytest, created_at);
        let mut notes = Notes::default();

        for (index, entry) in tests.iter().enumerate() {
            notes.insert(&mut run, parse_test(report, index, entry)?);
        }

        let declared = doc
            .get("summary")
            .and_then(|s| s.get("total"))
            .map(|v| v.to_string());
        check_count(
            report,
            config,
            &mut notes.warnings,
            "summary.total",
            declared.as_deref(),
            tests.len(),
        )?;

        notes.record(&mut run);
        Ok(run)
    }
}

fn parse_test(report: &Report, index: usize, entry: &Value) -> Result<TestResult> {
    let nodeid = entry
        .get("nodeid")
        .and_then(Value::as_str)
        .ok_or_else(|| report.error(format!("tests[{index}]: missing nodeid")))?;
    let outcome = entry
        .get("outcome")
        .and_then(Value::as_str)
        .ok_or_else(|| report.error(format!("tests[{index}]: missing outcome")))?;
    let status = outcome_status(outcome).ok_or_else(|| {
        report.error(format!("tests[{index}]: unknown outcome {outcome:?}"))
    })?;

    let duration_ms = match entry.get("call").and_then(|c| c.get("duration")) {
        None | Some(Value::Null) => 0.0,
        Some(value) => value
            .as_f64()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d * 1000.0)
            .ok_or_else(|| report.error(format!("{nodeid}: invalid call duration")))?,
    };

    let mut test = TestResult::new(Framework::Pytest, nodeid, status).with_duration_ms(duration_ms);

    if status != TestStatus::Passed
        && let Some(message) = error_message(entry)
    {
        test = test.with_error(message);
    }

    if let Some(keywords) = entry.get("keywords").and_then(Value::as_array) {
        for keyword in keywords.iter().filter_map(Value::as_str) {
            if is_marker(nodeid, keyword) {
                test = test.with_tag(keyword);
            }
        }
    }

    if let Some(lineno) = entry.get("lineno").filter(|v| v.is_u64()) {
        test = test.with_metadata("lineno", lineno.clone());
    }
    if !matches!(outcome, "passed" | "failed" | "skipped" | "error") {
        test = test.with_metadata("outcome", Value::from(outcome));
    }
    Ok(test)
}

fn outcome_status(outcome: &str) -> Option<TestStatus> {
    Some(match outcome {
        "passed" | "xpassed" => TestStatus::Passed,
        "failed" => TestStatus::Failed,
        "error" => TestStatus::Error,
        "skipped" | "xfailed" => TestStatus::Skipped,
        "rerun" | "flaky" => TestStatus::Flaky,
        _ => return None,
    })
}

/// First crash message or long representation from the call, setup or
/// teardown phase.
fn error_message(entry: &Value) -> Option<String> {
    ["call", "setup", "teardown"].iter().find_map(|phase| {
        let phase = entry.get(*phase)?;
        let crash = phase
            .get("crash")
            .and_then(|c| c.get("message"))
            .and_then(Value::as_str);
        let message = match crash {
            Some(message) => message.to_string(),
            None => match phase.get("longrepr")? {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            },
        };
        (!message.trim().is_empty()).then_some(message)
    })
}

/// pytest lists the test's own name, module and directories among its
/// keywords; only the rest are user markers.
fn is_marker(nodeid: &str, keyword: &str) -> bool {
    if keyword.is_empty() || IMPLICIT_KEYWORDS.contains(&keyword) {
        return false;
    }
    !nodeid
        .split("::")
        .flat_map(|segment| std::iter::once(segment).chain(segment.split(['/', '[', ']'])))
        .any(|part| part == keyword)
}

fn epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
    DateTime::from_timestamp(whole, nanos.min(999_999_999))
}

#[cfg(test)]
#[path = "pytest_tests.rs"]
mod tests;
