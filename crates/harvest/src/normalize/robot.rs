// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Robot Framework `output.xml`.
//!
//! Both timestamp styles are read: `starttime`/`endtime` (Robot 6 and
//! earlier) and `start`/`elapsed` (Robot 7).

use super::xml::Element;
use super::{
    Confidence, FormatAdapter, Notes, Report, check_count, parse_timestamp, seconds_to_ms,
};
use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::model::{Framework, TestResult, TestRunResult, TestStatus};

const STATUSES: &[&str] = &["PASS", "FAIL", "SKIP", "NOT RUN", "NOT_RUN"];

pub struct RobotAdapter;

impl FormatAdapter for RobotAdapter {
    fn framework(&self) -> Framework {
        Framework::Robot
    }

    fn detect(&self, report: &Report) -> Confidence {
        let root = report.xml_root_name();
        if !matches!(root, Some("robot" | "suite")) {
            return Confidence::None;
        }
        let has_status = report.xml().is_ok_and(|root| {
            root.any(&|e| e.attr("status").is_some_and(|s| STATUSES.contains(&s)))
        });
        match (root, has_status) {
            (_, true) => Confidence::Certain,
            (Some("robot"), false) => Confidence::Likely,
            _ => Confidence::None,
        }
    }

    fn parse(&self, report: &Report, config: &NormalizeConfig) -> Result<TestRunResult> {
        let root = report.xml()?;
        let suites: Vec<&Element> = match root.name.as_str() {
            "robot" => root.children_named("suite").collect(),
            "suite" => vec![root],
            other => return Err(report.error(format!("unexpected root element <{other}>"))),
        };

        let created_at = root.attr("generated").and_then(parse_timestamp);
        let mut reader = SuiteReader {
            report,
            run: report.empty_run(Framework::Robot, created_at),
            notes: Notes::default(),
            path: Vec::new(),
        };
        if let Some(generator) = root.attr("generator") {
            reader
                .run
                .metadata
                .extra
                .insert("generator".to_string(), generator.into());
        }
        for suite in suites {
            reader.suite(suite)?;
        }

        let SuiteReader {
            mut run, mut notes, ..
        } = reader;
        if let Some(stat) = total_stat(root) {
            for (attr, parsed) in [
                ("pass", run.passed()),
                ("fail", run.failed()),
                ("skip", run.skipped()),
            ] {
                check_count(
                    report,
                    config,
                    &mut notes.warnings,
                    &format!("statistics {attr}"),
                    stat.attr(attr),
                    parsed,
                )?;
            }
        }
        notes.record(&mut run);
        Ok(run)
    }
}

struct SuiteReader<'r, 'a> {
    report: &'r Report<'a>,
    run: TestRunResult,
    notes: Notes,
    /// Names of the enclosing suites.
    path: Vec<String>,
}

impl SuiteReader<'_, '_> {
    fn suite(&mut self, suite: &Element) -> Result<()> {
        let name = suite
            .attr("name")
            .ok_or_else(|| self.report.error("<suite> without name attribute"))?;
        self.path.push(name.to_string());
        for child in &suite.children {
            match child.name.as_str() {
                "suite" => self.suite(child)?,
                "test" => self.test(child)?,
                _ => {}
            }
        }
        self.path.pop();
        Ok(())
    }

    fn test(&mut self, test: &Element) -> Result<()> {
        let name = test
            .attr("name")
            .ok_or_else(|| self.report.error("<test> without name attribute"))?;
        let name = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path.join("."))
        };

        // Status lives on the test itself in flattened output, otherwise on
        // its own <status> child (not those of nested keywords).
        let status_el = if test.attr("status").is_some() {
            test
        } else {
            test.child("status")
                .ok_or_else(|| self.report.error(format!("{name}: missing status")))?
        };
        let status = match status_el.attr("status") {
            Some("PASS") => TestStatus::Passed,
            Some("FAIL") => TestStatus::Failed,
            Some("SKIP" | "NOT RUN" | "NOT_RUN") => TestStatus::Skipped,
            Some(other) => {
                return Err(self.report.error(format!("{name}: unknown status {other:?}")));
            }
            None => return Err(self.report.error(format!("{name}: missing status"))),
        };
        let duration_ms = self.duration_ms(&name, status_el)?;

        let mut result = TestResult::new(Framework::Robot, name, status).with_duration_ms(duration_ms);
        let message = status_el
            .attr("message")
            .filter(|m| !m.is_empty())
            .or_else(|| Some(status_el.text()).filter(|t| !t.is_empty()));
        if status != TestStatus::Passed
            && let Some(message) = message
        {
            result = result.with_error(message);
        }

        let legacy_tags = test.child("tags").into_iter().flat_map(|t| t.children_named("tag"));
        for tag in test.children_named("tag").chain(legacy_tags) {
            if !tag.text().is_empty() {
                result = result.with_tag(tag.text());
            }
        }
        for attr in ["id", "line"] {
            if let Some(value) = test.attr(attr) {
                result = result.with_metadata(attr, value.into());
            }
        }

        self.notes.insert(&mut self.run, result);
        Ok(())
    }

    fn duration_ms(&self, name: &str, el: &Element) -> Result<f64> {
        let invalid = |attr: &str| self.report.error(format!("{name}: invalid {attr}"));

        if let Some(ms) = el.attr("elapsedtime") {
            return ms
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| invalid("elapsedtime"));
        }
        if let Some(secs) = el.attr("elapsed") {
            return seconds_to_ms(secs).ok_or_else(|| invalid("elapsed"));
        }

        let (Some(start), Some(end)) = (el.attr("starttime"), el.attr("endtime")) else {
            return Ok(0.0);
        };
        if start == "N/A" || end == "N/A" {
            return Ok(0.0);
        }
        let start = parse_timestamp(start).ok_or_else(|| invalid("starttime"))?;
        let end = parse_timestamp(end).ok_or_else(|| invalid("endtime"))?;
        let elapsed = (end - start).num_microseconds().unwrap_or(0).max(0);
        Ok(elapsed as f64 / 1000.0)
    }
}

/// The "All Tests" statistic, or the only total statistic present.
fn total_stat(root: &Element) -> Option<&Element> {
    let totals = root.child("statistics")?.child("total")?;
    let stats: Vec<&Element> = totals.children_named("stat").collect();
    match stats.as_slice() {
        [only] => Some(*only),
        _ => stats.iter().copied().find(|s| s.text() == "All Tests"),
    }
}

#[cfg(test)]
#[path = "robot_tests.rs"]
mod tests;
