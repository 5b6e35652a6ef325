// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Flaky-test report ingestion.
//!
//! A flaky report is produced by an external history analysis. It annotates
//! tests with a flaky flag and a historical pass rate; it never changes the
//! status a test had in the run being aggregated.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Framework, TestId, TestRunResult};

/// One annotated test.
#[derive(Debug, Clone, PartialEq)]
pub struct FlakyEntry {
    pub test_name: String,
    /// Historical pass rate, 0-100.
    pub pass_rate: f64,
    pub is_flaky: bool,
    /// Restricts matching to one framework; otherwise the name matches in any.
    pub framework: Option<Framework>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlakyReport {
    pub entries: Vec<FlakyEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    List(Vec<RawEntry>),
    Wrapped {
        #[serde(alias = "flaky_tests")]
        tests: Vec<RawEntry>,
    },
}

#[derive(Deserialize)]
struct RawEntry {
    test_name: String,
    pass_rate: f64,
    is_flaky: bool,
    #[serde(default)]
    framework: Option<String>,
}

/// Read and parse a flaky report file.
pub fn load_flaky_report(path: &Path) -> Result<FlakyReport> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_flaky_report(path, &text)
}

/// Parse flaky report content: a JSON array of entries, or an object with a
/// `tests` (or `flaky_tests`) array.
pub fn parse_flaky_report(path: &Path, text: &str) -> Result<FlakyReport> {
    let document: Document = serde_json::from_str(text)
        .map_err(|e| Error::parse(path, format!("invalid flaky report: {e}")))?;
    let raw = match document {
        Document::List(entries) | Document::Wrapped { tests: entries } => entries,
    };

    let entries = raw
        .into_iter()
        .map(|entry| {
            if !(0.0..=100.0).contains(&entry.pass_rate) {
                return Err(Error::parse(
                    path,
                    format!(
                        "{}: pass_rate {} outside 0-100",
                        entry.test_name, entry.pass_rate
                    ),
                ));
            }
            let framework = entry
                .framework
                .as_deref()
                .map(str::parse::<Framework>)
                .transpose()
                .map_err(|e| Error::parse(path, format!("{}: {e}", entry.test_name)))?;
            Ok(FlakyEntry {
                test_name: entry.test_name,
                pass_rate: entry.pass_rate,
                is_flaky: entry.is_flaky,
                framework,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FlakyReport { entries })
}

impl FlakyReport {
    /// Annotate matching tests in `run`. Returns the names of entries that
    /// matched no test.
    pub fn apply(&self, run: &mut TestRunResult) -> Vec<String> {
        let mut unmatched = Vec::new();
        for entry in &self.entries {
            let ids: Vec<TestId> = run
                .test_ids()
                .filter(|id| {
                    id.name == entry.test_name
                        && entry.framework.is_none_or(|f| f == id.framework)
                })
                .cloned()
                .collect();
            if ids.is_empty() {
                unmatched.push(entry.test_name.clone());
                continue;
            }
            for id in &ids {
                if let Some(test) = run.test_mut(id) {
                    test.apply_flaky_report(entry.is_flaky, entry.pass_rate);
                }
            }
        }
        unmatched
    }
}

#[cfg(test)]
#[path = "flaky_tests.rs"]
mod tests;
