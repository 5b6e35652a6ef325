// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single test outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Framework, TestStatus};

/// Identity of a test: the dedup and match key across files and runs.
///
/// Serialized as `framework:name` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TestId {
    pub framework: Framework,
    /// Fully-qualified test name.
    pub name: String,
}

impl TestId {
    pub fn new(framework: Framework, name: impl Into<String>) -> Self {
        Self {
            framework,
            name: name.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.framework, self.name)
    }
}

impl From<TestId> for String {
    fn from(id: TestId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TestId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Parses the `framework:name` form produced by `Display`.
impl FromStr for TestId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (framework, name) = s
            .split_once(':')
            .ok_or_else(|| format!("expected framework:name, got {s:?}"))?;
        if name.is_empty() {
            return Err(format!("empty test name in {s:?}"));
        }
        Ok(Self::new(framework.parse()?, name))
    }
}

/// Result of a single test in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub framework: Framework,
    /// Fully-qualified test name.
    pub name: String,
    pub status: TestStatus,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Set by flaky-report ingestion only.
    #[serde(default)]
    is_flaky: bool,
    /// Historical pass rate (0-100) from the flaky report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    historical_pass_rate: Option<f64>,
}

impl TestResult {
    pub fn new(framework: Framework, name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            framework,
            name: name.into(),
            status,
            duration_ms: 0.0,
            error_message: None,
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
            is_flaky: false,
            historical_pass_rate: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> TestId {
        TestId::new(self.framework, self.name.clone())
    }

    /// Whether the flaky report marked this test as flaky.
    pub fn is_flaky(&self) -> bool {
        self.is_flaky
    }

    pub fn historical_pass_rate(&self) -> Option<f64> {
        self.historical_pass_rate
    }

    /// Record flaky-report data. The run's own status is left untouched.
    pub(crate) fn apply_flaky_report(&mut self, is_flaky: bool, pass_rate: f64) {
        self.is_flaky = is_flaky;
        self.historical_pass_rate = Some(pass_rate);
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
