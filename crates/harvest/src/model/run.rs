// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level result: the unit that is persisted, compared and trended.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coverage::{CoverageMap, overall_coverage};
use super::{FileCoverage, Framework, TestId, TestResult, TestStatus};

/// Free-form run metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Anything else callers or ingestion want to record.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// All results of one test run.
///
/// Tests are unique by [`TestId`]; inserting an existing identity replaces it.
/// Counts, pass rate and overall coverage are derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunResult {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub frameworks: BTreeSet<Framework>,
    #[serde(with = "tests_as_list")]
    tests: BTreeMap<TestId, TestResult>,
    #[serde(default)]
    pub coverage: CoverageMap,
    #[serde(default)]
    pub metadata: RunMetadata,
}

impl TestRunResult {
    pub fn new(run_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            created_at,
            frameworks: BTreeSet::new(),
            tests: BTreeMap::new(),
            coverage: BTreeMap::new(),
            metadata: RunMetadata::default(),
        }
    }

    /// Add tests, later entries replacing earlier ones with the same identity.
    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestResult>) -> Self {
        for test in tests {
            self.insert_test(test);
        }
        self
    }

    /// Insert a test, returning the result it replaced (if any).
    pub fn insert_test(&mut self, test: TestResult) -> Option<TestResult> {
        self.frameworks.insert(test.framework);
        self.tests.insert(test.id(), test)
    }

    pub fn set_coverage(&mut self, path: impl Into<String>, coverage: FileCoverage) {
        self.coverage.insert(path.into(), coverage);
    }

    /// Tests in identity order.
    pub fn tests(&self) -> impl ExactSizeIterator<Item = &TestResult> {
        self.tests.values()
    }

    /// Consume the run, yielding its tests in identity order.
    pub fn into_tests(self) -> impl ExactSizeIterator<Item = TestResult> {
        self.tests.into_values()
    }

    pub fn test(&self, id: &TestId) -> Option<&TestResult> {
        self.tests.get(id)
    }

    pub(crate) fn test_mut(&mut self, id: &TestId) -> Option<&mut TestResult> {
        self.tests.get_mut(id)
    }

    pub fn test_ids(&self) -> impl Iterator<Item = &TestId> {
        self.tests.keys()
    }

    pub fn total(&self) -> usize {
        self.tests.len()
    }

    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    pub fn errors(&self) -> usize {
        self.count(TestStatus::Error)
    }

    pub fn flaky(&self) -> usize {
        self.count(TestStatus::Flaky)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.tests.values().filter(|t| t.status == status).count()
    }

    /// Percentage of executed tests that passed: `passed / (total - skipped)`.
    ///
    /// Skipped tests are excluded from the base; flaky tests are in the base
    /// but not counted as passed. Zero when nothing executed.
    pub fn pass_rate(&self) -> f64 {
        self.rate_of_executed(self.passed())
    }

    /// Percentage of executed tests that failed or errored.
    pub fn failure_rate(&self) -> f64 {
        self.rate_of_executed(self.failed() + self.errors())
    }

    fn rate_of_executed(&self, count: usize) -> f64 {
        let executed = self.total() - self.skipped();
        if executed == 0 {
            return 0.0;
        }
        count as f64 / executed as f64 * 100.0
    }

    /// Covered lines over total lines across all files (0-100).
    pub fn overall_coverage(&self) -> Option<f64> {
        overall_coverage(self.coverage.values())
    }

    /// Sum of all test durations in milliseconds.
    pub fn total_duration_ms(&self) -> f64 {
        self.tests.values().map(|t| t.duration_ms).sum()
    }
}

/// Persist tests as a plain list; reject duplicate identities on load.
mod tests_as_list {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::{TestId, TestResult};

    pub fn serialize<S: Serializer>(
        tests: &BTreeMap<TestId, TestResult>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(tests.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<TestId, TestResult>, D::Error> {
        let list = Vec::<TestResult>::deserialize(deserializer)?;
        let mut tests = BTreeMap::new();
        for test in list {
            let id = test.id();
            if tests.insert(id.clone(), test).is_some() {
                return Err(D::Error::custom(format!("duplicate test identity: {id}")));
            }
        }
        Ok(tests)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
