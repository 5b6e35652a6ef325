// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run-to-run comparison.
//!
//! Tests are matched by identity, coverage by file path. Every collection in
//! a [`ComparisonResult`] is ordered, so the same inputs always produce the
//! same result and summary.

mod summary;

pub use summary::Summary;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::CompareConfig;
use crate::model::{TestId, TestRunResult, TestStatus};

/// Which aspects of two runs to compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStrategy {
    /// Status, duration and coverage.
    #[default]
    Strict,
    /// Test set and status transitions only.
    StatusOnly,
    /// Durations only.
    Performance,
    /// Coverage only.
    Coverage,
}

impl CompareStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareStrategy::Strict => "strict",
            CompareStrategy::StatusOnly => "status_only",
            CompareStrategy::Performance => "performance",
            CompareStrategy::Coverage => "coverage",
        }
    }

    fn status(self) -> bool {
        matches!(self, CompareStrategy::Strict | CompareStrategy::StatusOnly)
    }

    fn performance(self) -> bool {
        matches!(self, CompareStrategy::Strict | CompareStrategy::Performance)
    }

    fn coverage(self) -> bool {
        matches!(self, CompareStrategy::Strict | CompareStrategy::Coverage)
    }
}

impl fmt::Display for CompareStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(CompareStrategy::Strict),
            "status_only" => Ok(CompareStrategy::StatusOnly),
            "performance" => Ok(CompareStrategy::Performance),
            "coverage" => Ok(CompareStrategy::Coverage),
            other => Err(format!(
                "unknown compare strategy: {other} (expected one of: strict, status_only, performance, coverage)"
            )),
        }
    }
}

/// Duration change of a test present in both runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationDelta {
    pub baseline_ms: f64,
    pub current_ms: f64,
    /// Relative change: `(current - baseline) / baseline`.
    pub relative: f64,
}

/// Coverage change of a file present in both runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageDelta {
    pub baseline_percent: f64,
    pub current_percent: f64,
    /// Change in percentage points.
    pub delta: f64,
}

/// Differences between a baseline run and a current run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline_run_id: String,
    pub current_run_id: String,
    pub strategy: CompareStrategy,

    /// In current, not in baseline.
    pub new_tests: BTreeSet<TestId>,
    /// In baseline, not in current.
    pub removed_tests: BTreeSet<TestId>,
    /// Passed or skipped before, failed or errored now.
    pub newly_failing: BTreeSet<TestId>,
    /// Failed or errored before, passed or skipped now.
    pub newly_passing: BTreeSet<TestId>,

    pub duration_deltas: BTreeMap<TestId, DurationDelta>,
    pub slower: BTreeSet<TestId>,
    pub faster: BTreeSet<TestId>,

    pub coverage_deltas: BTreeMap<String, CoverageDelta>,
    pub coverage_improved: BTreeSet<String>,
    pub coverage_degraded: BTreeSet<String>,
    /// Overall coverage change in percentage points, when both runs have
    /// coverage.
    pub overall_coverage_delta: Option<f64>,
}

impl ComparisonResult {
    fn empty(baseline: &TestRunResult, current: &TestRunResult, strategy: CompareStrategy) -> Self {
        Self {
            baseline_run_id: baseline.run_id.clone(),
            current_run_id: current.run_id.clone(),
            strategy,
            new_tests: BTreeSet::new(),
            removed_tests: BTreeSet::new(),
            newly_failing: BTreeSet::new(),
            newly_passing: BTreeSet::new(),
            duration_deltas: BTreeMap::new(),
            slower: BTreeSet::new(),
            faster: BTreeSet::new(),
            coverage_deltas: BTreeMap::new(),
            coverage_improved: BTreeSet::new(),
            coverage_degraded: BTreeSet::new(),
            overall_coverage_delta: None,
        }
    }

    /// Newly failing tests, slower tests and files with degraded coverage.
    pub fn regressions(&self) -> usize {
        self.newly_failing.len() + self.slower.len() + self.coverage_degraded.len()
    }

    /// Newly passing tests, faster tests and files with improved coverage.
    pub fn improvements(&self) -> usize {
        self.newly_passing.len() + self.faster.len() + self.coverage_improved.len()
    }

    pub fn has_regressions(&self) -> bool {
        self.regressions() > 0
    }

    /// Human-readable report with a fixed section order.
    pub fn summary(&self) -> Summary<'_> {
        Summary::new(self)
    }
}

/// Compares runs using configured thresholds.
#[derive(Debug, Clone, Default)]
pub struct Comparer {
    config: CompareConfig,
}

impl Comparer {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare with the configured default strategy.
    pub fn compare_default(
        &self,
        baseline: &TestRunResult,
        current: &TestRunResult,
    ) -> ComparisonResult {
        self.compare(baseline, current, self.config.strategy)
    }

    pub fn compare(
        &self,
        baseline: &TestRunResult,
        current: &TestRunResult,
        strategy: CompareStrategy,
    ) -> ComparisonResult {
        let mut result = ComparisonResult::empty(baseline, current, strategy);
        if strategy.status() {
            self.compare_status(baseline, current, &mut result);
        }
        if strategy.performance() {
            self.compare_durations(baseline, current, &mut result);
        }
        if strategy.coverage() {
            self.compare_coverage(baseline, current, &mut result);
        }

        tracing::debug!(
            "compared {} -> {} ({strategy}): {} regressions, {} improvements",
            result.baseline_run_id,
            result.current_run_id,
            result.regressions(),
            result.improvements()
        );
        result
    }

    fn compare_status(
        &self,
        baseline: &TestRunResult,
        current: &TestRunResult,
        result: &mut ComparisonResult,
    ) {
        for test in current.tests() {
            let id = test.id();
            match baseline.test(&id) {
                None => {
                    result.new_tests.insert(id);
                }
                Some(before) if before.status.is_non_failing() && test.status.is_failure() => {
                    result.newly_failing.insert(id);
                }
                Some(before) if before.status.is_failure() && test.status.is_non_failing() => {
                    result.newly_passing.insert(id);
                }
                Some(_) => {}
            }
        }
        result.removed_tests = baseline
            .test_ids()
            .filter(|id| current.test(id).is_none())
            .cloned()
            .collect();
    }

    fn compare_durations(
        &self,
        baseline: &TestRunResult,
        current: &TestRunResult,
        result: &mut ComparisonResult,
    ) {
        let threshold = self.config.performance_threshold;
        for test in current.tests() {
            let id = test.id();
            let Some(before) = baseline.test(&id) else {
                continue;
            };
            if before.status == TestStatus::Skipped
                || test.status == TestStatus::Skipped
                || before.duration_ms <= 0.0
            {
                continue;
            }

            let relative = (test.duration_ms - before.duration_ms) / before.duration_ms;
            if relative > threshold {
                result.slower.insert(id.clone());
            } else if relative < -threshold {
                result.faster.insert(id.clone());
            }
            result.duration_deltas.insert(
                id,
                DurationDelta {
                    baseline_ms: before.duration_ms,
                    current_ms: test.duration_ms,
                    relative,
                },
            );
        }
    }

    fn compare_coverage(
        &self,
        baseline: &TestRunResult,
        current: &TestRunResult,
        result: &mut ComparisonResult,
    ) {
        let threshold = self.config.coverage_threshold;
        for (path, after) in &current.coverage {
            let Some(before) = baseline.coverage.get(path) else {
                continue;
            };
            let (Some(baseline_percent), Some(current_percent)) = (before.percent(), after.percent())
            else {
                continue;
            };

            let delta = current_percent - baseline_percent;
            if delta > threshold {
                result.coverage_improved.insert(path.clone());
            } else if delta < -threshold {
                result.coverage_degraded.insert(path.clone());
            }
            result.coverage_deltas.insert(
                path.clone(),
                CoverageDelta {
                    baseline_percent,
                    current_percent,
                    delta,
                },
            );
        }

        result.overall_coverage_delta = baseline
            .overall_coverage()
            .zip(current.overall_coverage())
            .map(|(before, after)| after - before);
    }

    /// Newly failing tests that are not known to be flaky in `current`.
    pub fn find_regression_candidates(
        &self,
        comparison: &ComparisonResult,
        current: &TestRunResult,
    ) -> BTreeSet<TestId> {
        comparison
            .newly_failing
            .iter()
            .filter(|id| current.test(id).is_none_or(|t| !t.is_flaky()))
            .cloned()
            .collect()
    }

    /// Deterministic text report of a comparison.
    pub fn generate_summary(&self, comparison: &ComparisonResult) -> String {
        comparison.summary().to_string()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
