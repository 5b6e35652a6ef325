// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical status and source framework vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical outcome of a single test.
///
/// `Error` (the test could not execute) and `Failed` (an assertion did not
/// hold) are kept apart everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Error,
    /// Passed only after one or more reruns.
    Flaky,
}

impl TestStatus {
    /// Failed or errored.
    pub fn is_failure(self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }

    /// Statuses a test can move out of when it becomes newly failing.
    pub fn is_non_failing(self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
            TestStatus::Error => "ERROR",
            TestStatus::Flaky => "FLAKY",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test framework a report was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Pytest,
    Junit,
    Testng,
    Robot,
}

impl Framework {
    /// All frameworks, in adapter priority order.
    pub const ALL: &'static [Framework] = &[
        Framework::Pytest,
        Framework::Testng,
        Framework::Junit,
        Framework::Robot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Pytest => "pytest",
            Framework::Junit => "junit",
            Framework::Testng => "testng",
            Framework::Robot => "robot",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pytest" => Ok(Framework::Pytest),
            "junit" => Ok(Framework::Junit),
            "testng" => Ok(Framework::Testng),
            "robot" | "robotframework" => Ok(Framework::Robot),
            other => Err(format!(
                "unknown framework: {other} (expected one of: pytest, junit, testng, robot)"
            )),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
