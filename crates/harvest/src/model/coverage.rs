// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line coverage counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Line coverage for one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub lines_covered: u64,
    pub lines_total: u64,
}

impl FileCoverage {
    /// Returns None when more lines are covered than exist.
    pub fn new(lines_covered: u64, lines_total: u64) -> Option<Self> {
        (lines_covered <= lines_total).then_some(Self {
            lines_covered,
            lines_total,
        })
    }

    /// Coverage percentage (0-100), None for files with no lines.
    pub fn percent(&self) -> Option<f64> {
        if self.lines_total == 0 {
            return None;
        }
        Some(self.lines_covered as f64 / self.lines_total as f64 * 100.0)
    }
}

/// Weighted coverage percentage across files: covered lines over total lines.
///
/// Returns None when there are no lines at all.
pub fn overall_coverage<'a>(files: impl IntoIterator<Item = &'a FileCoverage>) -> Option<f64> {
    let (covered, total) = files.into_iter().fold((0u128, 0u128), |(c, t), f| {
        (c + u128::from(f.lines_covered), t + u128::from(f.lines_total))
    });
    if total == 0 {
        return None;
    }
    Some(covered as f64 / total as f64 * 100.0)
}

/// Per-file coverage map keyed by source path.
pub type CoverageMap = BTreeMap<String, FileCoverage>;

#[cfg(test)]
#[path = "coverage_tests.rs"]
mod tests;
