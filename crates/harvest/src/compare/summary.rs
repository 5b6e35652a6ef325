// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text rendering of a comparison.

use std::collections::BTreeSet;
use std::fmt;

use super::ComparisonResult;
use crate::model::TestId;

/// Fixed-order report: new, removed, newly failing, newly passing,
/// regressions, improvements.
pub struct Summary<'a> {
    result: &'a ComparisonResult,
}

impl<'a> Summary<'a> {
    pub(super) fn new(result: &'a ComparisonResult) -> Self {
        Self { result }
    }

    fn ids(f: &mut fmt::Formatter<'_>, title: &str, ids: &BTreeSet<TestId>) -> fmt::Result {
        writeln!(f, "{title}: {}", ids.len())?;
        for id in ids {
            writeln!(f, "  {id}")?;
        }
        Ok(())
    }

    fn regressions(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        writeln!(f, "Regressions: {}", r.regressions())?;
        for id in &r.newly_failing {
            writeln!(f, "  failing {id}")?;
        }
        for id in &r.slower {
            self.duration_line(f, "slower", id)?;
        }
        for path in &r.coverage_degraded {
            self.coverage_line(f, "coverage", path)?;
        }
        Ok(())
    }

    fn improvements(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        writeln!(f, "Improvements: {}", r.improvements())?;
        for id in &r.newly_passing {
            writeln!(f, "  passing {id}")?;
        }
        for id in &r.faster {
            self.duration_line(f, "faster", id)?;
        }
        for path in &r.coverage_improved {
            self.coverage_line(f, "coverage", path)?;
        }
        Ok(())
    }

    fn duration_line(&self, f: &mut fmt::Formatter<'_>, label: &str, id: &TestId) -> fmt::Result {
        match self.result.duration_deltas.get(id) {
            Some(d) => writeln!(
                f,
                "  {label} {id} ({:+.1}%, {:.1}ms -> {:.1}ms)",
                d.relative * 100.0,
                d.baseline_ms,
                d.current_ms
            ),
            None => writeln!(f, "  {label} {id}"),
        }
    }

    fn coverage_line(&self, f: &mut fmt::Formatter<'_>, label: &str, path: &str) -> fmt::Result {
        match self.result.coverage_deltas.get(path) {
            Some(d) => writeln!(
                f,
                "  {label} {path} ({:.1}% -> {:.1}%, {:+.1} pp)",
                d.baseline_percent, d.current_percent, d.delta
            ),
            None => writeln!(f, "  {label} {path}"),
        }
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        writeln!(
            f,
            "Comparison {} -> {} ({})",
            r.baseline_run_id, r.current_run_id, r.strategy
        )?;
        Self::ids(f, "New tests", &r.new_tests)?;
        Self::ids(f, "Removed tests", &r.removed_tests)?;
        Self::ids(f, "Newly failing", &r.newly_failing)?;
        Self::ids(f, "Newly passing", &r.newly_passing)?;
        self.regressions(f)?;
        self.improvements(f)?;
        if let Some(delta) = r.overall_coverage_delta {
            writeln!(f, "Overall coverage: {delta:+.1} pp")?;
        }
        Ok(())
    }
}
