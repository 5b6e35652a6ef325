// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical test result model.
//!
//! Every report format is normalized into these types; comparison and trend
//! analysis only ever see this vocabulary.

mod coverage;
mod result;
mod run;
mod status;

pub use coverage::{CoverageMap, FileCoverage, overall_coverage};
pub use result::{TestId, TestResult};
pub use run::{RunMetadata, TestRunResult};
pub use status::{Framework, TestStatus};
