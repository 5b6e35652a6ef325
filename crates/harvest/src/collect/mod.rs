// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregation of report files into one run.
//!
//! Result files are normalized independently and merged by test identity.
//! A file that fails to parse is recorded and skipped; it never aborts the
//! aggregation. Only persisting the merged run can fail the operation.

pub mod coverage;
pub mod flaky;

pub use coverage::{CoverageFormat, CoverageReport, load_coverage, parse_coverage};
pub use flaky::{FlakyEntry, FlakyReport, load_flaky_report, parse_flaky_report};

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::model::{Framework, RunMetadata, TestId, TestRunResult};
use crate::normalize::{FileError, Normalizer};
use crate::store::{RecordKey, RunStore};

/// Inputs for one aggregated run.
#[derive(Debug, Clone, Default)]
pub struct AggregateRequest {
    /// Result reports, in merge order: later files win on duplicate tests.
    pub result_files: Vec<PathBuf>,
    pub coverage_files: Vec<PathBuf>,
    pub flaky_report: Option<PathBuf>,
    /// Skip detection and parse every result file as this framework.
    pub framework_hint: Option<Framework>,
    /// Defaults to `run-<timestamp>`.
    pub run_id: Option<String>,
    /// Defaults to the current time.
    pub created_at: Option<DateTime<Utc>>,
    pub metadata: RunMetadata,
}

impl AggregateRequest {
    pub fn new(result_files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            result_files: result_files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_coverage(mut self, path: impl Into<PathBuf>) -> Self {
        self.coverage_files.push(path.into());
        self
    }

    pub fn with_flaky_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.flaky_report = Some(path.into());
        self
    }

    pub fn with_framework_hint(mut self, framework: Framework) -> Self {
        self.framework_hint = Some(framework);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A merged run plus everything that went wrong building it.
#[derive(Debug)]
pub struct AggregatedResults {
    pub run: TestRunResult,
    /// Files that could not be read or parsed.
    pub errors: Vec<FileError>,
    /// Test identities reported more than once.
    pub duplicates: BTreeSet<TestId>,
    /// Set once the run has been persisted.
    pub record: Option<RecordKey>,
}

/// Builds aggregated runs from report files.
pub struct Collector {
    normalizer: Normalizer,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(NormalizeConfig::default())
    }
}

impl Collector {
    pub fn new(config: NormalizeConfig) -> Self {
        Self::with_normalizer(Normalizer::new(config))
    }

    pub fn with_normalizer(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Normalize, merge and annotate the requested files.
    pub fn aggregate(&self, request: &AggregateRequest) -> AggregatedResults {
        let created_at = request.created_at.unwrap_or_else(Utc::now);
        let run_id = request
            .run_id
            .clone()
            .unwrap_or_else(|| format!("run-{}", created_at.format("%Y%m%dT%H%M%SZ")));

        let batch = self
            .normalizer
            .normalize_batch(&request.result_files, request.framework_hint);
        let mut errors = batch.errors;

        let mut warnings = Vec::new();
        let mut sources = Vec::new();
        let mut in_file_duplicates = BTreeSet::new();
        let mut parts = Vec::new();
        for (path, part) in batch.runs {
            for warning in string_list(&part, "warnings") {
                warnings.push(format!("{}: {warning}", path.display()));
            }
            in_file_duplicates.extend(
                string_list(&part, "duplicate_tests").filter_map(|id| id.parse::<TestId>().ok()),
            );
            sources.push(path.display().to_string());
            parts.push(part);
        }

        let (mut run, mut duplicates) = merge(run_id, created_at, parts);
        duplicates.append(&mut in_file_duplicates);
        run.metadata = request.metadata.clone();

        for path in &request.coverage_files {
            match load_coverage(path) {
                Ok(report) => {
                    for (file, counts) in report.files {
                        if run.coverage.contains_key(&file) {
                            warnings.push(format!(
                                "{}: coverage for {file} replaces an earlier report",
                                path.display()
                            ));
                        }
                        run.set_coverage(file, counts);
                    }
                    for warning in report.warnings {
                        warnings.push(format!("{}: {warning}", path.display()));
                    }
                    sources.push(path.display().to_string());
                }
                Err(error) => {
                    tracing::warn!("skipping coverage {}: {error}", path.display());
                    errors.push(FileError {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        if let Some(path) = &request.flaky_report {
            match load_flaky_report(path) {
                Ok(report) => {
                    let unmatched = report.apply(&mut run);
                    for name in &unmatched {
                        tracing::warn!("{}: no test named {name}", path.display());
                    }
                    if !unmatched.is_empty() {
                        run.metadata
                            .extra
                            .insert("unmatched_flaky".to_string(), serde_json::json!(unmatched));
                    }
                    sources.push(path.display().to_string());
                }
                Err(error) => {
                    tracing::warn!("skipping flaky report {}: {error}", path.display());
                    errors.push(FileError {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        let extra = &mut run.metadata.extra;
        extra.insert("sources".to_string(), serde_json::json!(sources));
        if !duplicates.is_empty() {
            let names: Vec<String> = duplicates.iter().map(ToString::to_string).collect();
            extra.insert("duplicate_tests".to_string(), serde_json::json!(names));
        }
        if !warnings.is_empty() {
            extra.insert("warnings".to_string(), serde_json::json!(warnings));
        }
        if !errors.is_empty() {
            let failed: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.path.display(), e.error))
                .collect();
            extra.insert("failed_files".to_string(), serde_json::json!(failed));
        }

        tracing::debug!(
            "aggregated {} tests from {} files into {} ({} failed files)",
            run.total(),
            request.result_files.len(),
            run.run_id,
            errors.len()
        );

        AggregatedResults {
            run,
            errors,
            duplicates,
            record: None,
        }
    }

    /// Aggregate, then commit the run to `store`. Per-file failures are still
    /// only recorded; a storage failure fails the call.
    pub fn aggregate_run(
        &self,
        request: &AggregateRequest,
        store: &dyn RunStore,
    ) -> Result<AggregatedResults> {
        let mut results = self.aggregate(request);
        results.record = Some(store.write(&results.run)?);
        Ok(results)
    }
}

/// Merge normalized runs in order. A test reported again replaces the
/// earlier result; every such identity is returned.
pub fn merge(
    run_id: impl Into<String>,
    created_at: DateTime<Utc>,
    parts: impl IntoIterator<Item = TestRunResult>,
) -> (TestRunResult, BTreeSet<TestId>) {
    let mut merged = TestRunResult::new(run_id, created_at);
    let mut duplicates = BTreeSet::new();

    for part in parts {
        merged.frameworks.extend(part.frameworks.iter().copied());
        for (path, counts) in &part.coverage {
            merged.set_coverage(path.clone(), *counts);
        }
        for test in part.into_tests() {
            if let Some(previous) = merged.insert_test(test) {
                duplicates.insert(previous.id());
            }
        }
    }
    (merged, duplicates)
}

/// String entries of a metadata list.
fn string_list<'a>(run: &'a TestRunResult, key: &str) -> impl Iterator<Item = &'a str> {
    run.metadata
        .extra
        .get(key)
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(serde_json::Value::as_str)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
