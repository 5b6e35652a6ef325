// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report normalization.
//!
//! Converts one framework-specific report into a [`TestRunResult`] through a
//! registry of format adapters. Adapters are asked in priority order how
//! confident they are that they understand a report; the most confident one
//! parses it.
//!
//! Normalization never reads the clock: the run timestamp comes from the
//! report itself, or the Unix epoch when the report carries none.

mod junit;
mod pytest;
mod robot;
mod testng;
pub mod xml;

pub use junit::JunitAdapter;
pub use pytest::PytestAdapter;
pub use robot::RobotAdapter;
pub use testng::TestngAdapter;

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::config::NormalizeConfig;
use crate::error::{Error, Result};
use crate::model::{Framework, TestId, TestResult, TestRunResult};
use xml::{Element, XmlError};

/// How sure an adapter is that it understands a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// Not this format.
    None,
    /// File extension fits, content unchecked or inconclusive.
    Possible,
    /// Root structure fits but the distinguishing signature is absent.
    Likely,
    /// Structural signature confirmed.
    Certain,
}

/// A report file's content, with lazily parsed XML and JSON views.
pub struct Report<'a> {
    pub path: &'a Path,
    pub text: &'a str,
    xml: OnceCell<std::result::Result<Element, XmlError>>,
    json: OnceCell<Option<serde_json::Value>>,
}

impl<'a> Report<'a> {
    pub fn new(path: &'a Path, text: &'a str) -> Self {
        Self {
            path,
            text,
            xml: OnceCell::new(),
            json: OnceCell::new(),
        }
    }

    /// Lowercased file extension.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().as_deref() == Some(ext)
    }

    /// Root element name, sniffed without parsing the whole document.
    pub fn xml_root_name(&self) -> Option<&'a str> {
        xml::root_name(self.text)
    }

    /// Parsed XML document, or a parse error naming this report.
    pub fn xml(&self) -> Result<&Element> {
        self.xml
            .get_or_init(|| xml::parse(self.text))
            .as_ref()
            .map_err(|e| Error::parse(self.path, format!("invalid XML: {e}")))
    }

    /// Parsed JSON document, if the content is JSON.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| {
                if !self.text.trim_start().starts_with(['{', '[']) {
                    return None;
                }
                serde_json::from_str(self.text).ok()
            })
            .as_ref()
    }

    /// Parse error for this report.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.path, message)
    }

    /// An empty run named after the report file.
    pub(crate) fn empty_run(
        &self,
        framework: Framework,
        created_at: Option<DateTime<Utc>>,
    ) -> TestRunResult {
        let run_id = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| framework.to_string());
        let mut run = TestRunResult::new(run_id, created_at.unwrap_or(DateTime::UNIX_EPOCH));
        run.frameworks.insert(framework);
        run.metadata.extra.insert(
            "sources".to_string(),
            serde_json::json!([self.path.display().to_string()]),
        );
        run
    }
}

/// A report format the normalizer understands.
pub trait FormatAdapter: Send + Sync {
    /// Framework whose reports this adapter reads.
    fn framework(&self) -> Framework;

    /// How confident this adapter is that it can parse the report.
    fn detect(&self, report: &Report) -> Confidence;

    /// Convert the report to canonical form.
    fn parse(&self, report: &Report, config: &NormalizeConfig) -> Result<TestRunResult>;
}

/// Format adapters in priority order.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn FormatAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AdapterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registry with every built-in adapter. TestNG is asked before JUnit so
    /// JUnit-style XML carrying TestNG signatures is claimed by TestNG.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PytestAdapter));
        registry.register(Arc::new(TestngAdapter));
        registry.register(Arc::new(JunitAdapter));
        registry.register(Arc::new(RobotAdapter));
        registry
    }

    /// Append an adapter at the lowest priority.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) {
        self.adapters.push(adapter);
    }

    /// Adapter for a framework hint.
    pub fn get(&self, framework: Framework) -> Option<&dyn FormatAdapter> {
        self.adapters
            .iter()
            .find(|a| a.framework() == framework)
            .map(|a| a.as_ref())
    }

    /// Pick the adapter for a report.
    ///
    /// The first adapter reporting [`Confidence::Certain`] wins. Otherwise
    /// the single most confident adapter wins if it is at least
    /// [`Confidence::Likely`]; a tie at the top, or an extension match with
    /// no structural evidence, is an unknown-framework error.
    pub fn detect(&self, report: &Report) -> Result<&dyn FormatAdapter> {
        let mut best: Option<(&dyn FormatAdapter, Confidence)> = None;
        let mut tied: Vec<Framework> = Vec::new();

        for adapter in &self.adapters {
            let confidence = adapter.detect(report);
            tracing::debug!(
                "{}: {} adapter confidence {:?}",
                report.path.display(),
                adapter.framework(),
                confidence
            );

            if confidence == Confidence::Certain {
                return Ok(adapter.as_ref());
            }
            match best {
                Some((_, top)) if confidence < top => {}
                Some((current, top)) if confidence == top => {
                    if tied.is_empty() {
                        tied.push(current.framework());
                    }
                    tied.push(adapter.framework());
                }
                _ => {
                    best = Some((adapter.as_ref(), confidence));
                    tied.clear();
                }
            }
        }

        match best {
            Some((adapter, confidence)) if confidence >= Confidence::Likely && tied.is_empty() => {
                Ok(adapter)
            }
            Some((_, confidence)) if confidence >= Confidence::Likely => {
                let names: Vec<&str> = tied.iter().map(|f| f.as_str()).collect();
                Err(Error::UnknownFramework {
                    path: report.path.to_path_buf(),
                    reason: format!("ambiguous report, could be: {}", names.join(", ")),
                })
            }
            Some((adapter, Confidence::Possible)) if tied.is_empty() => {
                Err(Error::UnknownFramework {
                    path: report.path.to_path_buf(),
                    reason: format!(
                        "extension suggests {} but the content is not a recognized report",
                        adapter.framework()
                    ),
                })
            }
            _ => Err(Error::UnknownFramework {
                path: report.path.to_path_buf(),
                reason: "no adapter recognized the report".to_string(),
            }),
        }
    }
}

/// A per-file failure recorded by batch operations.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of normalizing several files independently.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully normalized reports, in input order.
    pub runs: Vec<(PathBuf, TestRunResult)>,
    pub errors: Vec<FileError>,
}

/// Converts report files to canonical runs.
pub struct Normalizer {
    registry: AdapterRegistry,
    config: NormalizeConfig,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizeConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self::with_registry(AdapterRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: AdapterRegistry, config: NormalizeConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Normalize one report file.
    pub fn normalize(&self, path: &Path, hint: Option<Framework>) -> Result<TestRunResult> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.normalize_content(path, &text, hint)
    }

    /// Normalize report content already in memory. `path` names the report
    /// in errors and drives extension sniffing.
    pub fn normalize_content(
        &self,
        path: &Path,
        text: &str,
        hint: Option<Framework>,
    ) -> Result<TestRunResult> {
        let report = Report::new(path, text);
        let adapter = match hint {
            Some(framework) => self.registry.get(framework).ok_or_else(|| {
                Error::UnknownFramework {
                    path: path.to_path_buf(),
                    reason: format!("no adapter registered for {framework}"),
                }
            })?,
            None => self.registry.detect(&report)?,
        };

        tracing::debug!("{}: parsing as {}", path.display(), adapter.framework());
        adapter.parse(&report, &self.config)
    }

    /// Normalize each file independently; failures are collected per file
    /// and never stop the batch.
    pub fn normalize_batch<P: AsRef<Path>>(
        &self,
        files: &[P],
        hint: Option<Framework>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for file in files {
            let path = file.as_ref();
            match self.normalize(path, hint) {
                Ok(run) => outcome.runs.push((path.to_path_buf(), run)),
                Err(error) => {
                    tracing::warn!("skipping {}: {error}", path.display());
                    outcome.errors.push(FileError {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}

// =============================================================================
// Shared field helpers
// =============================================================================

/// Parse a seconds value (e.g. JUnit `time="1.25"`) into milliseconds.
///
/// Thousands separators are tolerated; negative or non-finite values are not.
pub(crate) fn seconds_to_ms(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    let secs: f64 = cleaned.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs * 1000.0)
}

/// Parse the timestamp styles found in reports. Zone-less values are UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix(" UTC").unwrap_or(value);
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y%m%d %H:%M:%S%.f",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(naive, f).ok())
        .map(|dt| dt.and_utc())
}

/// Compare a count declared by the report with what was parsed.
///
/// Mismatches are recorded as run warnings, or fail the report when
/// `strict_counts` is enabled.
pub(crate) fn check_count(
    report: &Report,
    config: &NormalizeConfig,
    warnings: &mut Vec<String>,
    what: &str,
    declared: Option<&str>,
    parsed: usize,
) -> Result<()> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let Ok(declared) = declared.trim().parse::<usize>() else {
        return Err(report.error(format!("{what}: invalid count {declared:?}")));
    };
    if declared == parsed {
        return Ok(());
    }

    let message = format!("{what}: report declares {declared}, parsed {parsed}");
    if config.strict_counts {
        return Err(report.error(message));
    }
    tracing::warn!("{}: {message}", report.path.display());
    warnings.push(message);
    Ok(())
}

/// Warnings and repeated identities found while parsing one report.
#[derive(Debug, Default)]
pub(crate) struct Notes {
    pub warnings: Vec<String>,
    duplicates: BTreeSet<TestId>,
}

impl Notes {
    /// Add a test to the run; a repeated identity replaces the earlier entry.
    pub fn insert(&mut self, run: &mut TestRunResult, test: TestResult) {
        if let Some(previous) = run.insert_test(test) {
            self.duplicates.insert(previous.id());
        }
    }

    /// Attach the notes to the run metadata.
    pub fn record(self, run: &mut TestRunResult) {
        if !self.warnings.is_empty() {
            run.metadata
                .extra
                .insert("warnings".to_string(), serde_json::json!(self.warnings));
        }
        if !self.duplicates.is_empty() {
            let names: Vec<String> = self.duplicates.iter().map(ToString::to_string).collect();
            run.metadata
                .extra
                .insert("duplicate_tests".to_string(), serde_json::json!(names));
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
