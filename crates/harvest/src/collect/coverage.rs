// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Coverage report ingestion.
//!
//! Every format is reduced to per-file line counts so overall coverage can be
//! weighted by lines rather than averaged across files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{self, Error};
use crate::model::{CoverageMap, FileCoverage};
use crate::normalize::xml::{self, Element};

/// Tolerance when cross-checking a reported percentage, in percentage points.
const PERCENT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    /// JaCoCo XML (`<report>`).
    Jacoco,
    /// Cobertura XML (`<coverage>`), as written by coverage.py and others.
    Cobertura,
    /// coverage.py JSON (`coverage json`).
    CoveragePy,
}

impl fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoverageFormat::Jacoco => "jacoco",
            CoverageFormat::Cobertura => "cobertura",
            CoverageFormat::CoveragePy => "coverage.py",
        })
    }
}

/// Per-file line coverage read from one report.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub format: CoverageFormat,
    pub files: CoverageMap,
    /// Entries skipped or inconsistent, kept for the run metadata.
    pub warnings: Vec<String>,
}

/// Identify a coverage report by its content.
pub fn detect_format(text: &str) -> Option<CoverageFormat> {
    match xml::root_name(text) {
        Some("report") => return Some(CoverageFormat::Jacoco),
        Some("coverage") => return Some(CoverageFormat::Cobertura),
        Some(_) => return None,
        None => {}
    }
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value
        .get("files")
        .is_some_and(serde_json::Value::is_object)
        .then_some(CoverageFormat::CoveragePy)
}

/// Read and parse a coverage report file.
pub fn load_coverage(path: &Path) -> error::Result<CoverageReport> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_coverage(path, &text)
}

/// Parse coverage report content; `path` names the report in errors.
pub fn parse_coverage(path: &Path, text: &str) -> error::Result<CoverageReport> {
    let format = detect_format(text)
        .ok_or_else(|| Error::parse(path, "unrecognized coverage report format"))?;
    let parsed = match format {
        CoverageFormat::Jacoco => parse_jacoco(text),
        CoverageFormat::Cobertura => parse_cobertura(text),
        CoverageFormat::CoveragePy => parse_coverage_py(text),
    };
    let (files, warnings) = parsed.map_err(|message| Error::parse(path, message))?;
    for warning in &warnings {
        tracing::warn!("{}: {warning}", path.display());
    }
    Ok(CoverageReport {
        format,
        files,
        warnings,
    })
}

type Parsed = std::result::Result<(CoverageMap, Vec<String>), String>;

/// Add counts for a file, summing when the file appears more than once.
fn accumulate(
    files: &mut CoverageMap,
    path: String,
    covered: u64,
    total: u64,
) -> Result<(), String> {
    let entry = files.entry(path.clone()).or_insert(FileCoverage {
        lines_covered: 0,
        lines_total: 0,
    });
    let (Some(covered), Some(total)) = (
        entry.lines_covered.checked_add(covered),
        entry.lines_total.checked_add(total),
    ) else {
        return Err(format!("{path}: line counts overflow"));
    };
    *entry = FileCoverage::new(covered, total)
        .ok_or_else(|| format!("{path}: {covered} covered lines exceed {total} total"))?;
    Ok(())
}

fn clean_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

// =============================================================================
// JaCoCo
// =============================================================================

/// JaCoCo: `<sourcefile>` LINE counters keyed `package/File.java`. Packages
/// without source file entries fall back to their classes, then to the
/// package counter itself.
fn parse_jacoco(text: &str) -> Parsed {
    let root = xml::parse(text).map_err(|e| format!("invalid XML: {e}"))?;
    let mut files = CoverageMap::new();
    let mut warnings = Vec::new();
    jacoco_group(&root, &mut files, &mut warnings)?;
    Ok((files, warnings))
}

/// `<report>` and `<group>` hold packages and nested groups.
fn jacoco_group(
    group: &Element,
    files: &mut CoverageMap,
    warnings: &mut Vec<String>,
) -> Result<(), String> {
    for child in &group.children {
        match child.name.as_str() {
            "group" => jacoco_group(child, files, warnings)?,
            "package" => jacoco_package(child, files, warnings)?,
            _ => {}
        }
    }
    Ok(())
}

fn jacoco_package(
    package: &Element,
    files: &mut CoverageMap,
    warnings: &mut Vec<String>,
) -> Result<(), String> {
    let name = package.attr("name").unwrap_or_default();
    let qualify = |file: &str| {
        if name.is_empty() {
            file.to_string()
        } else {
            format!("{name}/{file}")
        }
    };

    let sources: Vec<&Element> = package.children_named("sourcefile").collect();
    if !sources.is_empty() {
        for source in sources {
            let file = source
                .attr("name")
                .ok_or("<sourcefile> without name attribute")?;
            match line_counter(source)? {
                Some((covered, total)) => accumulate(files, qualify(file), covered, total)?,
                None => warnings.push(format!("{}: no LINE counter", qualify(file))),
            }
        }
        return Ok(());
    }

    let mut found = false;
    for class in package.children_named("class") {
        let file = match (class.attr("sourcefilename"), class.attr("name")) {
            (Some(source), _) => qualify(source),
            (None, Some(class_name)) => format!("{class_name}.class"),
            (None, None) => return Err("<class> without name attribute".to_string()),
        };
        if let Some((covered, total)) = line_counter(class)? {
            accumulate(files, file, covered, total)?;
            found = true;
        }
    }
    if !found && let Some((covered, total)) = line_counter(package)? {
        accumulate(files, name.to_string(), covered, total)?;
    }
    Ok(())
}

/// The element's own `<counter type="LINE">` as (covered, total).
fn line_counter(element: &Element) -> Result<Option<(u64, u64)>, String> {
    let Some(counter) = element
        .children_named("counter")
        .find(|c| c.attr("type") == Some("LINE"))
    else {
        return Ok(None);
    };
    let count = |attr: &str| -> Result<u64, String> {
        counter
            .attr(attr)
            .unwrap_or("0")
            .trim()
            .parse()
            .map_err(|_| format!("invalid LINE counter attribute {attr}"))
    };
    let covered = count("covered")?;
    let missed = count("missed")?;
    let total = covered
        .checked_add(missed)
        .ok_or_else(|| "LINE counter total overflows".to_string())?;
    Ok(Some((covered, total)))
}

// =============================================================================
// Cobertura
// =============================================================================

/// Cobertura: per-class `<line hits=>` entries, summed per `filename`.
fn parse_cobertura(text: &str) -> Parsed {
    let root = xml::parse(text).map_err(|e| format!("invalid XML: {e}"))?;
    let mut files = CoverageMap::new();
    let mut warnings = Vec::new();

    let packages = root
        .child("packages")
        .into_iter()
        .flat_map(|p| p.children_named("package"));
    for package in packages {
        let classes = package
            .child("classes")
            .into_iter()
            .flat_map(|c| c.children_named("class"));
        for class in classes {
            let file = class
                .attr("filename")
                .ok_or("<class> without filename attribute")?;
            let Some(lines) = class.child("lines") else {
                warnings.push(format!("{file}: no <lines> entries"));
                continue;
            };
            let mut covered = 0u64;
            let mut total = 0u64;
            for line in lines.children_named("line") {
                let hits: u64 = line
                    .attr("hits")
                    .unwrap_or("0")
                    .trim()
                    .parse()
                    .map_err(|_| format!("{file}: invalid hits value"))?;
                total += 1;
                if hits > 0 {
                    covered += 1;
                }
            }
            accumulate(&mut files, clean_path(file), covered, total)?;
        }
    }
    Ok((files, warnings))
}

// =============================================================================
// coverage.py JSON
// =============================================================================

#[derive(Debug, Deserialize)]
struct CoverageJson {
    files: BTreeMap<String, FileData>,
}

#[derive(Debug, Deserialize)]
struct FileData {
    executed_lines: Option<Vec<u64>>,
    missing_lines: Option<Vec<u64>>,
    summary: Option<FileSummary>,
}

#[derive(Debug, Deserialize)]
struct FileSummary {
    covered_lines: Option<u64>,
    num_statements: Option<u64>,
    percent_covered: Option<f64>,
    num_branches: Option<u64>,
}

/// coverage.py: summary counts, else executed/missing line arrays. The
/// reported percentage is only a cross-check, and only when branch coverage
/// is not folded into it.
fn parse_coverage_py(text: &str) -> Parsed {
    let report: CoverageJson =
        serde_json::from_str(text).map_err(|e| format!("invalid coverage JSON: {e}"))?;
    let mut files = CoverageMap::new();
    let mut warnings = Vec::new();

    for (path, data) in report.files {
        let summary = data.summary.as_ref();
        let counts = match summary.and_then(|s| s.covered_lines.zip(s.num_statements)) {
            Some(counts) => Some(counts),
            None => data
                .executed_lines
                .as_ref()
                .zip(data.missing_lines.as_ref())
                .map(|(executed, missing)| {
                    let covered = executed.len() as u64;
                    (covered, covered + missing.len() as u64)
                }),
        };
        let Some((covered, total)) = counts else {
            warnings.push(format!("{path}: no line counts"));
            continue;
        };

        if let Some(summary) = summary
            && summary.num_branches.unwrap_or(0) == 0
            && let Some(reported) = summary.percent_covered
            && total > 0
        {
            let computed = covered as f64 / total as f64 * 100.0;
            if (computed - reported).abs() > PERCENT_TOLERANCE {
                warnings.push(format!(
                    "{path}: percent_covered {reported} disagrees with {covered}/{total} lines"
                ));
            }
        }

        accumulate(&mut files, clean_path(&path), covered, total)?;
    }
    Ok((files, warnings))
}

#[cfg(test)]
#[path = "coverage_tests.rs"]
mod tests;
