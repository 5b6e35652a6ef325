// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration parsing and validation.
//!
//! Handles harvest.toml parsing with version validation and unknown key
//! warnings. Every recognized option has a default, so an empty config
//! (`version = 1`) is valid.

pub mod duration;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::compare::CompareStrategy;
use crate::error::{Error, Result};
use crate::store::LoadOptions;

/// Supported config file version.
pub const SUPPORTED_VERSION: i64 = 1;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "harvest.toml";

/// Minimum config structure for version checking.
#[derive(Deserialize)]
struct VersionOnly {
    version: Option<i64>,
}

/// Config with flexible parsing that captures unknown keys.
#[derive(Deserialize)]
struct FlexibleConfig {
    #[serde(default)]
    storage: Option<toml::Value>,

    #[serde(default)]
    normalize: Option<toml::Value>,

    #[serde(default)]
    compare: Option<toml::Value>,

    #[serde(default)]
    trend: Option<toml::Value>,

    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

/// Full configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Config file version (must be 1).
    pub version: i64,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub normalize: NormalizeConfig,

    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub trend: TrendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            storage: StorageConfig::default(),
            normalize: NormalizeConfig::default(),
            compare: CompareConfig::default(),
            trend: TrendConfig::default(),
        }
    }
}

/// Run record storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one JSON record per run.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".harvest/runs"),
        }
    }
}

/// Report normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Treat a mismatch between suite-level counts and parsed test cases
    /// as a parse error instead of a recorded warning.
    pub strict_counts: bool,
}

/// Run comparison thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    /// Strategy used when callers do not pick one.
    pub strategy: CompareStrategy,

    /// Relative duration change flagged as slower/faster (0.2 = 20%).
    pub performance_threshold: f64,

    /// Coverage change in percentage points flagged as improved/degraded.
    pub coverage_threshold: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            strategy: CompareStrategy::default(),
            performance_threshold: 0.2,
            coverage_threshold: 1.0,
        }
    }
}

/// Trend analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendConfig {
    /// Relative change over the observed range needed to leave STABLE.
    pub threshold: f64,

    /// Residual standard deviations beyond which a point is an anomaly.
    pub anomaly_k: f64,

    /// Fewest runs a metric needs before a trend is computed.
    pub min_data_points: usize,

    /// Most recent runs considered (None = unbounded).
    pub max_runs: Option<usize>,

    /// Only consider runs newer than this (e.g. "90d").
    #[serde(deserialize_with = "duration::deserialize_option")]
    pub window: Option<Duration>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            anomaly_k: 2.0,
            min_data_points: 3,
            max_runs: Some(100),
            window: None,
        }
    }
}

impl TrendConfig {
    /// History bounds for loading runs, relative to `now`.
    pub fn load_options(&self, now: DateTime<Utc>) -> LoadOptions {
        let since = self
            .window
            .and_then(|w| chrono::Duration::from_std(w).ok())
            .and_then(|w| now.checked_sub_signed(w));
        LoadOptions {
            limit: self.max_runs,
            since,
        }
    }
}

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self, path: Option<&Path>) -> Result<()> {
        let fail = |message: String| Error::Config {
            message,
            path: path.map(Path::to_path_buf),
        };

        check_threshold("compare.performance_threshold", self.compare.performance_threshold)
            .map_err(fail)?;
        check_threshold("compare.coverage_threshold", self.compare.coverage_threshold)
            .map_err(fail)?;
        check_threshold("trend.threshold", self.trend.threshold).map_err(fail)?;

        if !(self.trend.anomaly_k.is_finite() && self.trend.anomaly_k > 0.0) {
            return Err(fail(format!(
                "trend.anomaly_k must be a positive number, got {}",
                self.trend.anomaly_k
            )));
        }
        if self.trend.min_data_points < 2 {
            return Err(fail(format!(
                "trend.min_data_points must be at least 2, got {}",
                self.trend.min_data_points
            )));
        }
        if self.trend.max_runs == Some(0) {
            return Err(fail("trend.max_runs must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> std::result::Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{name} must be a non-negative number, got {value}"))
    }
}

/// Load and validate config from a file.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse(&content, path)
}

/// Load config with warnings for unknown keys.
pub fn load_with_warnings(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_with_warnings(&content, path)
}

/// Find `harvest.toml` in `root`, falling back to defaults when absent.
pub fn discover(root: &Path) -> Result<Config> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, root.display());
        return Ok(Config::default());
    }
    load_with_warnings(&path)
}

/// Parse config from string content (strict mode).
pub fn parse(content: &str, path: &Path) -> Result<Config> {
    check_version(content, path)?;

    let config: Config = toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;
    config.validate(Some(path))?;
    Ok(config)
}

/// Parse config, warning on unknown top-level keys.
pub fn parse_with_warnings(content: &str, path: &Path) -> Result<Config> {
    let version = check_version(content, path)?;

    let flexible: FlexibleConfig = toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    for key in flexible.unknown.keys().filter(|k| *k != "version") {
        warn_unknown_key(path, key);
    }

    let config = Config {
        version,
        storage: parse_section(flexible.storage, "storage", path)?,
        normalize: parse_section(flexible.normalize, "normalize", path)?,
        compare: parse_section(flexible.compare, "compare", path)?,
        trend: parse_section(flexible.trend, "trend", path)?,
    };
    config.validate(Some(path))?;
    Ok(config)
}

fn check_version(content: &str, path: &Path) -> Result<i64> {
    let version_check: VersionOnly = toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    let version = version_check.version.ok_or_else(|| Error::Config {
        message: "missing required field: version".to_string(),
        path: Some(path.to_path_buf()),
    })?;

    if version != SUPPORTED_VERSION {
        return Err(Error::Config {
            message: format!(
                "unsupported config version {} (supported: {})",
                version, SUPPORTED_VERSION
            ),
            path: Some(path.to_path_buf()),
        });
    }
    Ok(version)
}

fn parse_section<T>(value: Option<toml::Value>, name: &str, path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(value) = value else {
        return Ok(T::default());
    };
    value.try_into().map_err(|e: toml::de::Error| Error::Config {
        message: format!("[{name}]: {e}"),
        path: Some(path.to_path_buf()),
    })
}

fn warn_unknown_key(path: &Path, key: &str) {
    tracing::warn!(
        "{}: unrecognized field `{}` (ignored)",
        path.display(),
        key
    );
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
