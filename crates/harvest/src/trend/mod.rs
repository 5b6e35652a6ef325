// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Trend analysis over a time-ordered sequence of runs.
//!
//! Each metric is fitted with a least-squares line over the run index. The
//! fit gives direction, strength (R²), anomalies and predictions.

pub mod fit;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrendConfig;
use crate::error::{Error, Result};
use crate::model::TestRunResult;
use crate::store::RunStore;
use fit::LinearFit;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Run-level quantity tracked over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PassRate,
    Coverage,
    Duration,
    FailureRate,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::PassRate,
        Metric::Coverage,
        Metric::Duration,
        Metric::FailureRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::PassRate => "pass_rate",
            Metric::Coverage => "coverage",
            Metric::Duration => "duration",
            Metric::FailureRate => "failure_rate",
        }
    }

    /// Whether an increase is an improvement.
    pub fn higher_is_better(self) -> bool {
        matches!(self, Metric::PassRate | Metric::Coverage)
    }

    /// Value for one run. Runs without coverage have no coverage value.
    pub fn value(self, run: &TestRunResult) -> Option<f64> {
        match self {
            Metric::PassRate => Some(run.pass_rate()),
            Metric::Coverage => run.overall_coverage(),
            Metric::Duration => Some(run.total_duration_ms()),
            Metric::FailureRate => Some(run.failure_rate()),
        }
    }

    fn clamp(self, value: f64) -> f64 {
        match self {
            Metric::Duration => value.max(0.0),
            _ => value.clamp(0.0, 100.0),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim().to_ascii_lowercase().replace('-', "_"))
            .ok_or_else(|| {
                format!(
                    "unknown metric: {s} (expected one of: pass_rate, coverage, duration, failure_rate)"
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Improving,
    Degrading,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Improving => "IMPROVING",
            TrendDirection::Degrading => "DEGRADING",
            TrendDirection::Stable => "STABLE",
        })
    }
}

/// One observed metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A point far from the fitted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Position in [`TrendData::points`].
    pub index: usize,
    pub run_id: String,
    pub value: f64,
    /// Value of the fitted line at this point.
    pub expected: f64,
    /// Residual in residual standard deviations (signed).
    pub deviations: f64,
}

/// Fitted trend of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendData {
    pub metric: Metric,
    /// Oldest first.
    pub points: Vec<TrendPoint>,
    /// Change per run.
    pub slope: f64,
    pub intercept: f64,
    /// R² of the fit (0-1).
    pub trend_strength: f64,
    pub direction: TrendDirection,
    pub anomalies: Vec<Anomaly>,
    /// Fitted value one run ahead.
    pub predicted_next: f64,
    /// Change per day, from the mean spacing of run timestamps.
    pub velocity: Option<f64>,
}

impl TrendData {
    pub fn latest(&self) -> Option<&TrendPoint> {
        self.points.last()
    }
}

/// A metric left out of [`TrendReport`] for lack of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMetric {
    pub metric: Metric,
    pub required: usize,
    pub found: usize,
}

/// Trends for every metric with enough data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub trends: BTreeMap<Metric, TrendData>,
    pub skipped: Vec<SkippedMetric>,
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Fit a trend for `metric` over `runs`.
    ///
    /// Runs are ordered by creation time (ties keep input order) and bounded
    /// to the newest `max_runs`. Fails with [`Error::InsufficientData`] when
    /// fewer than `min_data_points` runs carry a value for the metric.
    pub fn analyze_metric(&self, runs: &[TestRunResult], metric: Metric) -> Result<TrendData> {
        let points = self.points(runs, metric);
        let required = self.config.min_data_points.max(1);
        if points.len() < required {
            return Err(Error::InsufficientData {
                metric,
                required,
                found: points.len(),
            });
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let Some(line) = LinearFit::fit(&values) else {
            return Err(Error::InsufficientData {
                metric,
                required,
                found: 0,
            });
        };

        let direction = self.direction(metric, &line, &values);
        let anomalies = self.anomalies(&line, &values, &points);
        let velocity = velocity(&line, &points);
        let last = (values.len() - 1) as f64;

        tracing::debug!(
            "{metric}: {} points, slope {:.4}, R² {:.3}, {direction}, {} anomalies",
            points.len(),
            line.slope,
            line.r_squared,
            anomalies.len()
        );

        Ok(TrendData {
            metric,
            slope: line.slope,
            intercept: line.intercept,
            trend_strength: line.r_squared,
            direction,
            anomalies,
            predicted_next: metric.clamp(line.at(last + 1.0)),
            velocity,
            points,
        })
    }

    /// Extrapolate the fitted line `steps_ahead` runs past the last point.
    ///
    /// Percentages are kept within 0-100 and durations at or above zero.
    pub fn predict_next_value(&self, trend: &TrendData, steps_ahead: usize) -> f64 {
        let last = trend.points.len().saturating_sub(1) as f64;
        let x = last + steps_ahead as f64;
        trend.metric.clamp(trend.intercept + trend.slope * x)
    }

    /// Trends for every metric, recording the ones without enough data.
    pub fn analyze_all_metrics(&self, runs: &[TestRunResult]) -> TrendReport {
        let mut report = TrendReport::default();
        for metric in Metric::ALL {
            match self.analyze_metric(runs, metric) {
                Ok(trend) => {
                    report.trends.insert(metric, trend);
                }
                Err(Error::InsufficientData {
                    metric,
                    required,
                    found,
                }) => {
                    tracing::debug!("skipping {metric}: {found} of {required} data points");
                    report.skipped.push(SkippedMetric {
                        metric,
                        required,
                        found,
                    });
                }
                Err(e) => {
                    tracing::warn!("skipping {metric}: {e}");
                }
            }
        }
        report
    }

    /// Load bounded history from `store` and analyze every metric.
    pub fn analyze_history(&self, store: &dyn RunStore, now: DateTime<Utc>) -> Result<TrendReport> {
        let runs = store.load_runs(&self.config.load_options(now))?;
        Ok(self.analyze_all_metrics(&runs))
    }

    fn points(&self, runs: &[TestRunResult], metric: Metric) -> Vec<TrendPoint> {
        let mut ordered: Vec<&TestRunResult> = runs.iter().collect();
        ordered.sort_by_key(|r| r.created_at);
        if let Some(max) = self.config.max_runs {
            let excess = ordered.len().saturating_sub(max);
            ordered.drain(..excess);
        }

        ordered
            .into_iter()
            .filter_map(|run| {
                let value = metric.value(run)?;
                value.is_finite().then(|| TrendPoint {
                    run_id: run.run_id.clone(),
                    timestamp: run.created_at,
                    value,
                })
            })
            .collect()
    }

    fn direction(&self, metric: Metric, line: &LinearFit, values: &[f64]) -> TrendDirection {
        if line.slope == 0.0 {
            return TrendDirection::Stable;
        }
        let span = line.slope * (values.len() - 1) as f64;
        let scale = fit::mean(values).map_or(0.0, f64::abs);
        let significant = if scale == 0.0 {
            true
        } else {
            (span / scale).abs() > self.config.threshold
        };
        if !significant {
            return TrendDirection::Stable;
        }
        if (line.slope > 0.0) == metric.higher_is_better() {
            TrendDirection::Improving
        } else {
            TrendDirection::Degrading
        }
    }

    fn anomalies(&self, line: &LinearFit, values: &[f64], points: &[TrendPoint]) -> Vec<Anomaly> {
        let residuals: Vec<f64> = line.residuals(values).collect();
        let spread = fit::std_dev(&residuals);
        // Residuals of an exactly linear series are rounding noise, not spread.
        let magnitude = values.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        if spread <= f64::EPSILON * 1e3 * magnitude {
            return Vec::new();
        }

        residuals
            .iter()
            .zip(points)
            .enumerate()
            .filter(|(_, (r, _))| r.abs() > self.config.anomaly_k * spread)
            .map(|(index, (r, point))| Anomaly {
                index,
                run_id: point.run_id.clone(),
                value: point.value,
                expected: line.at(index as f64),
                deviations: r / spread,
            })
            .collect()
    }
}

fn velocity(line: &LinearFit, points: &[TrendPoint]) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if points.len() < 2 {
        return None;
    }
    let elapsed_ms = (last.timestamp - first.timestamp).num_milliseconds() as f64;
    let spacing_days = elapsed_ms / MS_PER_DAY / (points.len() - 1) as f64;
    (spacing_days > 0.0).then(|| line.slope / spacing_days)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
