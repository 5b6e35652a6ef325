// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordinary least squares over an evenly indexed series.

/// Line fitted to `(index, value)` pairs, with index `0..n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 for a constant series.
    pub r_squared: f64,
}

impl LinearFit {
    /// Fit a line to `values`. Returns None for an empty series.
    ///
    /// A single value or a constant series fits a flat line with zero
    /// strength.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        if values.iter().all(|v| *v == first) {
            return Some(Self::flat(first));
        }

        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = mean(values)?;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, y) in values.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }
        if sxx == 0.0 {
            return Some(Self::flat(mean_y));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let fit = Self {
            slope,
            intercept,
            r_squared: 0.0,
        };

        let ss_tot: f64 = values.iter().map(|y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = fit.residuals(values).map(|r| r * r).sum();
        let r_squared = if ss_tot > 0.0 {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(Self { r_squared, ..fit })
    }

    fn flat(value: f64) -> Self {
        Self {
            slope: 0.0,
            intercept: value,
            r_squared: 0.0,
        }
    }

    /// Value of the line at `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Observed minus fitted value, per index.
    pub fn residuals<'a>(&'a self, values: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        values
            .iter()
            .enumerate()
            .map(|(i, y)| y - self.at(i as f64))
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
#[path = "fit_tests.rs"]
mod tests;
