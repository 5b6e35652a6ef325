// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use crate::trend::Metric;

/// Harvest error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single report could not be parsed.
    #[error("parse error: {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Format detection failed and no framework hint was given.
    #[error("unknown framework: {}: {reason}", .path.display())]
    UnknownFramework { path: PathBuf, reason: String },

    /// Trend analysis was asked for with too few data points.
    #[error("insufficient data for {metric}: need {required} data points, found {found}")]
    InsufficientData {
        metric: Metric,
        required: usize,
        found: usize,
    },

    /// Run record could not be written or read.
    #[error("storage error: {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    /// Configuration file not found or invalid
    #[error("config error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// File I/O error
    #[error("io error: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether batch operations may record this error and move on.
    ///
    /// Storage and configuration failures always abort the operation.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::UnknownFramework { .. } | Error::Io { .. }
        )
    }
}

/// Result type using harvest Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
