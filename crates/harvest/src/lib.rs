// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test result normalization, aggregation, comparison and trend analysis.
//!
//! Reports from pytest, JUnit, TestNG and Robot Framework are normalized into
//! one [`TestRunResult`] per run, persisted through a [`RunStore`], compared
//! pairwise with a [`Comparer`] and analyzed over time with a
//! [`TrendAnalyzer`].

pub mod collect;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod normalize;
pub mod store;
pub mod trend;

pub use collect::{AggregateRequest, AggregatedResults, Collector};
pub use compare::{CompareStrategy, Comparer, ComparisonResult};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{FileCoverage, Framework, RunMetadata, TestId, TestResult, TestRunResult, TestStatus};
pub use normalize::{AdapterRegistry, FormatAdapter, Normalizer};
pub use store::{FsStore, LoadOptions, MemoryStore, RunStore};
pub use trend::{Metric, TrendAnalyzer, TrendData, TrendDirection, TrendReport};
