// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run history storage.
//!
//! Records are append-only: each run is written once and never rewritten.
//! The filesystem store writes to a hidden temporary file and links it into
//! place without replacing an existing name, so readers only ever see
//! committed records.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::model::TestRunResult;

/// Current record format version.
pub const RECORD_VERSION: u32 = 1;

/// Timestamp prefix of record names. Fixed width, so names sort by time.
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";
const STAMP_LEN: usize = 19;
const RECORD_EXT: &str = ".json";

/// Name of a stored run: `<created_at>_<run id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    /// Deterministic key for a run.
    pub fn for_run(run: &TestRunResult) -> Self {
        Self(format!(
            "{}_{}{RECORD_EXT}",
            run.created_at.format(STAMP_FORMAT),
            sanitize(&run.run_id)
        ))
    }

    /// Parse a file name, rejecting anything that is not a committed record.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stamp = name.get(..STAMP_LEN)?;
        let valid_stamp = stamp.char_indices().all(|(i, c)| match i {
            8 => c == 'T',
            18 => c == 'Z',
            _ => c.is_ascii_digit(),
        });
        let valid = valid_stamp
            && name[STAMP_LEN..].starts_with('_')
            && name.len() > STAMP_LEN + 1 + RECORD_EXT.len()
            && name.ends_with(RECORD_EXT);
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the record was created at or after `since`, to the
    /// millisecond.
    fn not_before(&self, since: DateTime<Utc>) -> bool {
        let since = since.format(STAMP_FORMAT).to_string();
        self.0.get(..STAMP_LEN).is_some_and(|stamp| stamp >= since.as_str())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep run ids filesystem-safe.
fn sanitize(run_id: &str) -> String {
    let cleaned: String = run_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}

/// History bounds for [`RunStore::load_runs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Keep only the newest N runs.
    pub limit: Option<usize>,
    /// Drop runs created before this instant.
    pub since: Option<DateTime<Utc>>,
}

impl LoadOptions {
    /// Every stored run.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Persisted form of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Format version for forward compatibility.
    pub version: u32,
    pub run: TestRunResult,
}

/// Append-only run history.
pub trait RunStore: Send + Sync {
    /// Committed records, oldest first.
    fn list(&self) -> Result<Vec<RecordKey>>;

    /// Read one committed record.
    fn read(&self, key: &RecordKey) -> Result<TestRunResult>;

    /// Commit a new record. Existing records are never overwritten.
    fn write(&self, run: &TestRunResult) -> Result<RecordKey>;

    /// Read runs ordered by creation time (ties by run id), bounded by
    /// `options`. The newest records are selected by key before any record
    /// is read.
    fn load_runs(&self, options: &LoadOptions) -> Result<Vec<TestRunResult>> {
        let mut keys = self.list()?;
        keys.sort();
        if let Some(since) = options.since {
            keys.retain(|k| k.not_before(since));
        }
        if let Some(limit) = options.limit {
            let skip = keys.len().saturating_sub(limit);
            keys.drain(..skip);
        }

        let mut runs = keys
            .iter()
            .map(|key| self.read(key))
            .collect::<Result<Vec<_>>>()?;
        if let Some(since) = options.since {
            runs.retain(|r| r.created_at >= since);
        }
        runs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }
}

// =============================================================================
// Filesystem store
// =============================================================================

/// One JSON record per run under a root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configured directory, relative to `base`.
    pub fn from_config(base: &Path, config: &StorageConfig) -> Self {
        Self::new(base.join(&config.root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

impl RunStore for FsStore {
    fn list(&self) -> Result<Vec<RecordKey>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(&self.root, e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(&self.root, e))?;
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(RecordKey::from_file_name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn read(&self, key: &RecordKey) -> Result<TestRunResult> {
        let path = self.path_of(key);
        let content = std::fs::read_to_string(&path).map_err(|e| Error::storage(&path, e))?;
        let record: RunRecord = serde_json::from_str(&content)
            .map_err(|e| Error::storage(&path, format!("corrupt record: {e}")))?;

        if record.version > RECORD_VERSION {
            return Err(Error::storage(
                &path,
                format!(
                    "record version {} is newer than supported version {RECORD_VERSION}",
                    record.version
                ),
            ));
        }
        Ok(record.run)
    }

    fn write(&self, run: &TestRunResult) -> Result<RecordKey> {
        let key = RecordKey::for_run(run);
        let path = self.path_of(&key);
        std::fs::create_dir_all(&self.root).map_err(|e| Error::storage(&self.root, e))?;
        if path.exists() {
            return Err(Error::storage(&path, "record already exists"));
        }

        let record = RunRecord {
            version: RECORD_VERSION,
            run: run.clone(),
        };
        let content =
            serde_json::to_string_pretty(&record).map_err(|e| Error::storage(&path, e))?;

        // Write atomically via temp file; readers skip hidden .tmp names.
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(|e| Error::storage(&self.root, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| Error::storage(temp.path(), e))?;
        // Never replaces a record committed by a concurrent writer.
        temp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                Error::storage(&path, "record already exists")
            } else {
                Error::storage(&path, e.error)
            }
        })?;

        tracing::debug!("stored run {} as {}", run.run_id, path.display());
        Ok(key)
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<RecordKey, TestRunResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<RecordKey, TestRunResult>>> {
        self.records
            .lock()
            .map_err(|_| Error::storage("<memory>", "store lock poisoned"))
    }
}

impl RunStore for MemoryStore {
    fn list(&self) -> Result<Vec<RecordKey>> {
        Ok(self.records()?.keys().cloned().collect())
    }

    fn read(&self, key: &RecordKey) -> Result<TestRunResult> {
        self.records()?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::storage(format!("<memory>/{key}"), "no such record"))
    }

    fn write(&self, run: &TestRunResult) -> Result<RecordKey> {
        let key = RecordKey::for_run(run);
        let mut records = self.records()?;
        if records.contains_key(&key) {
            return Err(Error::storage(
                format!("<memory>/{key}"),
                "record already exists",
            ));
        }
        records.insert(key.clone(), run.clone());
        Ok(key)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
