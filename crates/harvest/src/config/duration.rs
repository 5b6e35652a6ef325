// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Duration string parsing for history windows.
//!
//! Supports formats:
//! - `"500ms"` → 500 milliseconds
//! - `"30s"` → 30 seconds
//! - `"15m"` → 15 minutes
//! - `"12h"` → 12 hours
//! - `"30d"` → 30 days

use std::time::Duration;

use serde::{Deserialize, Deserializer};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parse a duration string into a Duration.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Check for milliseconds first (longer suffix)
    if let Some(ms) = s.strip_suffix("ms") {
        let n: u64 = ms
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration: {s}"))?;
        return Ok(Duration::from_millis(n));
    }

    // Seconds support fractions
    if let Some(secs) = s.strip_suffix('s') {
        let n: f64 = secs
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration: {s}"))?;
        if !n.is_finite() || n < 0.0 {
            return Err(format!("invalid duration: {s}"));
        }
        return Duration::try_from_secs_f64(n).map_err(|_| format!("duration too large: {s}"));
    }

    for (suffix, unit) in [('m', MINUTE), ('h', HOUR), ('d', DAY)] {
        if let Some(count) = s.strip_suffix(suffix) {
            let n: u64 = count
                .trim()
                .parse()
                .map_err(|_| format!("invalid duration: {s}"))?;
            return n
                .checked_mul(unit)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration too large: {s}"));
        }
    }

    Err(format!(
        "invalid duration format: {s} (use 500ms, 30s, 15m, 12h, or 30d)"
    ))
}

/// Deserialize an optional duration string.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(s) => parse_duration(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
