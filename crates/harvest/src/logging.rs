// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic logging setup for tools embedding harvest.
//!
//! Harvest itself only emits `tracing` events. Callers that have no
//! subscriber of their own can install this one, filtered by `HARVEST_LOG`
//! (e.g. `HARVEST_LOG=harvest=debug`). Logging is off by default.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "HARVEST_LOG";

/// Install a stderr subscriber filtered by `HARVEST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
