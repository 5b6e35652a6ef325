// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run metadata capture from the surrounding checkout.
//!
//! Uses git2 (libgit2) so no `git` subprocess is needed.

use std::path::Path;

use anyhow::Context;
use git2::Repository;

use crate::model::RunMetadata;

/// Branch name and short commit hash of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    /// None on a detached HEAD.
    pub branch: Option<String>,
    /// Short commit hash (7 characters).
    pub commit: String,
}

impl RunMetadata {
    /// Metadata for a run produced from the checkout at `root`.
    ///
    /// Outside a git repository (or on an unborn branch) only the platform
    /// is filled in.
    pub fn capture(root: &Path) -> Self {
        let mut metadata = RunMetadata {
            platform: Some(platform()),
            ..Default::default()
        };

        match git_info(root) {
            Ok(info) => {
                metadata.branch = info.branch;
                metadata.commit = Some(info.commit);
            }
            Err(e) => tracing::debug!("no git metadata for {}: {e:#}", root.display()),
        }

        metadata
    }
}

/// Target platform, e.g. "linux-x86_64".
pub fn platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Read branch and HEAD commit of the repository containing `root`.
pub fn git_info(root: &Path) -> anyhow::Result<GitInfo> {
    let repo = Repository::discover(root)
        .with_context(|| format!("not a git repository: {}", root.display()))?;
    let head = repo.head().context("failed to resolve HEAD")?;
    let commit = head.peel_to_commit().context("HEAD is not a commit")?;

    let branch = if head.is_branch() {
        head.shorthand().map(str::to_string)
    } else {
        None
    };

    let id = commit.id().to_string();
    Ok(GitInfo {
        branch,
        commit: id[..7.min(id.len())].to_string(),
    })
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
