//! Git adapter
//!
//! Thin wrapper over `git` subprocess calls. Exit status and stderr are
//! surfaced verbatim rather than interpreted.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::debug;

/// Result of `git commit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommitOutcome {
    /// stderr, or stdout when git reported on stdout only ("nothing to commit")
    pub fn message(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Git commands run in a fixed working directory
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Check for the `.git` marker in the working directory
    pub fn has_repo(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    /// `git add .`
    pub fn stage_all(&self) -> Result<Output> {
        self.run(&["add", "."])
    }

    pub fn commit(&self, message: &str) -> Result<CommitOutcome> {
        let output = self.run(&["commit", "-m", message])?;
        Ok(CommitOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Raw `git status --porcelain` output
    pub fn status_porcelain(&self) -> Result<String> {
        let output = self.run(&["status", "--porcelain"])?;
        if !output.status.success() {
            bail!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `git reset --hard`
    pub fn hard_reset(&self) -> Result<Output> {
        self.run(&["reset", "--hard"])
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, dir = %self.workdir.display(), "Running git command");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        debug!(
            args = ?args,
            code = ?output.status.code(),
            "git command finished"
        );
        Ok(output)
    }
}
