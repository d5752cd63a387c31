// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Command runners
//!
//! This module provides the runner trait the stages call into, and
//! implementations that run real processes or only record what would run.

mod process;
mod recording;

pub use process::ProcessRunner;
pub use recording::RecordingRunner;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::errors::{CiError, CiResult};
use crate::lifecycle::Cancellation;
use crate::pipeline::PipelineRecord;

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<shell> -c <script>`
    pub fn shell(shell: &str, script: &str) -> Self {
        Self::new(shell, ["-c", script])
    }

    /// `git clone <location> <destination> --progress`
    pub fn git_clone(location: &str, destination: &Path) -> Self {
        Self::new(
            "git",
            [
                "clone".to_string(),
                location.to_string(),
                destination.to_string_lossy().into_owned(),
                "--progress".to_string(),
            ],
        )
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Why a command did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("failed to start: {0}")]
    Spawn(String),

    #[error("exited with status {code}")]
    Exit { code: i32 },

    #[error("terminated by signal")]
    Signal,

    #[error("cancelled")]
    Cancelled,

    #[error("working directory '{path}' unusable: {reason}")]
    WorkingDirectory { path: PathBuf, reason: String },
}

/// Capability to run one external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` inside `working_dir`, attached to the caller's stdio.
    ///
    /// Implementations must stop the command when `cancellation` fires
    /// and return [`CommandError::Cancelled`].
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: &Path,
        cancellation: &Cancellation,
    ) -> Result<(), CommandError>;
}

/// Runner used for a run: real processes, or a recorder for dry runs
pub fn create_runner(dry_run: bool) -> Arc<dyn CommandRunner> {
    if dry_run {
        Arc::new(RecordingRunner::echoing())
    } else {
        Arc::new(ProcessRunner::new())
    }
}

/// Programs the given definitions need on PATH
pub fn required_tools(records: &[PipelineRecord]) -> BTreeSet<String> {
    let mut tools = BTreeSet::new();

    for record in records {
        if record.tasks.fetch.is_some() {
            tools.insert("git".to_string());
        }
        for task in [&record.tasks.verify, &record.tasks.build].into_iter().flatten() {
            tools.insert(task.shell.clone());
        }
    }

    tools
}

/// Check the tools the definitions need are installed
pub fn check_tools(records: &[PipelineRecord]) -> CiResult<()> {
    let missing: Vec<String> = required_tools(records)
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CiError::tools_missing(missing))
    }
}
