// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Recording runner
//!
//! Remembers every command it is asked to run instead of running it.
//! Backs `--dry-run` and doubles as the runner in tests.

use async_trait::async_trait;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{CommandError, CommandLine, CommandRunner};
use crate::lifecycle::Cancellation;

/// A command the recorder was asked to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CommandLine,
    pub working_dir: PathBuf,
}

/// Runner that records invocations and reports scripted results
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    failures: Vec<(String, CommandError)>,
    echo: bool,
}

impl RecordingRunner {
    /// Recorder where every command succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that also prints each command it would run
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Commands whose rendered line contains `needle` fail with `error`
    pub fn fail_when(mut self, needle: impl Into<String>, error: CommandError) -> Self {
        self.failures.push((needle.into(), error));
        self
    }

    /// Everything run so far, in call order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered command lines run so far
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|i| i.command.to_string())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: &Path,
        cancellation: &Cancellation,
    ) -> Result<(), CommandError> {
        if cancellation.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        if self.echo {
            println!(
                "  {} {} {}",
                "would run:".dimmed(),
                command.to_string().cyan(),
                format!("(in {})", working_dir.display()).dimmed()
            );
        }

        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Invocation {
                command: command.clone(),
                working_dir: working_dir.to_path_buf(),
            });

        let rendered = command.to_string();
        match self.failures.iter().find(|(needle, _)| rendered.contains(needle)) {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let runner = RecordingRunner::new();
        let cancellation = Cancellation::new();

        runner
            .run(&CommandLine::shell("sh", "a"), Path::new("/w"), &cancellation)
            .await
            .unwrap();
        runner
            .run(&CommandLine::shell("sh", "b"), Path::new("/w"), &cancellation)
            .await
            .unwrap();

        assert_eq!(runner.command_lines(), vec!["sh -c a", "sh -c b"]);
        assert_eq!(runner.invocations()[0].working_dir, PathBuf::from("/w"));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let runner = RecordingRunner::new().fail_when("npm test", CommandError::Exit { code: 1 });

        let result = runner
            .run(
                &CommandLine::shell("sh", "npm test"),
                Path::new("/w"),
                &Cancellation::new(),
            )
            .await;

        assert_eq!(result, Err(CommandError::Exit { code: 1 }));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_is_not_recorded() {
        let runner = RecordingRunner::new();
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let result = runner
            .run(&CommandLine::shell("sh", "a"), Path::new("/w"), &cancellation)
            .await;

        assert_eq!(result, Err(CommandError::Cancelled));
        assert!(runner.invocations().is_empty());
    }
}
