// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Error types
//!
//! Two families live here. [`StageError`] is what a stage records into a
//! pipeline record and travels with it to the sink. [`CiError`] covers
//! everything around the pipeline: loading definitions, checking tools,
//! writing files.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::executors::CommandError;
use crate::pipeline::StageKind;

/// Result type for cirun operations
pub type CiResult<T> = Result<T, CiError>;

/// Failure cause recorded by a stage
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("stage '{stage}' required")]
    #[diagnostic(
        code(cirun::stage_config_missing),
        help("Add a '{stage}' entry under 'tasks' in the pipeline definition")
    )]
    StageConfigMissing { stage: StageKind },

    #[error("workspace '{id}' is no longer available")]
    #[diagnostic(
        code(cirun::workspace_unavailable),
        help("The run is being torn down; no further stage work is possible")
    )]
    WorkspaceUnavailable { id: String },

    #[error("command `{command}` failed: {source}")]
    #[diagnostic(code(cirun::command_failed))]
    CommandFailed {
        command: String,
        #[source]
        source: CommandError,
    },

    #[error("cannot enter workspace directory '{path}': {reason}")]
    #[diagnostic(
        code(cirun::directory_change_failed),
        help("The fetch stage creates the workspace; check that it ran successfully")
    )]
    DirectoryChangeFailed { path: PathBuf, reason: String },
}

/// Main error type for cirun
#[derive(Error, Debug, Diagnostic)]
pub enum CiError {
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(cirun::pipeline_not_found),
        help("Create a pipeline with 'cirun init' or write .cirun.yaml manually")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Required tools are not installed: {}", .tools.join(", "))]
    #[diagnostic(code(cirun::tools_missing))]
    ToolsMissing {
        tools: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(cirun::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(cirun::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(cirun::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(cirun::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(cirun::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(cirun::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for CiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for CiError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for CiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for CiError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl CiError {
    /// Create a missing-tools error with installation hints
    pub fn tools_missing(tools: Vec<String>) -> Self {
        let hints: Vec<String> = tools
            .iter()
            .map(|tool| match tool.as_str() {
                "git" => "Install git: https://git-scm.com/downloads".to_string(),
                other => format!("Install {} and ensure it's in your PATH", other),
            })
            .collect();

        Self::ToolsMissing {
            tools,
            help: Some(hints.join("\n")),
        }
    }
}

impl StageError {
    /// Short kind name, stable across releases (used in JSON reports)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StageConfigMissing { .. } => "stage_config_missing",
            Self::WorkspaceUnavailable { .. } => "workspace_unavailable",
            Self::CommandFailed { .. } => "command_failed",
            Self::DirectoryChangeFailed { .. } => "directory_change_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_config_missing_message() {
        let err = StageError::StageConfigMissing {
            stage: StageKind::Fetch,
        };
        assert_eq!(err.to_string(), "stage 'fetch' required");
        assert_eq!(err.kind(), "stage_config_missing");
    }

    #[test]
    fn test_command_failed_wraps_runner_cause() {
        let err = StageError::CommandFailed {
            command: "sh -c false".into(),
            source: CommandError::Exit { code: 1 },
        };
        assert!(err.to_string().contains("sh -c false"));
        assert!(err.to_string().contains("status 1"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_tools_missing_has_git_hint() {
        let err = CiError::tools_missing(vec!["git".into(), "zsh".into()]);
        match err {
            CiError::ToolsMissing { tools, help } => {
                assert_eq!(tools.len(), 2);
                let help = help.unwrap();
                assert!(help.contains("git-scm.com"));
                assert!(help.contains("Install zsh"));
            }
            _ => panic!("Expected ToolsMissing"),
        }
    }
}
