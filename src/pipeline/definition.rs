// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Pipeline definition structures
//!
//! Defines the schema for .cirun.yaml files and the record that flows
//! through the stage chain.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{CiError, CiResult, StageError};

/// Repository used by the built-in sample definition
pub const SAMPLE_REPOSITORY: &str = "https://github.com/VarthanV/sample-nodejs-app";

/// One of the three fixed stages, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Clone the source repository into the workspace
    Fetch,
    /// Run the test command
    Verify,
    /// Run the build command
    Build,
}

impl StageKind {
    /// All stages in chain order
    pub const ALL: [StageKind; 3] = [Self::Fetch, Self::Verify, Self::Build];

    /// Whether a definition must configure this stage
    pub fn is_required(self) -> bool {
        !matches!(self, Self::Verify)
    }

    /// Position in the chain, starting at 1
    pub fn ordinal(self) -> usize {
        match self {
            Self::Fetch => 1,
            Self::Verify => 2,
            Self::Build => 3,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Verify => write!(f, "verify"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// Fetch stage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FetchTask {
    /// Anything `git clone` accepts: URL, local path, scp-style address
    pub repository_location: String,
}

/// Verify/build stage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandTask {
    /// Command line to run inside the workspace
    pub command: String,

    /// Preparation command chained before `command` with `&&`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,

    /// Shell used to interpret the command line
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_shell() -> String {
    "sh".to_string()
}

impl CommandTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            setup: None,
            shell: default_shell(),
        }
    }

    pub fn with_setup(mut self, setup: impl Into<String>) -> Self {
        self.setup = Some(setup.into());
        self
    }

    /// The script handed to `<shell> -c`
    pub fn script(&self) -> String {
        match self.setup.as_deref() {
            Some(setup) if !setup.trim().is_empty() => format!("{} && {}", setup, self.command),
            _ => self.command.clone(),
        }
    }
}

/// Stage configurations keyed by stage; an absent key means "not configured"
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Tasks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<CommandTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<CommandTask>,
}

impl Tasks {
    /// Whether the given stage has an entry
    pub fn contains(&self, stage: StageKind) -> bool {
        match stage {
            StageKind::Fetch => self.fetch.is_some(),
            StageKind::Verify => self.verify.is_some(),
            StageKind::Build => self.build.is_some(),
        }
    }

    /// Command configuration for verify or build
    pub fn command_task(&self, stage: StageKind) -> Option<&CommandTask> {
        match stage {
            StageKind::Fetch => None,
            StageKind::Verify => self.verify.as_ref(),
            StageKind::Build => self.build.as_ref(),
        }
    }

    /// Configured stages in chain order
    pub fn configured(&self) -> Vec<StageKind> {
        StageKind::ALL
            .into_iter()
            .filter(|s| self.contains(*s))
            .collect()
    }
}

/// Failure carried by a record: which stage detected it, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: StageKind,
    pub cause: StageError,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.cause)
    }
}

/// Per-stage state for a single record
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Terminal state a stage reached for a record
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub state: StageState,
    pub duration_ms: u64,
}

/// The unit of work flowing through the stage chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Pipeline name (for reporting only)
    #[serde(default = "default_name")]
    pub name: String,

    /// Stage configurations
    #[serde(default)]
    pub tasks: Tasks,

    /// Set once by the first failing stage, never cleared
    #[serde(skip)]
    pub failure: Option<StageFailure>,

    /// Stages that acted on this record, in order
    #[serde(skip)]
    pub history: Vec<StageOutcome>,
}

fn default_name() -> String {
    "pipeline".to_string()
}

impl PipelineRecord {
    pub fn new(name: impl Into<String>, tasks: Tasks) -> Self {
        Self {
            name: name.into(),
            tasks,
            failure: None,
            history: Vec::new(),
        }
    }

    /// The fixed fetch/verify/build definition used when no file is given
    pub fn sample() -> Self {
        Self::new(
            "sample-nodejs-app",
            Tasks {
                fetch: Some(FetchTask {
                    repository_location: SAMPLE_REPOSITORY.to_string(),
                }),
                verify: Some(CommandTask::new("npm run test").with_setup("npm i")),
                build: Some(CommandTask::new("npm run build")),
            },
        )
    }

    /// Load a definition from a YAML or TOML file (by extension)
    pub fn from_file(path: &Path) -> CiResult<Self> {
        if !path.exists() {
            return Err(CiError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CiError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse a definition from YAML
    pub fn from_yaml(yaml: &str) -> CiResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse a definition from TOML
    pub fn from_toml(source: &str) -> CiResult<Self> {
        toml::from_str(source).map_err(Into::into)
    }

    /// Serialize the definition (not the run state) to YAML
    pub fn to_yaml(&self) -> CiResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Record a failure. A record that already failed keeps its first failure.
    pub fn fail(&mut self, stage: StageKind, cause: StageError) {
        if self.failure.is_none() {
            self.failure = Some(StageFailure { stage, cause });
        }
    }

    pub(crate) fn record_outcome(&mut self, stage: StageKind, state: StageState, elapsed: Duration) {
        self.history.push(StageOutcome {
            stage,
            state,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    /// Current state of a stage for this record
    pub fn state_of(&self, stage: StageKind) -> StageState {
        self.history
            .iter()
            .rev()
            .find(|o| o.stage == stage)
            .map_or(StageState::Pending, |o| o.state)
    }
}
