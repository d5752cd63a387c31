// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Pipeline validation
//!
//! Static checks on a definition before it is run. The stage chain itself
//! does not depend on these: a definition with a missing mandatory stage
//! still runs and fails in that stage.

use crate::pipeline::{CommandTask, PipelineRecord, StageKind};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline definition
    pub fn validate(pipeline: &PipelineRecord) -> ValidationResult {
        let mut result = ValidationResult::new();
        let tasks = &pipeline.tasks;

        match &tasks.fetch {
            None => result.add_error("Stage 'fetch' is not configured; the run will fail immediately"),
            Some(fetch) if fetch.repository_location.trim().is_empty() => {
                result.add_error("Stage 'fetch': repository_location is empty");
            }
            Some(_) => {}
        }

        if tasks.verify.is_none() {
            result.add_warning("Stage 'verify' is not configured and will be skipped");
        }

        if tasks.build.is_none() {
            result.add_error("Stage 'build' is not configured; the run will fail after fetching");
        }

        for stage in [StageKind::Verify, StageKind::Build] {
            if let Some(task) = tasks.command_task(stage) {
                Self::validate_command_task(stage, task, &mut result);
            }
        }

        result
    }

    /// Validate a verify/build stage configuration
    fn validate_command_task(stage: StageKind, task: &CommandTask, result: &mut ValidationResult) {
        if task.command.trim().is_empty() {
            result.add_error(&format!("Stage '{}': command is empty", stage));
        }

        if task.shell.trim().is_empty() {
            result.add_error(&format!("Stage '{}': shell is empty", stage));
        }

        if matches!(task.setup.as_deref(), Some(s) if s.trim().is_empty()) {
            result.add_warning(&format!(
                "Stage '{}': setup is empty and will be ignored",
                stage
            ));
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
