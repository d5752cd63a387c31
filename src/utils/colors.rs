// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Terminal output
//!
//! Operator-facing lines with a consistent color scheme. Everything here is
//! advisory; nothing in the pipeline depends on what gets printed.

use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use crate::errors::StageError;
use crate::pipeline::{StageFailure, StageKind};

/// Disable colors when NO_COLOR is set or there is no TERM
pub fn configure() {
    if std::env::var_os("NO_COLOR").is_some() || std::env::var_os("TERM").is_none() {
        colored::control::set_override(false);
    }
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Banner printed when a stage starts working on a record
pub fn print_stage_start(stage: StageKind, pipeline: &str) {
    println!(
        "{}",
        format!(
            "── Stage {} ({}): {} ──",
            stage.ordinal(),
            stage,
            stage_activity(stage)
        )
        .green()
        .bold()
    );
    println!("   {}", format!("pipeline: {}", pipeline).dimmed());
}

pub fn print_stage_success(stage: StageKind, elapsed: Duration) {
    println!(
        "{} {}",
        format!("── Stage {} ({}): successful", stage.ordinal(), stage).green(),
        format!("({:.2}s)", elapsed.as_secs_f64()).dimmed()
    );
}

pub fn print_stage_skipped(stage: StageKind) {
    println!(
        "{}",
        format!(
            "── Stage {} ({}): not configured, skipping",
            stage.ordinal(),
            stage
        )
        .yellow()
    );
}

pub fn print_stage_failed(stage: StageKind, cause: &StageError) {
    println!(
        "{}",
        format!("── Stage {} ({}): failed: {}", stage.ordinal(), stage, cause).red()
    );
}

/// Final status line for a record that made it through every stage
pub fn print_pipeline_success(pipeline: &str) {
    println!(
        "{}",
        format!("Pipeline '{}' completed successfully", pipeline)
            .green()
            .bold()
    );
}

/// Final status line for a failed record
pub fn print_pipeline_failure(pipeline: &str, failure: &StageFailure) {
    println!(
        "{}",
        format!(
            "Pipeline '{}' failed in stage {} with error: {}",
            pipeline, failure.stage, failure.cause
        )
        .red()
        .bold()
    );
}

pub fn print_interrupted() {
    println!();
    println!("{}", "Interrupted, cancelling run...".yellow().bold());
}

pub fn print_cleanup(workspace: &Path) {
    println!(
        "{} {}",
        "Cleaning up...".blue(),
        workspace.display().to_string().dimmed()
    );
}

fn stage_activity(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Fetch => "cloning repository",
        StageKind::Verify => "running tests",
        StageKind::Build => "building",
    }
}
