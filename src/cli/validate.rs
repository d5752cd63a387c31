// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{PipelineRecord, PipelineValidator, StageKind};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match PipelineRecord::from_file(&pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to load {}", "✗".red(), pipeline_path.display());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Pipeline file parsed", "✓".green());

    let validation = PipelineValidator::validate(&pipeline);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", pipeline.name);
        for stage in StageKind::ALL {
            let detail = match stage {
                StageKind::Fetch => pipeline
                    .tasks
                    .fetch
                    .as_ref()
                    .map(|f| f.repository_location.clone()),
                _ => pipeline.tasks.command_task(stage).map(|t| t.script()),
            };
            match detail {
                Some(detail) => println!("    {}. {} {}", stage.ordinal(), stage, detail.dimmed()),
                None => println!("    {}. {} {}", stage.ordinal(), stage, "(not configured)".dimmed()),
            }
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }

    Ok(())
}
