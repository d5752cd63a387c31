// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_definition, DefinitionSource, OutputFormat};
use crate::executors::{check_tools, create_runner};
use crate::lifecycle::{Coordinator, LocalWorkspace, RunContext};
use crate::pipeline::{Orchestrator, PipelineValidator};
use crate::utils::colors;
use crate::CiError;

/// Run the pipeline
pub async fn run(
    pipeline_path: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
    dry_run: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let (definition, source) = load_definition(pipeline_path.as_deref())?;

    if format == OutputFormat::Text {
        match &source {
            DefinitionSource::File(path) => {
                println!("{}: {}", "Pipeline".bold(), path.display())
            }
            DefinitionSource::BuiltIn => println!(
                "{}: {}",
                "Pipeline".bold(),
                "built-in sample (no .cirun.yaml found)".dimmed()
            ),
        }
    }

    let validation = PipelineValidator::validate(&definition);
    if verbose && (validation.has_warnings() || !validation.is_valid()) {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for message in validation.errors.iter().chain(&validation.warnings) {
            eprintln!("  {} {}", "⚠".yellow(), message);
        }
        eprintln!();
    }

    let definitions = vec![definition];

    if !dry_run {
        check_tools(&definitions)?;
    }

    let root = match workspace_root {
        Some(root) => root,
        None => std::env::current_dir()
            .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?,
    };

    let context = Arc::new(RunContext::new(Arc::new(LocalWorkspace::new(root))));
    let coordinator = Coordinator::new(context.clone());
    let interrupt_listener = coordinator.listen_for_interrupt();

    if verbose {
        println!(
            "{}: {}",
            "Workspace".bold(),
            context.workspace().path().display()
        );
    }
    println!();

    let orchestrator = Orchestrator::new(context, create_runner(dry_run));
    // Workspace removal waits until every stage task has been joined
    let (report, _teardown) = coordinator.supervise(orchestrator.run(definitions)).await;
    interrupt_listener.abort();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report.summary()).map_err(CiError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!();
            let summary = format!("Run finished in {:.2}s", report.duration_ms as f64 / 1000.0);
            if report.success() {
                colors::print_success(&summary);
            } else {
                colors::print_error(&summary);
            }
        }
    }

    if report.cancelled {
        return Err(miette::miette!("Pipeline run was interrupted"));
    }

    if !report.success() {
        return Err(miette::miette!("Pipeline execution failed"));
    }

    Ok(())
}
