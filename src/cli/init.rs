// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Init command - write a sample pipeline definition

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::DEFAULT_PIPELINE_FILE;
use crate::pipeline::PipelineRecord;
use crate::{CiError, CiResult};

/// Run the init command
pub async fn run(force: bool, verbose: bool) -> Result<()> {
    let path = Path::new(DEFAULT_PIPELINE_FILE);

    if path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            DEFAULT_PIPELINE_FILE
        ));
    }

    let content = render_sample()?;
    std::fs::write(path, &content).map_err(|e| CiError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    println!("  {} Created {}", "✓".green(), DEFAULT_PIPELINE_FILE);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to point at your repository", DEFAULT_PIPELINE_FILE.cyan());
    println!("  2. Run {} to check it", "cirun validate".cyan());
    println!("  3. Run {} to execute the pipeline", "cirun run".cyan());

    if verbose {
        println!();
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn render_sample() -> CiResult<String> {
    let body = PipelineRecord::sample().to_yaml()?;
    Ok(format!(
        "# cirun pipeline definition\n\
         # Stages run in order: fetch -> verify -> build. 'verify' may be omitted.\n\
         {}",
        body
    ))
}
