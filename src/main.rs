// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! cirun - staged CI pipeline runner
//!
//! Fetch a repository into a throwaway workspace, verify it, build it.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cirun::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cirun=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    cirun::utils::colors::configure();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { force } => cirun::cli::init::run(force, cli.verbose).await,
        Commands::Run {
            pipeline,
            workspace_root,
            dry_run,
            format,
        } => cirun::cli::run::run(pipeline, workspace_root, dry_run, format, cli.verbose).await,
        Commands::Validate { pipeline } => cirun::cli::validate::run(pipeline, cli.verbose).await,
    }
}
