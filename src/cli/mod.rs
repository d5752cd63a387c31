// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for cirun.

pub mod init;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineRecord;
use crate::CiResult;

/// Default pipeline definition file
pub const DEFAULT_PIPELINE_FILE: &str = ".cirun.yaml";

/// Staged CI pipeline runner
///
/// Clone a repository into a throwaway workspace, test it and build it.
#[derive(Parser, Debug)]
#[clap(
    name = "cirun",
    version,
    about = "Staged CI pipeline runner: fetch, verify, build",
    long_about = None,
    after_help = "Examples:\n\
        cirun init                      Write a sample .cirun.yaml\n\
        cirun validate                  Check the pipeline definition\n\
        cirun run                       Execute the pipeline\n\
        cirun run --dry-run             Show the commands without running them\n\n\
        See 'cirun <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a sample pipeline definition
    Init {
        /// Overwrite an existing definition
        #[clap(short, long)]
        force: bool,
    },

    /// Run the pipeline
    Run {
        /// Pipeline file (built-in sample when omitted and .cirun.yaml is absent)
        #[clap(short, long, env = "CIRUN_PIPELINE")]
        pipeline: Option<PathBuf>,

        /// Directory the run workspace is created in
        #[clap(long, env = "CIRUN_WORKSPACE_ROOT", value_name = "DIR")]
        workspace_root: Option<PathBuf>,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        /// Report format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,
    },
}

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where a run's definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionSource {
    File(PathBuf),
    BuiltIn,
}

/// Load the definition named on the command line, the default file, or the sample
pub fn load_definition(
    pipeline: Option<&Path>,
) -> CiResult<(PipelineRecord, DefinitionSource)> {
    match pipeline {
        Some(path) => Ok((
            PipelineRecord::from_file(path)?,
            DefinitionSource::File(path.to_path_buf()),
        )),
        None => {
            let default = Path::new(DEFAULT_PIPELINE_FILE);
            if default.exists() {
                Ok((
                    PipelineRecord::from_file(default)?,
                    DefinitionSource::File(default.to_path_buf()),
                ))
            } else {
                Ok((PipelineRecord::sample(), DefinitionSource::BuiltIn))
            }
        }
    }
}
