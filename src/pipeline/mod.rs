// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Pipeline definitions and the staged execution engine
//!
//! A run pushes pipeline records from a generator through a fixed chain of
//! stage processors (fetch, verify, build), each on its own task, connected
//! by channels. The orchestrator drains the end of the chain.

mod definition;
mod generator;
mod orchestrator;
mod stage;
mod validation;

pub use definition::*;
pub use generator::generate;
pub use orchestrator::{FailureSummary, Orchestrator, PipelineSummary, RunReport, RunSummary};
pub use stage::{StageAction, StageProcessor};
pub use validation::{PipelineValidator, ValidationResult};

/// Capacity of the channels between stages; a record is handed over, not queued
pub(crate) const CHANNEL_CAPACITY: usize = 1;
