// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Orchestrator
//!
//! Wires generator → fetch → verify → build, drains the chain and reports
//! one status line per record.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{generate, PipelineRecord, StageKind, StageOutcome, StageProcessor};
use crate::executors::CommandRunner;
use crate::lifecycle::RunContext;
use crate::utils::colors;

/// Outcome of draining the chain
#[derive(Debug)]
pub struct RunReport {
    /// Records in the order they reached the sink
    pub records: Vec<PipelineRecord>,
    pub duration_ms: u64,
    /// Whether the run was cancelled before the chain drained naturally
    pub cancelled: bool,
}

impl RunReport {
    /// Not cancelled and no record failed
    pub fn success(&self) -> bool {
        !self.cancelled && self.records.iter().all(|r| !r.is_failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PipelineRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    /// Serializable view of the report
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            success: self.success(),
            cancelled: self.cancelled,
            duration_ms: self.duration_ms,
            pipelines: self
                .records
                .iter()
                .map(|record| PipelineSummary {
                    name: record.name.clone(),
                    failure: record.failure.as_ref().map(|f| FailureSummary {
                        stage: f.stage,
                        kind: f.cause.kind(),
                        message: f.cause.to_string(),
                    }),
                    stages: record.history.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub pipelines: Vec<PipelineSummary>,
}

#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    pub failure: Option<FailureSummary>,
    pub stages: Vec<StageOutcome>,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub stage: StageKind,
    pub kind: &'static str,
    pub message: String,
}

/// Drives one run of the stage chain
pub struct Orchestrator {
    context: Arc<RunContext>,
    runner: Arc<dyn CommandRunner>,
}

impl Orchestrator {
    pub fn new(context: Arc<RunContext>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { context, runner }
    }

    /// Push `definitions` through every stage and drain the result.
    ///
    /// Draining always runs to the end of the sequence (or cancellation);
    /// a failed record does not stop the drain.
    pub async fn run(&self, definitions: Vec<PipelineRecord>) -> RunReport {
        let start = Instant::now();
        let cancellation = self.context.cancellation().clone();

        let (mut stream, generator) = generate(definitions, cancellation.clone());
        let mut handles: Vec<JoinHandle<()>> = vec![generator];

        for kind in StageKind::ALL {
            let stage = StageProcessor::new(kind, self.context.clone(), self.runner.clone());
            debug!(stage = %stage.kind(), "starting stage");
            let (next, handle) = stage.spawn(stream);
            stream = next;
            handles.push(handle);
        }

        let mut records = Vec::new();
        while let Some(record) = stream.recv().await {
            match &record.failure {
                Some(failure) => colors::print_pipeline_failure(&record.name, failure),
                None => colors::print_pipeline_success(&record.name),
            }
            records.push(record);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("stage task ended abnormally: {}", e);
            }
        }

        let cancelled = cancellation.is_cancelled();
        debug!(records = records.len(), cancelled, "chain drained");

        RunReport {
            records,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            cancelled,
        }
    }
}
