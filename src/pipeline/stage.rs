// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Stage processor
//!
//! One concurrent filter per stage. Each consumes records from upstream,
//! acts on them one at a time, and emits exactly one record downstream per
//! record consumed. A record that already failed is forwarded untouched.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{PipelineRecord, StageKind, StageState, CHANNEL_CAPACITY};
use crate::errors::StageError;
use crate::executors::{CommandError, CommandLine, CommandRunner};
use crate::lifecycle::RunContext;
use crate::utils::colors;

/// What a stage will do with a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    /// Optional stage without configuration
    Skip,
    /// Run a command in a directory
    Run {
        command: CommandLine,
        working_dir: PathBuf,
    },
}

/// Stage processor bound to one stage of one run
pub struct StageProcessor {
    kind: StageKind,
    context: Arc<RunContext>,
    runner: Arc<dyn CommandRunner>,
}

impl StageProcessor {
    pub fn new(kind: StageKind, context: Arc<RunContext>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            kind,
            context,
            runner,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Start consuming `upstream` on a new task.
    ///
    /// The returned channel closes when upstream ends or the run is cancelled.
    pub fn spawn(
        self,
        upstream: mpsc::Receiver<PipelineRecord>,
    ) -> (mpsc::Receiver<PipelineRecord>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run_loop(upstream, tx));
        (rx, handle)
    }

    async fn run_loop(
        self,
        mut upstream: mpsc::Receiver<PipelineRecord>,
        downstream: mpsc::Sender<PipelineRecord>,
    ) {
        let cancellation = self.context.cancellation().clone();

        loop {
            let record = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                next = upstream.recv() => match next {
                    Some(record) => record,
                    None => break,
                },
            };

            let record = self.process(record).await;

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                sent = downstream.send(record) => {
                    if sent.is_err() {
                        debug!(stage = %self.kind, "downstream closed");
                        break;
                    }
                }
            }
        }

        debug!(stage = %self.kind, cancelled = cancellation.is_cancelled(), "stage finished");
    }

    /// Apply this stage to one record
    pub async fn process(&self, mut record: PipelineRecord) -> PipelineRecord {
        if let Some(failure) = &record.failure {
            debug!(
                stage = %self.kind,
                failed_stage = %failure.stage,
                pipeline = %record.name,
                "forwarding failed record"
            );
            return record;
        }

        let start = Instant::now();
        debug!(stage = %self.kind, pipeline = %record.name, state = %StageState::Running, "entering stage");

        let result = match self.plan(&record) {
            Ok(StageAction::Skip) => {
                colors::print_stage_skipped(self.kind);
                record.record_outcome(self.kind, StageState::Skipped, start.elapsed());
                debug!(stage = %self.kind, state = %StageState::Skipped, "stage not configured");
                return record;
            }
            Ok(StageAction::Run {
                command,
                working_dir,
            }) => {
                colors::print_stage_start(self.kind, &record.name);
                self.runner
                    .run(&command, &working_dir, self.context.cancellation())
                    .await
                    .map_err(|e| command_failure(&command, e))
            }
            Err(cause) => Err(cause),
        };

        let elapsed = start.elapsed();
        match result {
            Ok(()) => {
                colors::print_stage_success(self.kind, elapsed);
                record.record_outcome(self.kind, StageState::Succeeded, elapsed);
                debug!(stage = %self.kind, state = %StageState::Succeeded, "stage done");
            }
            Err(cause) => {
                colors::print_stage_failed(self.kind, &cause);
                debug!(stage = %self.kind, state = %StageState::Failed, error = %cause, "stage done");
                record.record_outcome(self.kind, StageState::Failed, elapsed);
                record.fail(self.kind, cause);
            }
        }

        record
    }

    /// Decide what to do with a record that has not failed
    pub fn plan(&self, record: &PipelineRecord) -> Result<StageAction, StageError> {
        match self.kind {
            StageKind::Fetch => {
                let task = record.tasks.fetch.as_ref().ok_or(StageError::StageConfigMissing {
                    stage: StageKind::Fetch,
                })?;

                Ok(StageAction::Run {
                    command: CommandLine::git_clone(
                        &task.repository_location,
                        self.context.workspace_dir()?,
                    ),
                    working_dir: self.context.workspace_root()?.to_path_buf(),
                })
            }
            StageKind::Verify | StageKind::Build => match record.tasks.command_task(self.kind) {
                Some(task) => Ok(StageAction::Run {
                    command: CommandLine::shell(&task.shell, &task.script()),
                    working_dir: self.context.workspace_dir()?.to_path_buf(),
                }),
                None if self.kind.is_required() => {
                    Err(StageError::StageConfigMissing { stage: self.kind })
                }
                None => Ok(StageAction::Skip),
            },
        }
    }
}

fn command_failure(command: &CommandLine, error: CommandError) -> StageError {
    match error {
        CommandError::WorkingDirectory { path, reason } => {
            StageError::DirectoryChangeFailed { path, reason }
        }
        source => StageError::CommandFailed {
            command: command.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::{ProcessRunner, RecordingRunner};
    use crate::lifecycle::LocalWorkspace;
    use crate::pipeline::{CommandTask, FetchTask, Tasks};
    use std::path::Path;

    fn context() -> Arc<RunContext> {
        Arc::new(RunContext::new(Arc::new(LocalWorkspace::with_id("/ci", "run"))))
    }

    fn record(fetch: bool, verify: bool, build: bool) -> PipelineRecord {
        PipelineRecord::new(
            "p",
            Tasks {
                fetch: fetch.then(|| FetchTask {
                    repository_location: "R".into(),
                }),
                verify: verify.then(|| CommandTask::new("T")),
                build: build.then(|| CommandTask::new("B")),
            },
        )
    }

    fn processor(kind: StageKind, runner: Arc<RecordingRunner>) -> StageProcessor {
        StageProcessor::new(kind, context(), runner)
    }

    #[test]
    fn test_plan_fetch_clones_into_workspace() {
        let stage = processor(StageKind::Fetch, Arc::new(RecordingRunner::new()));

        let action = stage.plan(&record(true, true, true)).unwrap();
        assert_eq!(
            action,
            StageAction::Run {
                command: CommandLine::git_clone("R", Path::new("/ci/run")),
                working_dir: PathBuf::from("/ci"),
            }
        );
    }

    #[test]
    fn test_plan_build_uses_setup_and_shell() {
        let stage = processor(StageKind::Build, Arc::new(RecordingRunner::new()));
        let mut rec = record(true, false, false);
        let mut build = CommandTask::new("make").with_setup("./configure");
        build.shell = "bash".into();
        rec.tasks.build = Some(build);

        let action = stage.plan(&rec).unwrap();
        assert_eq!(
            action,
            StageAction::Run {
                command: CommandLine::shell("bash", "./configure && make"),
                working_dir: PathBuf::from("/ci/run"),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_fetch_fails_without_running() {
        let runner = Arc::new(RecordingRunner::new());
        let stage = processor(StageKind::Fetch, runner.clone());

        let out = stage.process(record(false, true, true)).await;

        let failure = out.failure.unwrap();
        assert_eq!(failure.stage, StageKind::Fetch);
        assert_eq!(
            failure.cause,
            StageError::StageConfigMissing {
                stage: StageKind::Fetch
            }
        );
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_verify_is_skipped() {
        let runner = Arc::new(RecordingRunner::new());
        let stage = processor(StageKind::Verify, runner.clone());

        let out = stage.process(record(true, false, true)).await;

        assert!(out.failure.is_none());
        assert_eq!(out.state_of(StageKind::Verify), StageState::Skipped);
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_build_fails() {
        let runner = Arc::new(RecordingRunner::new());
        let stage = processor(StageKind::Build, runner.clone());

        let out = stage.process(record(true, true, false)).await;

        assert_eq!(out.failure.unwrap().stage, StageKind::Build);
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_record_is_forwarded_untouched_by_every_stage() {
        for kind in StageKind::ALL {
            let runner = Arc::new(RecordingRunner::new());
            let stage = processor(kind, runner.clone());
            let mut rec = record(true, true, true);
            let cause = StageError::CommandFailed {
                command: "earlier".into(),
                source: CommandError::Exit { code: 9 },
            };
            rec.fail(StageKind::Fetch, cause.clone());

            let out = stage.process(rec).await;

            assert!(runner.invocations().is_empty(), "{} ran a command", kind);
            let failure = out.failure.as_ref().unwrap();
            assert_eq!(failure.stage, StageKind::Fetch);
            assert_eq!(failure.cause, cause);
            assert!(out.history.is_empty());
        }
    }

    #[tokio::test]
    async fn test_command_failure_is_recorded() {
        let runner = Arc::new(RecordingRunner::new().fail_when("T", CommandError::Exit { code: 1 }));
        let stage = processor(StageKind::Verify, runner);

        let out = stage.process(record(true, true, true)).await;

        let failure = out.failure.as_ref().unwrap();
        assert_eq!(failure.stage, StageKind::Verify);
        assert!(matches!(
            failure.cause,
            StageError::CommandFailed {
                source: CommandError::Exit { code: 1 },
                ..
            }
        ));
        assert_eq!(out.state_of(StageKind::Verify), StageState::Failed);
    }

    #[tokio::test]
    async fn test_released_workspace_is_unavailable() {
        let runner = Arc::new(RecordingRunner::new());
        let ctx = context();
        ctx.release();
        let stage = StageProcessor::new(StageKind::Build, ctx, runner.clone());

        let out = stage.process(record(true, true, true)).await;

        assert!(matches!(
            out.failure.unwrap().cause,
            StageError::WorkspaceUnavailable { .. }
        ));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_workspace_dir_is_directory_change_failure() {
        let root = tempfile::tempdir().unwrap();
        let ctx = Arc::new(RunContext::new(Arc::new(LocalWorkspace::with_id(
            root.path(),
            "not-cloned",
        ))));
        let stage = StageProcessor::new(StageKind::Build, ctx, Arc::new(ProcessRunner::new()));

        let out = stage.process(record(true, true, true)).await;

        assert!(matches!(
            out.failure.unwrap().cause,
            StageError::DirectoryChangeFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_spawned_stage_emits_one_per_input() {
        let runner = Arc::new(RecordingRunner::new());
        let stage = processor(StageKind::Verify, runner.clone());

        let (tx, upstream) = mpsc::channel(4);
        tx.send(record(true, true, true)).await.unwrap();
        tx.send(record(true, false, true)).await.unwrap();
        drop(tx);

        let (mut rx, handle) = stage.spawn(upstream);
        let mut emitted = Vec::new();
        while let Some(rec) = rx.recv().await {
            emitted.push(rec);
        }
        handle.await.unwrap();

        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].state_of(StageKind::Verify), StageState::Succeeded);
        assert_eq!(emitted[1].state_of(StageKind::Verify), StageState::Skipped);
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_stage_closes_without_emitting() {
        let runner = Arc::new(RecordingRunner::new());
        let ctx = context();
        let stage = StageProcessor::new(StageKind::Build, ctx.clone(), runner.clone());

        let (tx, upstream) = mpsc::channel(4);
        tx.send(record(true, true, true)).await.unwrap();
        ctx.cancellation().cancel();

        let (mut rx, handle) = stage.spawn(upstream);
        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
        assert!(runner.invocations().is_empty());
        drop(tx);
    }
}
