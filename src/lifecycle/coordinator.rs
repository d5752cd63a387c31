// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Cancellation and cleanup coordinator
//!
//! Owns the teardown gate. An interrupt only cancels the run; the workspace
//! is removed through [`Coordinator::teardown`] once the chain has stopped.
//! The first caller of the gate cancels the run and removes the workspace,
//! every later caller waits for that teardown to finish and gets the same
//! outcome.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{Removal, RunContext};
use crate::utils::colors;

/// What started the teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownTrigger {
    /// Operator interrupt (Ctrl+C)
    Interrupt,
    /// The orchestrator finished draining the chain
    Completion,
}

impl std::fmt::Display for TeardownTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

/// Result of the single teardown of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub trigger: TeardownTrigger,
    /// Removal failures are kept as text; they never change the pipeline outcome
    pub removal: Result<Removal, String>,
}

/// Shares the cancellation signal and guards workspace teardown
#[derive(Debug, Clone)]
pub struct Coordinator {
    context: Arc<RunContext>,
    gate: Arc<OnceCell<TeardownOutcome>>,
}

impl Coordinator {
    pub fn new(context: Arc<RunContext>) -> Self {
        Self {
            context,
            gate: Arc::new(OnceCell::new()),
        }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// Whether teardown has completed
    pub fn is_torn_down(&self) -> bool {
        self.gate.initialized()
    }

    /// Cancel the run and remove the workspace, exactly once per run.
    ///
    /// Concurrent callers all return after the one teardown completed.
    pub async fn teardown(&self, trigger: TeardownTrigger) -> TeardownOutcome {
        self.gate
            .get_or_init(|| self.run_teardown(trigger))
            .await
            .clone()
    }

    /// Cancel the run on behalf of the operator.
    ///
    /// Leaves the workspace alone: commands are still being killed and
    /// reaped, so removal waits for [`Coordinator::supervise`] to see the
    /// chain stop. Returns true on the first interrupt only.
    pub fn interrupt(&self) -> bool {
        info!(workspace = self.context.workspace_id(), "interrupt received, cancelling run");
        self.context.cancellation().cancel()
    }

    /// Drive `chain` to its end, then tear down.
    ///
    /// The trigger is [`TeardownTrigger::Interrupt`] when the run was
    /// cancelled by the time the chain stopped.
    pub async fn supervise<F: Future>(&self, chain: F) -> (F::Output, TeardownOutcome) {
        let output = chain.await;
        let trigger = if self.context.cancellation().is_cancelled() {
            TeardownTrigger::Interrupt
        } else {
            TeardownTrigger::Completion
        };
        let outcome = self.teardown(trigger).await;
        (output, outcome)
    }

    /// Spawn the task that turns Ctrl+C into a cancellation
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    colors::print_interrupted();
                    coordinator.interrupt();
                }
                Err(e) => error!("Failed to listen for interrupt signal: {}", e),
            }
        })
    }

    async fn run_teardown(&self, trigger: TeardownTrigger) -> TeardownOutcome {
        self.context.cancellation().cancel();
        self.context.release();

        let workspace = self.context.workspace();
        info!(workspace = self.context.workspace_id(), %trigger, "tearing down run");
        colors::print_cleanup(workspace.path());

        let removal = match workspace.remove().await {
            Ok(removal) => Ok(removal),
            Err(e) => {
                warn!(workspace = self.context.workspace_id(), "failed to remove workspace: {}", e);
                colors::print_warning(&format!(
                    "Could not remove workspace {}: {}",
                    workspace.path().display(),
                    e
                ));
                Err(e.to_string())
            }
        };

        TeardownOutcome { trigger, removal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ProcessRunner;
    use crate::lifecycle::{LocalWorkspace, WorkspaceProvider};
    use crate::pipeline::{CommandTask, FetchTask, PipelineRecord, StageKind, StageProcessor, Tasks};
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct CountingWorkspace {
        path: PathBuf,
        removals: AtomicUsize,
        fail: bool,
    }

    impl CountingWorkspace {
        fn new(fail: bool) -> Self {
            Self {
                path: PathBuf::from("/nonexistent/run"),
                removals: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl WorkspaceProvider for CountingWorkspace {
        fn id(&self) -> &str {
            "run"
        }

        fn root(&self) -> &Path {
            Path::new("/nonexistent")
        }

        fn path(&self) -> &Path {
            &self.path
        }

        async fn remove(&self) -> io::Result<Removal> {
            self.removals.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                Ok(Removal::Removed)
            }
        }
    }

    #[tokio::test]
    async fn test_teardown_runs_once_under_concurrent_triggers() {
        let workspace = Arc::new(CountingWorkspace::new(false));
        let context = Arc::new(RunContext::new(workspace.clone()));
        let coordinator = Coordinator::new(context.clone());

        let (first, second) = tokio::join!(
            coordinator.teardown(TeardownTrigger::Interrupt),
            coordinator.teardown(TeardownTrigger::Completion),
        );

        assert_eq!(workspace.removals.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.removal, Ok(Removal::Removed));
        assert!(coordinator.is_torn_down());
    }

    #[tokio::test]
    async fn test_second_teardown_is_a_no_op() {
        let workspace = Arc::new(CountingWorkspace::new(false));
        let coordinator = Coordinator::new(Arc::new(RunContext::new(workspace.clone())));

        let first = coordinator.teardown(TeardownTrigger::Completion).await;
        let second = coordinator.teardown(TeardownTrigger::Interrupt).await;

        assert_eq!(workspace.removals.load(Ordering::SeqCst), 1);
        assert_eq!(second.trigger, TeardownTrigger::Completion);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_teardown_cancels_and_releases() {
        let workspace = Arc::new(CountingWorkspace::new(false));
        let context = Arc::new(RunContext::new(workspace));
        let coordinator = Coordinator::new(context.clone());

        assert!(!context.cancellation().is_cancelled());
        coordinator.teardown(TeardownTrigger::Completion).await;

        assert!(context.cancellation().is_cancelled());
        assert!(context.workspace_dir().is_err());
    }

    #[tokio::test]
    async fn test_removal_failure_is_reported_not_raised() {
        let workspace = Arc::new(CountingWorkspace::new(true));
        let coordinator = Coordinator::new(Arc::new(RunContext::new(workspace)));

        let outcome = coordinator.teardown(TeardownTrigger::Completion).await;
        assert!(outcome.removal.unwrap_err().contains("denied"));
    }

    #[tokio::test]
    async fn test_removes_real_workspace() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Arc::new(LocalWorkspace::with_id(root.path(), "run"));
        std::fs::create_dir_all(workspace.path().join(".git")).unwrap();

        let coordinator = Coordinator::new(Arc::new(RunContext::new(workspace.clone())));
        let outcome = coordinator.teardown(TeardownTrigger::Completion).await;

        assert_eq!(outcome.removal, Ok(Removal::Removed));
        assert!(!workspace.path().exists());
        assert_eq!(
            coordinator.teardown(TeardownTrigger::Completion).await.removal,
            Ok(Removal::Removed)
        );
    }

    #[tokio::test]
    async fn test_interrupt_only_cancels() {
        let workspace = Arc::new(CountingWorkspace::new(false));
        let context = Arc::new(RunContext::new(workspace.clone()));
        let coordinator = Coordinator::new(context.clone());

        assert!(coordinator.interrupt());
        assert!(!coordinator.interrupt());

        assert!(context.cancellation().is_cancelled());
        assert!(!context.is_released());
        assert!(!coordinator.is_torn_down());
        assert_eq!(workspace.removals.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_supervise_tears_down_after_completion() {
        let workspace = Arc::new(CountingWorkspace::new(false));
        let coordinator = Coordinator::new(Arc::new(RunContext::new(workspace.clone())));

        let (value, outcome) = coordinator.supervise(async { 7 }).await;

        assert_eq!(value, 7);
        assert_eq!(outcome.trigger, TeardownTrigger::Completion);
        assert_eq!(workspace.removals.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_during_command_removes_workspace_after_chain_stops() {
        for _ in 0..5 {
            let root = tempfile::tempdir().unwrap();
            let workspace = Arc::new(LocalWorkspace::with_id(root.path(), "run"));
            std::fs::create_dir_all(workspace.path()).unwrap();

            let context = Arc::new(RunContext::new(workspace.clone()));
            let coordinator = Coordinator::new(context.clone());
            let stage = StageProcessor::new(StageKind::Build, context, Arc::new(ProcessRunner::new()));

            // Keeps writing into the workspace until killed
            let busy = CommandTask::new(
                "i=0; while true; do mkdir -p d$i/x && touch d$i/x/f; i=$((i+1)); done",
            );
            let record = PipelineRecord::new(
                "p",
                Tasks {
                    fetch: Some(FetchTask {
                        repository_location: "R".into(),
                    }),
                    verify: None,
                    build: Some(busy),
                },
            );

            let (tx, rx) = mpsc::channel(1);
            tx.send(record).await.unwrap();
            drop(tx);
            let (mut out, handle) = stage.spawn(rx);

            let interrupter = coordinator.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                interrupter.interrupt();
            });

            let (drained, outcome) = coordinator
                .supervise(async {
                    let mut drained = 0;
                    while out.recv().await.is_some() {
                        drained += 1;
                    }
                    handle.await.unwrap();
                    drained
                })
                .await;

            assert_eq!(drained, 0);
            assert_eq!(outcome.trigger, TeardownTrigger::Interrupt);
            assert_eq!(outcome.removal, Ok(Removal::Removed));
            assert!(!workspace.path().exists());
        }
    }
}
