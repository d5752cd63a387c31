// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Per-run context handed to every stage at construction.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Cancellation, WorkspaceProvider};
use crate::errors::StageError;

/// Workspace handle and cancellation signal for one run
///
/// Stages only read from it. The coordinator releases the workspace when
/// teardown starts, after which stages can no longer resolve it.
#[derive(Debug)]
pub struct RunContext {
    workspace: Arc<dyn WorkspaceProvider>,
    cancellation: Cancellation,
    released: AtomicBool,
}

impl RunContext {
    pub fn new(workspace: Arc<dyn WorkspaceProvider>) -> Self {
        Self {
            workspace,
            cancellation: Cancellation::new(),
            released: AtomicBool::new(false),
        }
    }

    pub fn workspace(&self) -> &dyn WorkspaceProvider {
        self.workspace.as_ref()
    }

    pub fn workspace_id(&self) -> &str {
        self.workspace.id()
    }

    /// Directory the stage commands run in
    pub fn workspace_dir(&self) -> Result<&Path, StageError> {
        self.ensure_available()?;
        Ok(self.workspace.path())
    }

    /// Directory the workspace is created in
    pub fn workspace_root(&self) -> Result<&Path, StageError> {
        self.ensure_available()?;
        Ok(self.workspace.root())
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Mark the workspace as gone. Returns true on the first call only.
    pub(crate) fn release(&self) -> bool {
        self.released
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn ensure_available(&self) -> Result<(), StageError> {
        if self.is_released() {
            Err(StageError::WorkspaceUnavailable {
                id: self.workspace.id().to_string(),
            })
        } else {
            Ok(())
        }
    }
}
