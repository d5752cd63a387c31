// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Run workspace
//!
//! Each run gets a uniquely named directory under a workspace root. The
//! fetch stage creates it; teardown removes it.

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const REMOVE_ATTEMPTS: u32 = 3;
const REMOVE_RETRY_DELAY: Duration = Duration::from_millis(50);

/// What a removal attempt found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

/// Supplies the run's workspace and deletes it on shutdown
#[async_trait]
pub trait WorkspaceProvider: Send + Sync + std::fmt::Debug {
    /// Unique identifier of this run's workspace
    fn id(&self) -> &str;

    /// Directory the workspace is created in
    fn root(&self) -> &Path;

    /// Full path of the workspace directory
    fn path(&self) -> &Path;

    /// Delete the workspace directory and everything in it
    async fn remove(&self) -> io::Result<Removal>;
}

/// Workspace on the local filesystem, named by a random UUID
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    id: String,
    root: PathBuf,
    path: PathBuf,
}

impl LocalWorkspace {
    /// New workspace with a fresh identifier under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_id(root, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(root: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        let root = root.into();
        let id = id.into();
        let path = root.join(&id);
        Self { id, root, path }
    }
}

#[async_trait]
impl WorkspaceProvider for LocalWorkspace {
    fn id(&self) -> &str {
        &self.id
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Retries a couple of times: a killed command may still be exiting
    /// while the tree is walked.
    async fn remove(&self) -> io::Result<Removal> {
        let mut attempt = 1;
        loop {
            match tokio::fs::remove_dir_all(&self.path).await {
                Ok(()) => return Ok(Removal::Removed),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(if attempt == 1 {
                        Removal::AlreadyAbsent
                    } else {
                        Removal::Removed
                    });
                }
                Err(e) if attempt < REMOVE_ATTEMPTS => {
                    debug!(workspace = %self.id, attempt, "retrying workspace removal: {}", e);
                    attempt += 1;
                    tokio::time::sleep(REMOVE_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
