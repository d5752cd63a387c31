// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Process runner
//!
//! Runs commands as child processes sharing the terminal's output. Each
//! command gets its own process group so cancellation reaches everything the
//! shell started, not just the shell.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::{CommandError, CommandLine, CommandRunner};
use crate::lifecycle::Cancellation;

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner
    pub fn new() -> Self {
        Self
    }
}

async fn check_working_dir(path: &Path) -> Result<(), CommandError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CommandError::WorkingDirectory {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(CommandError::WorkingDirectory {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Kill the child and every process in its group, then reap the child
#[cfg(unix)]
async fn terminate(child: &mut Child) -> io::Result<()> {
    if let Some(pid) = child.id() {
        let pgid =
            libc::pid_t::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        // SAFETY: plain syscall; the group was created for this child at spawn
        if unsafe { libc::kill(-pgid, libc::SIGKILL) } == -1 {
            let err = io::Error::last_os_error();
            // ESRCH: the whole group already exited
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err);
            }
        }
    }
    child.wait().await.map(|_| ())
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) -> io::Result<()> {
    child.kill().await
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: &Path,
        cancellation: &Cancellation,
    ) -> Result<(), CommandError> {
        if cancellation.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        check_working_dir(working_dir).await?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Own group so cancellation reaches everything the shell starts;
        // stdin stays null since a background group reading the tty is stopped
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| CommandError::Spawn(e.to_string()))?;

        debug!(command = %command, pid = ?child.id(), "spawned");

        let status = tokio::select! {
            biased;
            _ = cancellation.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let Some(status) = status else {
            if let Err(e) = terminate(&mut child).await {
                warn!(command = %command, "failed to kill cancelled command: {}", e);
            }
            return Err(CommandError::Cancelled);
        };

        let status = status.map_err(|e| CommandError::Spawn(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(CommandError::Exit { code }),
                None => Err(CommandError::Signal),
            }
        }
    }
}
