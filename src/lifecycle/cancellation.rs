// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Cooperative cancellation signal shared by every task of a run.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation signal.
///
/// Firing is one-way: once cancelled, the signal stays cancelled. Every
/// clone observes the same state.
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Cancellation {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the signal. Returns true if this call was the one that fired it.
    pub fn cancel(&self) -> bool {
        !self.sender.send_replace(true)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once the signal has fired (immediately if it already has).
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once fired.
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
