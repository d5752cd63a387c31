// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Source of the stage chain.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{PipelineRecord, CHANNEL_CAPACITY};
use crate::lifecycle::Cancellation;

/// Emit `records` in order on a new channel, then close it.
///
/// Stops early if the run is cancelled or nobody is listening anymore.
pub fn generate(
    records: Vec<PipelineRecord>,
    cancellation: Cancellation,
) -> (mpsc::Receiver<PipelineRecord>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        for record in records {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                sent = tx.send(record) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("generator finished");
    });

    (rx, handle)
}
