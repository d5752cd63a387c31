// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Run lifecycle
//!
//! The run context every stage reads, the cancellation signal, the
//! workspace, and the coordinator that tears all of it down once.

mod cancellation;
mod context;
mod coordinator;
mod workspace;

pub use cancellation::Cancellation;
pub use context::RunContext;
pub use coordinator::{Coordinator, TeardownOutcome, TeardownTrigger};
pub use workspace::{LocalWorkspace, Removal, WorkspaceProvider};
