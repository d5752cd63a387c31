// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! # cirun - staged CI pipeline runner
//!
//! `cirun` clones a repository into a uniquely named workspace, runs its
//! tests and builds it. The three stages run as concurrent tasks connected
//! by channels; a pipeline record flows through them and carries the first
//! failure to the end of the chain.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a sample definition
//! cirun init
//!
//! # Check it
//! cirun validate
//!
//! # Run it
//! cirun run
//! ```

pub mod cli;
pub mod errors;
pub mod executors;
pub mod lifecycle;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use errors::{CiError, CiResult, StageError};
pub use lifecycle::{Cancellation, Coordinator, RunContext};
pub use pipeline::{Orchestrator, PipelineRecord, StageKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
