// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cirun contributors

//! Utility modules
//!
//! Common utilities for the cirun CLI.

pub mod colors;

pub use colors::*;
