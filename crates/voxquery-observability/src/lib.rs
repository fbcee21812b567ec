// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # voxquery-observability
//!
//! Logging setup shared by the voxquery crates and tools.
//!
//! Provides consistent `tracing` initialization with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: rolling JSON log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known voxquery crate names for debug flags
///
/// Each crate logs with `target: "<crate-name>"`, so these double as filter targets.
pub const KNOWN_CRATES: &[&str] = &[
    "voxquery",
    "voxquery-config",
    "voxquery-neighborhood",
    "voxquery-observability",
];
