// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observability configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use voxquery_config::VoxqueryConfig;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    pub format: LogFormat,

    pub output: LogOutput,
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to text; validation rejects them earlier.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    Stderr,
    /// Console plus rolling files under the given base directory
    Files(PathBuf),
}

impl LoggingConfig {
    /// Derive logging settings from the loaded application config
    pub fn from_config(config: &VoxqueryConfig) -> Self {
        let output = if config.logging.file_logging {
            LogOutput::Files(config.logging.log_dir.clone())
        } else {
            LogOutput::Stderr
        };

        LoggingConfig {
            level: config.system.log_level.clone(),
            format: LogFormat::from_name(&config.logging.format),
            output,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
        }
    }
}
