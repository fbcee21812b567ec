// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, VoxqueryConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the voxquery configuration file
///
/// Search order:
/// 1. `VOXQUERY_CONFIG_PATH` environment variable
/// 2. Current working directory: `./voxquery_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("VOXQUERY_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by VOXQUERY_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet VOXQUERY_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is a separate step, see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<VoxqueryConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: VoxqueryConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `VOXQUERY_LOG_LEVEL` -> `system.log_level`
/// - `VOXQUERY_MAX_THREADS` -> `system.max_threads`
/// - `VOXQUERY_LOG_FORMAT` -> `logging.format`
/// - `VOXQUERY_LOG_DIR` -> `logging.log_dir`
/// - `VOXQUERY_DEFAULT_DIAMETER` -> `neighborhood.default_diameter`
/// - `VOXQUERY_PARALLEL` -> `query.parallel`
/// - `VOXQUERY_SIFT_POLICY` -> `query.sift_policy`
pub fn apply_environment_overrides(config: &mut VoxqueryConfig) {
    if let Ok(value) = env::var("VOXQUERY_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("VOXQUERY_MAX_THREADS") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.max_threads = threads;
        }
    }

    if let Ok(value) = env::var("VOXQUERY_LOG_FORMAT") {
        config.logging.format = value;
    }
    if let Ok(value) = env::var("VOXQUERY_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }

    if let Ok(value) = env::var("VOXQUERY_DEFAULT_DIAMETER") {
        if let Ok(diameter) = value.parse::<i64>() {
            config.neighborhood.default_diameter = diameter;
        }
    }

    if let Ok(value) = env::var("VOXQUERY_PARALLEL") {
        config.query.parallel = parse_bool(&value);
    }
    if let Ok(value) = env::var("VOXQUERY_SIFT_POLICY") {
        config.query.sift_policy = value.to_lowercase();
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"default_diameter": "9", "sift_policy": "intersection"}`)
pub fn apply_cli_overrides(config: &mut VoxqueryConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("max_threads") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.max_threads = threads;
        }
    }

    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("file_logging") {
        config.logging.file_logging = parse_bool(value);
    }

    if let Some(value) = cli_args.get("default_diameter") {
        if let Ok(diameter) = value.parse::<i64>() {
            config.neighborhood.default_diameter = diameter;
        }
    }

    if let Some(value) = cli_args.get("parallel") {
        config.query.parallel = parse_bool(value);
    }
    if let Some(value) = cli_args.get("sift_policy") {
        config.query.sift_policy = value.to_lowercase();
    }
}
