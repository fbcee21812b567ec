// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent, within valid ranges, and don't conflict with each other.

use crate::{ConfigError, ConfigResult, VoxqueryConfig};
use std::collections::HashSet;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];
const SIFT_POLICIES: &[&str] = &["union", "intersection"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidDiameter { field: String, diameter: i64 },
    InvalidExtent { space: String, len: usize },
    DuplicateSpace { name: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDiameter { field, diameter } => {
                write!(
                    f,
                    "{} = {} must be an odd positive integer",
                    field, diameter
                )
            }
            Self::InvalidExtent { space, len } => {
                write!(
                    f,
                    "spaces.{}.extent must have exactly 3 values, got {}",
                    space, len
                )
            }
            Self::DuplicateSpace { name } => {
                write!(f, "Space '{}' is defined more than once", name)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Odd positive diameters (default and per space)
/// - 3-component extents
/// - Unique, non-empty space names
/// - Known log levels, log formats and sift policies
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &VoxqueryConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_diameters(config, &mut errors);
    validate_spaces(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn is_odd_positive(diameter: i64) -> bool {
    diameter > 0 && diameter % 2 == 1
}

fn validate_diameters(config: &VoxqueryConfig, errors: &mut Vec<ConfigValidationError>) {
    if !is_odd_positive(config.neighborhood.default_diameter) {
        errors.push(ConfigValidationError::InvalidDiameter {
            field: "neighborhood.default_diameter".to_string(),
            diameter: config.neighborhood.default_diameter,
        });
    }

    for space in &config.spaces {
        if let Some(diameter) = space.diameter {
            if !is_odd_positive(diameter) {
                errors.push(ConfigValidationError::InvalidDiameter {
                    field: format!("spaces.{}.diameter", space.name),
                    diameter,
                });
            }
        }
    }
}

fn validate_spaces(config: &VoxqueryConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen = HashSet::new();

    for space in &config.spaces {
        if space.name.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: "spaces.name".to_string(),
            });
            continue;
        }

        if !seen.insert(space.name.as_str()) {
            errors.push(ConfigValidationError::DuplicateSpace {
                name: space.name.clone(),
            });
        }

        if let Some(extent) = &space.extent {
            if extent.len() != 3 {
                errors.push(ConfigValidationError::InvalidExtent {
                    space: space.name.clone(),
                    len: extent.len(),
                });
            } else if extent.iter().any(|&v| v <= 0) {
                errors.push(ConfigValidationError::InvalidValue {
                    field: format!("spaces.{}.extent", space.name),
                    reason: "all values must be positive".to_string(),
                });
            }
        }
    }
}

fn validate_value_ranges(config: &VoxqueryConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.system.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: "must be 'text' or 'json'".to_string(),
        });
    }

    if !SIFT_POLICIES.contains(&config.query.sift_policy.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "query.sift_policy".to_string(),
            reason: "must be 'union' or 'intersection'".to_string(),
        });
    }
}
