// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `voxquery_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VoxqueryConfig {
    pub system: SystemConfig,
    pub logging: LoggingConfig,
    pub neighborhood: NeighborhoodConfig,
    pub query: QueryConfig,
    pub spaces: Vec<SpaceConfig>,
}

impl VoxqueryConfig {
    /// Look up a configured space by name
    pub fn space(&self, name: &str) -> Option<&SpaceConfig> {
        self.spaces.iter().find(|s| s.name == name)
    }
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    /// Worker threads for batch queries (0 = rayon default)
    pub max_threads: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            max_threads: 0,
        }
    }
}

/// Logging output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    pub log_dir: PathBuf,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            log_dir: PathBuf::from("./logs"),
            file_logging: false,
        }
    }
}

/// Defaults applied to neighborhoods that don't specify their own shape
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NeighborhoodConfig {
    /// Must be odd and positive
    pub default_diameter: i64,
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self {
            default_diameter: 3,
        }
    }
}

/// Query engine behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Fan batch queries out over rayon when the `parallel` feature is on
    pub parallel: bool,
    /// How per-space feature sets are combined: "union" or "intersection"
    pub sift_policy: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            sift_policy: "union".to_string(),
        }
    }
}

/// One named coordinate space and the sphere used to search it
///
/// ```toml
/// [[spaces]]
/// name = "voxel_indices"
/// diameter = 9
/// extent = [64, 64, 32]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpaceConfig {
    pub name: String,
    /// Falls back to `neighborhood.default_diameter` when omitted
    #[serde(default)]
    pub diameter: Option<i64>,
    /// Exclusive per-axis upper bound; unbounded when omitted
    #[serde(default)]
    pub extent: Option<Vec<i64>>,
}

impl SpaceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diameter: None,
            extent: None,
        }
    }

    /// Diameter for this space, resolved against the neighborhood defaults
    pub fn resolved_diameter(&self, defaults: &NeighborhoodConfig) -> i64 {
        self.diameter.unwrap_or(defaults.default_diameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_resolves_default_diameter() {
        let defaults = NeighborhoodConfig { default_diameter: 7 };
        let mut space = SpaceConfig::new("voxel_indices");
        assert_eq!(space.resolved_diameter(&defaults), 7);

        space.diameter = Some(9);
        assert_eq!(space.resolved_diameter(&defaults), 9);
    }

    #[test]
    fn test_deserialize_spaces_from_json() {
        let json = r#"{
            "spaces": [
                {"name": "voxel_indices", "diameter": 5, "extent": [10, 10, 10]},
                {"name": "mni"}
            ]
        }"#;
        let config: VoxqueryConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.spaces.len(), 2);
        assert_eq!(config.space("voxel_indices").unwrap().extent, Some(vec![10, 10, 10]));
        assert_eq!(config.space("mni").unwrap().diameter, None);
        assert!(config.space("missing").is_none());
        assert_eq!(config.query.sift_policy, "union");
    }
}
