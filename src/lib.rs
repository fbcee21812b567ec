// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # voxquery - spherical neighborhoods on 3D voxel grids
//!
//! Given a center voxel, voxquery enumerates every grid coordinate within a
//! fixed radius, clipped to the grid's extent. The offsets of the sphere are
//! computed once at construction, so each query is a translation plus (only
//! near the boundary) a bounds filter.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! voxquery = "0.1"  # Default: neighborhood + config + observability
//! ```
//!
//! ## Feature Flags
//!
//! - **`neighborhood`** (default): spheres, datasets, mappers, query engine
//! - **`config`** (default): TOML configuration with env/CLI overrides
//! - **`observability`** (default): tracing subscriber setup, `--debug-<crate>` flags
//! - **`file-logging`**: rolling JSON log files per run
//!
//! ## Usage Examples
//!
//! ### Single sphere
//!
//! ```rust
//! use voxquery::prelude::*;
//!
//! let sphere = Sphere::with_extent(3, (5, 5, 5))?;
//! let coords = sphere.neighbors(Point3::new(0, 0, 0));
//! assert_eq!(coords.len(), 4);
//! # Ok::<(), voxquery::neighborhood::NeighborhoodError>(())
//! ```
//!
//! ### Feature neighborhoods across spaces
//!
//! ```rust
//! use voxquery::prelude::*;
//!
//! let dataset = FeatureAttributeTable::new(3)
//!     .with_space(
//!         "voxel_indices",
//!         vec![Point3::new(0, 0, 0), Point3::new(1, 0, 0), Point3::new(4, 0, 0)],
//!     )?
//!     .into_shared();
//!
//! let mut engine = QueryEngine::new().with_space("voxel_indices", Sphere::new(3)?);
//! engine.train(dataset);
//! engine.attach_index_mapper()?;
//!
//! assert_eq!(engine.query(0)?, vec![0, 1]);
//! # Ok::<(), voxquery::neighborhood::NeighborhoodError>(())
//! ```
//!
//! ## Crate Organization
//!
//! - [`config`] - configuration loading and validation
//! - [`observability`] - logging initialization
//! - [`neighborhood`] - sphere stencils and the query engine

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "config")]
pub use voxquery_config as config;

#[cfg(feature = "observability")]
pub use voxquery_observability as observability;

#[cfg(feature = "neighborhood")]
pub use voxquery_neighborhood as neighborhood;

/// Commonly used types, one `use` away
pub mod prelude {
    #[cfg(feature = "neighborhood")]
    pub use voxquery_neighborhood::{
        CoordinateMapper, Extent, FeatureAttributeTable, FeatureDataset, FeatureId,
        NeighborhoodError, NeighborhoodProvider, NeighborhoodResult, Point3, QueryEngine,
        SharedDataset, SiftPolicy, SpaceCoordinates, Sphere, VoxelIndexMapper,
    };

    #[cfg(feature = "config")]
    pub use voxquery_config::{load_config, validate_config, ConfigError, VoxqueryConfig};

    #[cfg(feature = "observability")]
    pub use voxquery_observability::{init_logging, parse_debug_flags, CrateDebugFlags};
}
