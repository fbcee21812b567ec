// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # voxquery-neighborhood
//!
//! Spherical neighborhoods on a 3D integer voxel grid.
//!
//! A [`Sphere`] precomputes the offsets of every grid point within its radius
//! once, then answers neighbor queries by translating that template to the
//! query center and dropping points outside the grid extent. The
//! [`QueryEngine`] binds one neighborhood provider per named space and looks
//! features of a dataset up in all of them.
//!
//! ## Features
//! - `parallel` (default): batch engine queries fan out over rayon
//!
//! ## Logging
//! All events use `target: "voxquery-neighborhood"`, so
//! `--debug-voxquery-neighborhood` (or `RUST_LOG=voxquery-neighborhood=debug`)
//! isolates them.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dataset;
pub mod distance;
pub mod mapper;
pub mod provider;
pub mod query_engine;
pub mod sphere;
pub mod types;

pub use dataset::{FeatureAttributeTable, FeatureDataset, SharedDataset};
pub use distance::{cartesian_distance, squared_distance, DistanceMetric};
pub use mapper::{CoordinateMapper, SiftPolicy, VoxelIndexMapper};
pub use provider::NeighborhoodProvider;
pub use query_engine::QueryEngine;
pub use sphere::{Neighbors, Sphere};
pub use types::{
    Extent, FeatureId, NeighborhoodError, NeighborhoodResult, Point3, SpaceCoordinates,
};
