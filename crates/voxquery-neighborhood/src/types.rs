// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for neighborhood queries.

Grid coordinates are signed so that center-relative offsets and positions
translated past the lower boundary can be represented before clipping.
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

/// Index into a dataset's feature-attribute table
pub type FeatureId = usize;

/// Per-space neighbor coordinates, keyed by space name
pub type SpaceCoordinates = BTreeMap<String, Vec<Point3>>;

/// Result type for neighborhood operations
pub type NeighborhoodResult<T> = Result<T, NeighborhoodError>;

/// Errors that can occur during neighborhood operations
#[derive(Debug, thiserror::Error)]
pub enum NeighborhoodError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Not trained: {0}")]
    NotTrained(String),

    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    #[error("Unknown feature {feature_id} in space '{space}'")]
    UnknownFeature { space: String, feature_id: FeatureId },

    #[error("Configuration error: {0}")]
    Config(#[from] voxquery_config::ConfigError),
}

/// 3D integer grid position (x, y, z)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Point3 {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 { x: 0, y: 0, z: 0 };

    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise addition, `None` on overflow of any axis
    pub fn checked_add(self, other: Point3) -> Option<Point3> {
        Some(Point3 {
            x: self.x.checked_add(other.x)?,
            y: self.y.checked_add(other.y)?,
            z: self.z.checked_add(other.z)?,
        })
    }

    pub fn to_array(self) -> [i64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, other: Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i64, i64, i64)> for Point3 {
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Point3::new(x, y, z)
    }
}

impl From<[i64; 3]> for Point3 {
    fn from([x, y, z]: [i64; 3]) -> Self {
        Point3::new(x, y, z)
    }
}

impl From<Point3> for (i64, i64, i64) {
    fn from(p: Point3) -> Self {
        (p.x, p.y, p.z)
    }
}

fn three_components<T: Copy + fmt::Debug>(what: &str, values: &[T]) -> NeighborhoodResult<[T; 3]> {
    match values {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(NeighborhoodError::InvalidArgument(format!(
            "{} must be exactly 3 integers, got {} value(s): {:?}",
            what,
            values.len(),
            values
        ))),
    }
}

fn integral(what: &str, values: [f64; 3]) -> NeighborhoodResult<[i64; 3]> {
    let mut out = [0i64; 3];
    for (slot, value) in out.iter_mut().zip(values) {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
        if !value.is_finite() || value.fract() != 0.0 || !in_range {
            return Err(NeighborhoodError::InvalidArgument(format!(
                "{} must be integral, got {:?}",
                what, values
            )));
        }
        *slot = value as i64;
    }
    Ok(out)
}

impl TryFrom<&[i64]> for Point3 {
    type Error = NeighborhoodError;

    fn try_from(values: &[i64]) -> NeighborhoodResult<Self> {
        three_components("Coordinate", values).map(Point3::from)
    }
}

impl TryFrom<&[f64]> for Point3 {
    type Error = NeighborhoodError;

    /// Accepts float-typed coordinates only when every component is a whole number
    fn try_from(values: &[f64]) -> NeighborhoodResult<Self> {
        let values = three_components("Coordinate", values)?;
        integral("Coordinate", values).map(Point3::from)
    }
}

/// Exclusive per-axis upper bound of valid grid coordinates
///
/// The implicit lower bound is zero on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Extent {
    /// No effective upper bound on any axis
    pub const UNBOUNDED: Extent = Extent {
        x: i64::MAX,
        y: i64::MAX,
        z: i64::MAX,
    };

    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Extent::UNBOUNDED
    }

    /// True if every axis of `p` lies in `[0, extent)`
    #[inline]
    pub fn contains(&self, p: Point3) -> bool {
        p.x >= 0 && p.y >= 0 && p.z >= 0 && p.x < self.x && p.y < self.y && p.z < self.z
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::UNBOUNDED
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i64, i64, i64)> for Extent {
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Extent::new(x, y, z)
    }
}

impl From<[i64; 3]> for Extent {
    fn from([x, y, z]: [i64; 3]) -> Self {
        Extent::new(x, y, z)
    }
}

impl TryFrom<&[i64]> for Extent {
    type Error = NeighborhoodError;

    fn try_from(values: &[i64]) -> NeighborhoodResult<Self> {
        three_components("Extent", values).map(Extent::from)
    }
}

impl TryFrom<&[f64]> for Extent {
    type Error = NeighborhoodError;

    fn try_from(values: &[f64]) -> NeighborhoodResult<Self> {
        let values = three_components("Extent", values)?;
        integral("Extent", values).map(Extent::from)
    }
}
