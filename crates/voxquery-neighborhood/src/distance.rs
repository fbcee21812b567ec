// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Distance functions between grid points.

Only consulted while building a stencil, never per query.
*/

use crate::types::Point3;
use serde::{Deserialize, Serialize};

/// Squared Euclidean distance
///
/// Each axis term is exact in `u128`; the sum saturates at `u128::MAX`,
/// which only happens for points more than 2^64 apart on two or more axes.
#[inline]
pub fn squared_distance(a: Point3, b: Point3) -> u128 {
    let axis = |p: i64, q: i64| {
        let d = (p as i128 - q as i128).unsigned_abs();
        d * d
    };
    axis(a.x, b.x)
        .saturating_add(axis(a.y, b.y))
        .saturating_add(axis(a.z, b.z))
}

/// Euclidean (cartesian) distance between two 3D points
#[inline]
pub fn cartesian_distance(a: Point3, b: Point3) -> f64 {
    let dx = a.x as f64 - b.x as f64;
    let dy = a.y as f64 - b.y as f64;
    let dz = a.z as f64 - b.z as f64;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Metric deciding stencil membership
///
/// Other metrics (manhattan, chebyshev) would be added as variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
}

impl DistanceMetric {
    pub fn distance(self, a: Point3, b: Point3) -> f64 {
        match self {
            DistanceMetric::Euclidean => cartesian_distance(a, b),
        }
    }

    /// True if `offset` lies within `radius` of the origin (boundary included)
    #[inline]
    pub fn within(self, offset: Point3, radius: i64) -> bool {
        match self {
            DistanceMetric::Euclidean => {
                let r = radius.unsigned_abs() as u128;
                squared_distance(offset, Point3::ORIGIN) <= r * r
            }
        }
    }
}
