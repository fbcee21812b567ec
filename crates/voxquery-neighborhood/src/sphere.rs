// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Voxelized sphere neighborhoods.

A `Sphere` precomputes, once, every center-relative offset within its
radius (the stencil). A query translates the stencil to the requested
center and clips against the extent, but only when the center is close
enough to a boundary for any translated offset to fall outside.

```
use voxquery_neighborhood::{Point3, Sphere};

let sphere = Sphere::new(9).unwrap();
let coords = sphere.neighbors(Point3::new(1, 1, 1));
assert!(coords.contains(&Point3::new(1, 1, 1)));
```
*/

use std::fmt;
use std::slice;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::dataset::SharedDataset;
use crate::distance::DistanceMetric;
use crate::provider::NeighborhoodProvider;
use crate::types::{Extent, NeighborhoodError, NeighborhoodResult, Point3};

/// 3D sphere of odd diameter, in voxels
#[derive(Clone)]
pub struct Sphere {
    diameter: i64,
    radius: i64,
    extent: Extent,
    metric: DistanceMetric,
    /// Ordered i-major, then j, then k; query output follows this order
    offsets: Arc<[Point3]>,
    dataset: Option<SharedDataset>,
}

impl Sphere {
    /// Sphere of `diameter` voxels with an unbounded extent
    ///
    /// # Errors
    /// `InvalidArgument` if `diameter` is even or not positive.
    pub fn new(diameter: i64) -> NeighborhoodResult<Self> {
        Self::with_extent(diameter, Extent::UNBOUNDED)
    }

    /// Sphere whose query results are clipped to `[0, extent)` on every axis
    pub fn with_extent(diameter: i64, extent: impl Into<Extent>) -> NeighborhoodResult<Self> {
        if diameter <= 0 || diameter % 2 != 1 {
            return Err(NeighborhoodError::InvalidArgument(format!(
                "Sphere diameter must be odd and positive, but is: {}",
                diameter
            )));
        }

        let extent = extent.into();
        let radius = diameter / 2;
        let metric = DistanceMetric::Euclidean;
        let offsets: Arc<[Point3]> = build_offset_template(radius, metric).into();

        debug!(
            target: "voxquery-neighborhood",
            "Built sphere stencil: diameter={}, radius={}, offsets={}, extent={}",
            diameter,
            radius,
            offsets.len(),
            extent
        );

        Ok(Self {
            diameter,
            radius,
            extent,
            metric,
            offsets,
            dataset: None,
        })
    }

    /// Build from untyped extent input, e.g. a configuration array
    ///
    /// # Errors
    /// `InvalidArgument` if `extent` is not exactly 3 integers or the
    /// diameter is invalid.
    pub fn try_from_parts(diameter: i64, extent: &[i64]) -> NeighborhoodResult<Self> {
        Self::with_extent(diameter, Extent::try_from(extent)?)
    }

    pub fn diameter(&self) -> i64 {
        self.diameter
    }

    pub fn radius(&self) -> i64 {
        self.radius
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Center-relative offsets making up this sphere
    pub fn offsets(&self) -> &[Point3] {
        &self.offsets
    }

    pub fn template_len(&self) -> usize {
        self.offsets.len()
    }

    /// True if some translated offset around `center` may leave `[0, extent)`
    pub fn needs_clipping(&self, center: Point3) -> bool {
        let r = self.radius;
        let low = |c: i64| c.saturating_sub(r) < 0;
        let high = |c: i64, bound: i64| c.saturating_add(r) >= bound;

        low(center.x)
            || low(center.y)
            || low(center.z)
            || high(center.x, self.extent.x)
            || high(center.y, self.extent.y)
            || high(center.z, self.extent.z)
    }

    /// Lazily enumerate the neighborhood of `center`
    pub fn iter_neighbors(&self, center: Point3) -> Neighbors<'_> {
        let clip = if self.needs_clipping(center) {
            trace!(target: "voxquery-neighborhood", "Clipping neighborhood of {} to {}", center, self.extent);
            Some(self.extent)
        } else {
            None
        };

        Neighbors {
            offsets: self.offsets.iter(),
            center,
            clip,
        }
    }

    /// All coordinates within the sphere around `center`, in stencil order
    pub fn neighbors(&self, center: Point3) -> Vec<Point3> {
        let mut coords = Vec::with_capacity(self.offsets.len());
        coords.extend(self.iter_neighbors(center));
        coords
    }

    /// [`Self::neighbors`] for untyped input
    pub fn neighbors_of_slice(&self, center: &[i64]) -> NeighborhoodResult<Vec<Point3>> {
        Ok(self.neighbors(Point3::try_from(center)?))
    }
}

/// Stencil of every offset in `[-radius, radius]^3` within `radius` of the origin
fn build_offset_template(radius: i64, metric: DistanceMetric) -> Vec<Point3> {
    let mut offsets = Vec::new();
    for i in -radius..=radius {
        for j in -radius..=radius {
            for k in -radius..=radius {
                let offset = Point3::new(i, j, k);
                if metric.within(offset, radius) {
                    offsets.push(offset);
                }
            }
        }
    }
    offsets
}

impl NeighborhoodProvider for Sphere {
    /// Keeps a handle to the dataset; queries don't consult it
    fn train(&mut self, dataset: SharedDataset) {
        self.dataset = Some(dataset);
    }

    fn is_trained(&self) -> bool {
        self.dataset.is_some()
    }

    fn query(&self, coordinate: Point3) -> NeighborhoodResult<Vec<Point3>> {
        Ok(self.neighbors(coordinate))
    }
}

impl fmt::Debug for Sphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sphere")
            .field("diameter", &self.diameter)
            .field("radius", &self.radius)
            .field("extent", &self.extent)
            .field("metric", &self.metric)
            .field("offsets", &self.offsets.len())
            .field("trained", &self.dataset.is_some())
            .finish()
    }
}

/// Iterator over the neighborhood of one center, see [`Sphere::iter_neighbors`]
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    offsets: slice::Iter<'a, Point3>,
    center: Point3,
    /// `None` when the whole neighborhood is known to be in bounds
    clip: Option<Extent>,
}

impl Iterator for Neighbors<'_> {
    type Item = Point3;

    fn next(&mut self) -> Option<Point3> {
        match self.clip {
            None => self.offsets.next().map(|&offset| self.center + offset),
            Some(extent) => loop {
                let offset = *self.offsets.next()?;
                if let Some(p) = self.center.checked_add(offset) {
                    if extent.contains(p) {
                        return Some(p);
                    }
                }
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.offsets.len();
        match self.clip {
            None => (remaining, Some(remaining)),
            Some(_) => (0, Some(remaining)),
        }
    }
}
