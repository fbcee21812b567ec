// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Translating per-space neighbor coordinates back into feature ids.

`VoxelIndexMapper` indexes every feature of a dataset by its coordinate in
each space, then resolves a query's coordinate sets to the features sitting
at those coordinates. How the per-space feature sets are merged is the
`SiftPolicy` passed with each call, so a mapper holds no policy of its own.
*/

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::dataset::FeatureDataset;
use crate::types::{FeatureId, NeighborhoodError, NeighborhoodResult, Point3, SpaceCoordinates};

/// Turns per-space neighbor coordinates into dataset feature ids
pub trait CoordinateMapper: Send + Sync {
    fn feature_ids(
        &self,
        coordinates: &SpaceCoordinates,
        policy: SiftPolicy,
    ) -> NeighborhoodResult<Vec<FeatureId>>;
}

/// How feature sets from different spaces are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiftPolicy {
    /// A feature qualifies if it is a neighbor in any space
    #[default]
    Union,
    /// A feature qualifies only if it is a neighbor in every queried space
    Intersection,
}

impl FromStr for SiftPolicy {
    type Err = NeighborhoodError;

    fn from_str(s: &str) -> NeighborhoodResult<Self> {
        match s.to_lowercase().as_str() {
            "union" => Ok(SiftPolicy::Union),
            "intersection" => Ok(SiftPolicy::Intersection),
            other => Err(NeighborhoodError::InvalidArgument(format!(
                "Unknown sift policy '{}', expected 'union' or 'intersection'",
                other
            ))),
        }
    }
}

impl fmt::Display for SiftPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiftPolicy::Union => write!(f, "union"),
            SiftPolicy::Intersection => write!(f, "intersection"),
        }
    }
}

/// Coordinate -> feature id index over a dataset, one map per space
#[derive(Debug, Clone, Default)]
pub struct VoxelIndexMapper {
    index: AHashMap<String, AHashMap<Point3, Vec<FeatureId>>>,
}

impl VoxelIndexMapper {
    /// Index every feature of `dataset` in every space it exposes
    pub fn from_dataset(dataset: &dyn FeatureDataset) -> NeighborhoodResult<Self> {
        let mut index = AHashMap::new();

        for space in dataset.spaces() {
            let mut by_coord: AHashMap<Point3, Vec<FeatureId>> = AHashMap::new();
            for feature_id in 0..dataset.feature_count() {
                let coord = dataset.coordinate(&space, feature_id)?;
                by_coord.entry(coord).or_default().push(feature_id);
            }
            index.insert(space, by_coord);
        }

        Ok(Self { index })
    }

    /// Features located at `coord` in `space`
    pub fn features_at(&self, space: &str, coord: Point3) -> &[FeatureId] {
        self.index
            .get(space)
            .and_then(|by_coord| by_coord.get(&coord))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn features_in_space(&self, space: &str, coords: &[Point3]) -> NeighborhoodResult<BTreeSet<FeatureId>> {
        let by_coord = self
            .index
            .get(space)
            .ok_or_else(|| NeighborhoodError::UnknownSpace(space.to_string()))?;

        Ok(coords
            .iter()
            .filter_map(|c| by_coord.get(c))
            .flatten()
            .copied()
            .collect())
    }
}

impl CoordinateMapper for VoxelIndexMapper {
    /// Deduplicated feature ids in ascending order
    fn feature_ids(
        &self,
        coordinates: &SpaceCoordinates,
        policy: SiftPolicy,
    ) -> NeighborhoodResult<Vec<FeatureId>> {
        let mut combined: Option<BTreeSet<FeatureId>> = None;

        for (space, coords) in coordinates {
            let found = self.features_in_space(space, coords)?;
            combined = Some(match (combined, policy) {
                (None, _) => found,
                (Some(acc), SiftPolicy::Union) => &acc | &found,
                (Some(acc), SiftPolicy::Intersection) => &acc & &found,
            });
        }

        Ok(combined.unwrap_or_default().into_iter().collect())
    }
}
