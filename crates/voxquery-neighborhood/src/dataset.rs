// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Dataset collaborator: where features live in each space.

The query engine only needs a per-space, per-feature coordinate lookup.
`FeatureAttributeTable` is a plain in-memory implementation holding one
coordinate column per space.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{FeatureId, NeighborhoodError, NeighborhoodResult, Point3};

/// Source of feature coordinates, one coordinate column per named space
pub trait FeatureDataset: Send + Sync {
    /// Number of features (rows) in the dataset
    fn feature_count(&self) -> usize;

    /// Names of the spaces this dataset has coordinates for
    fn spaces(&self) -> Vec<String>;

    /// Coordinate of `feature_id` in `space`
    fn coordinate(&self, space: &str, feature_id: FeatureId) -> NeighborhoodResult<Point3>;
}

/// Shared handle to a dataset, as held by trained providers and engines
pub type SharedDataset = Arc<dyn FeatureDataset>;

/// In-memory feature attribute table
#[derive(Debug, Clone, Default)]
pub struct FeatureAttributeTable {
    feature_count: usize,
    columns: BTreeMap<String, Vec<Point3>>,
}

impl FeatureAttributeTable {
    pub fn new(feature_count: usize) -> Self {
        Self {
            feature_count,
            columns: BTreeMap::new(),
        }
    }

    /// Add (or replace) the coordinate column for `space`
    ///
    /// # Errors
    /// `InvalidArgument` if the column length differs from the feature count.
    pub fn add_space(
        &mut self,
        space: impl Into<String>,
        coordinates: Vec<Point3>,
    ) -> NeighborhoodResult<()> {
        let space = space.into();
        if coordinates.len() != self.feature_count {
            return Err(NeighborhoodError::InvalidArgument(format!(
                "Space '{}' has {} coordinates but the table holds {} features",
                space,
                coordinates.len(),
                self.feature_count
            )));
        }
        self.columns.insert(space, coordinates);
        Ok(())
    }

    /// Builder form of [`Self::add_space`]
    pub fn with_space(
        mut self,
        space: impl Into<String>,
        coordinates: Vec<Point3>,
    ) -> NeighborhoodResult<Self> {
        self.add_space(space, coordinates)?;
        Ok(self)
    }

    /// Add a column from untyped rows, validating each row is 3 integers
    pub fn add_space_from_rows<R: AsRef<[i64]>>(
        &mut self,
        space: impl Into<String>,
        rows: &[R],
    ) -> NeighborhoodResult<()> {
        let coordinates = rows
            .iter()
            .map(|row| Point3::try_from(row.as_ref()))
            .collect::<NeighborhoodResult<Vec<_>>>()?;
        self.add_space(space, coordinates)
    }

    /// Full coordinate column for `space`
    pub fn column(&self, space: &str) -> Option<&[Point3]> {
        self.columns.get(space).map(Vec::as_slice)
    }

    /// Wrap in an `Arc` for handing to `train`
    pub fn into_shared(self) -> SharedDataset {
        Arc::new(self)
    }
}

impl FeatureDataset for FeatureAttributeTable {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn spaces(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn coordinate(&self, space: &str, feature_id: FeatureId) -> NeighborhoodResult<Point3> {
        let column = self
            .columns
            .get(space)
            .ok_or_else(|| NeighborhoodError::UnknownSpace(space.to_string()))?;
        column
            .get(feature_id)
            .copied()
            .ok_or_else(|| NeighborhoodError::UnknownFeature {
                space: space.to_string(),
                feature_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FeatureAttributeTable {
        FeatureAttributeTable::new(3)
            .with_space(
                "voxel_indices",
                vec![Point3::new(0, 0, 0), Point3::new(1, 0, 0), Point3::new(2, 0, 0)],
            )
            .unwrap()
    }

    #[test]
    fn test_coordinate_lookup() {
        let table = sample_table();
        assert_eq!(
            table.coordinate("voxel_indices", 1).unwrap(),
            Point3::new(1, 0, 0)
        );
        assert_eq!(table.spaces(), vec!["voxel_indices".to_string()]);
        assert_eq!(table.feature_count(), 3);
    }

    #[test]
    fn test_unknown_space_and_feature() {
        let table = sample_table();
        assert!(matches!(
            table.coordinate("mni", 0),
            Err(NeighborhoodError::UnknownSpace(_))
        ));
        assert!(matches!(
            table.coordinate("voxel_indices", 3),
            Err(NeighborhoodError::UnknownFeature { feature_id: 3, .. })
        ));
    }

    #[test]
    fn test_column_length_mismatch() {
        let mut table = FeatureAttributeTable::new(2);
        let err = table
            .add_space("voxel_indices", vec![Point3::ORIGIN])
            .unwrap_err();
        assert!(matches!(err, NeighborhoodError::InvalidArgument(_)));
    }

    #[test]
    fn test_rows_are_validated() {
        let mut table = FeatureAttributeTable::new(2);
        table
            .add_space_from_rows("voxel_indices", &[vec![1, 2, 3], vec![4, 5, 6]])
            .unwrap();
        assert_eq!(table.column("voxel_indices").unwrap()[1], Point3::new(4, 5, 6));

        let err = table
            .add_space_from_rows("mni", &[vec![1, 2], vec![4, 5, 6]])
            .unwrap_err();
        assert!(matches!(err, NeighborhoodError::InvalidArgument(_)));
        assert!(table.column("mni").is_none());
    }
}
