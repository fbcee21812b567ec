// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The capability set every neighborhood shape offers to the query engine.
*/

use crate::dataset::SharedDataset;
use crate::types::{NeighborhoodResult, Point3};

/// A neighborhood shape that can be trained on a dataset and queried
///
/// [`crate::Sphere`] is the built-in implementation. `query` takes `&self`,
/// so a provider shared across threads needs no locking once trained.
pub trait NeighborhoodProvider: Send + Sync {
    /// Attach the dataset this provider answers queries for
    fn train(&mut self, dataset: SharedDataset);

    fn is_trained(&self) -> bool;

    /// Grid coordinates in the neighborhood of `coordinate`
    fn query(&self, coordinate: Point3) -> NeighborhoodResult<Vec<Point3>>;

    /// [`Self::query`] for untyped input
    ///
    /// # Errors
    /// `InvalidArgument` unless `coordinate` holds exactly 3 values.
    fn query_slice(&self, coordinate: &[i64]) -> NeighborhoodResult<Vec<Point3>> {
        self.query(Point3::try_from(coordinate)?)
    }
}

impl<P: NeighborhoodProvider + ?Sized> NeighborhoodProvider for Box<P> {
    fn train(&mut self, dataset: SharedDataset) {
        (**self).train(dataset)
    }

    fn is_trained(&self) -> bool {
        (**self).is_trained()
    }

    fn query(&self, coordinate: Point3) -> NeighborhoodResult<Vec<Point3>> {
        (**self).query(coordinate)
    }
}
