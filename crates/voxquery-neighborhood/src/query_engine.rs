// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-space neighborhood lookup for dataset features.

A `QueryEngine` binds each named space to a neighborhood provider. Given a
feature id it looks the feature up in every space, asks that space's
provider for the surrounding coordinates, and hands the collected
coordinate sets back (or, with a mapper attached, the feature ids found at
those coordinates).

Lifecycle: an engine starts `Untrained` and must be trained on a dataset
before any lookup. `train` only attaches the dataset to the engine;
`train_all` also trains every provider.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use voxquery_config::{validate_config, VoxqueryConfig};

use crate::dataset::SharedDataset;
use crate::mapper::{CoordinateMapper, SiftPolicy, VoxelIndexMapper};
use crate::provider::NeighborhoodProvider;
use crate::sphere::Sphere;
use crate::types::{Extent, FeatureId, NeighborhoodError, NeighborhoodResult, SpaceCoordinates};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Clone)]
enum EngineState {
    Untrained,
    Trained(SharedDataset),
}

/// Where the engine's coordinate mapper came from
#[derive(Clone)]
enum MapperBinding {
    /// Supplied by the caller, kept as is across retraining
    External(Arc<dyn CoordinateMapper>),
    /// Indexed from the training dataset, rebuilt whenever that changes
    Indexed(Arc<VoxelIndexMapper>),
}

impl MapperBinding {
    fn mapper(&self) -> &dyn CoordinateMapper {
        match self {
            MapperBinding::External(mapper) => mapper.as_ref(),
            MapperBinding::Indexed(mapper) => mapper.as_ref(),
        }
    }
}

/// Maps named spaces to neighborhood providers and queries them per feature
pub struct QueryEngine {
    spaces: BTreeMap<String, Box<dyn NeighborhoodProvider>>,
    state: EngineState,
    mapper: Option<MapperBinding>,
    sift_policy: SiftPolicy,
    parallel: bool,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl QueryEngine {
    /// Engine with no spaces, untrained, without a mapper
    pub fn new() -> Self {
        Self {
            spaces: BTreeMap::new(),
            state: EngineState::Untrained,
            mapper: None,
            sift_policy: SiftPolicy::default(),
            parallel: true,
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Engine from `(space name, provider)` bindings
    pub fn from_spaces<I, N, P>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: NeighborhoodProvider + 'static,
    {
        let mut engine = Self::new();
        for (name, provider) in bindings {
            engine.add_space(name, provider);
        }
        engine
    }

    /// Build one sphere per configured space
    ///
    /// # Errors
    /// `Config` if the configuration fails validation, `InvalidArgument` if
    /// a sphere can't be built from it.
    pub fn from_config(config: &VoxqueryConfig) -> NeighborhoodResult<Self> {
        validate_config(config)?;

        let mut engine = Self::new();
        engine.sift_policy = config.query.sift_policy.parse()?;
        engine.parallel = config.query.parallel;

        for space in &config.spaces {
            let diameter = space.resolved_diameter(&config.neighborhood);
            let extent = match &space.extent {
                Some(values) => Extent::try_from(values.as_slice())?,
                None => Extent::UNBOUNDED,
            };
            engine.add_space(space.name.clone(), Sphere::with_extent(diameter, extent)?);
        }

        #[cfg(feature = "parallel")]
        if config.system.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.system.max_threads)
                .build()
                .map_err(|e| {
                    NeighborhoodError::InvalidArgument(format!("Failed to build thread pool: {}", e))
                })?;
            engine.pool = Some(Arc::new(pool));
        }

        debug!(
            target: "voxquery-neighborhood",
            "Query engine configured with {} space(s), sift policy {}",
            engine.spaces.len(),
            engine.sift_policy
        );
        Ok(engine)
    }

    /// Builder form of [`Self::add_space`]
    pub fn with_space<P>(mut self, name: impl Into<String>, provider: P) -> Self
    where
        P: NeighborhoodProvider + 'static,
    {
        self.add_space(name, provider);
        self
    }

    /// Bind `provider` to `name`, returning any provider it replaces
    pub fn add_space<P>(
        &mut self,
        name: impl Into<String>,
        provider: P,
    ) -> Option<Box<dyn NeighborhoodProvider>>
    where
        P: NeighborhoodProvider + 'static,
    {
        self.spaces.insert(name.into(), Box::new(provider))
    }

    /// Space names in query order
    pub fn spaces(&self) -> impl Iterator<Item = &str> {
        self.spaces.keys().map(String::as_str)
    }

    pub fn provider(&self, space: &str) -> Option<&dyn NeighborhoodProvider> {
        self.spaces.get(space).map(|p| p.as_ref())
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, EngineState::Trained(_))
    }

    pub fn sift_policy(&self) -> SiftPolicy {
        self.sift_policy
    }

    /// Policy applied by every subsequent `query`, whichever mapper is attached
    pub fn set_sift_policy(&mut self, policy: SiftPolicy) {
        self.sift_policy = policy;
    }

    /// Fan batch queries out over rayon (no effect without the `parallel` feature)
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Attach the dataset to the engine only; providers keep their own state
    ///
    /// A mapper from [`Self::attach_index_mapper`] is re-indexed on the new
    /// dataset (and detached if that fails); one from [`Self::set_mapper`]
    /// is kept.
    pub fn train(&mut self, dataset: SharedDataset) {
        debug!(
            target: "voxquery-neighborhood",
            "Training query engine on dataset with {} feature(s)",
            dataset.feature_count()
        );

        if let Some(MapperBinding::Indexed(_)) = self.mapper {
            self.mapper = match VoxelIndexMapper::from_dataset(dataset.as_ref()) {
                Ok(mapper) => Some(MapperBinding::Indexed(Arc::new(mapper))),
                Err(e) => {
                    warn!(
                        target: "voxquery-neighborhood",
                        "Detaching index mapper, re-indexing the new dataset failed: {}",
                        e
                    );
                    None
                }
            };
        }

        self.state = EngineState::Trained(dataset);
    }

    /// Attach the dataset to the engine and to every provider
    pub fn train_all(&mut self, dataset: SharedDataset) {
        for (space, provider) in self.spaces.iter_mut() {
            trace!(target: "voxquery-neighborhood", "Training provider for space '{}'", space);
            provider.train(Arc::clone(&dataset));
        }
        self.train(dataset);
    }

    fn dataset(&self) -> NeighborhoodResult<&SharedDataset> {
        match &self.state {
            EngineState::Trained(dataset) => Ok(dataset),
            EngineState::Untrained => Err(NeighborhoodError::NotTrained(
                "QueryEngine has not been trained yet, call train(dataset) first".to_string(),
            )),
        }
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn CoordinateMapper>) -> Self {
        self.set_mapper(mapper);
        self
    }

    pub fn set_mapper(&mut self, mapper: Arc<dyn CoordinateMapper>) {
        self.mapper = Some(MapperBinding::External(mapper));
    }

    pub fn has_mapper(&self) -> bool {
        self.mapper.is_some()
    }

    /// Index the training dataset and use it as the mapper
    ///
    /// The index follows the engine: retraining rebuilds it.
    ///
    /// # Errors
    /// `NotTrained` before `train`; any lookup error while indexing.
    pub fn attach_index_mapper(&mut self) -> NeighborhoodResult<()> {
        let mapper = VoxelIndexMapper::from_dataset(self.dataset()?.as_ref())?;
        self.mapper = Some(MapperBinding::Indexed(Arc::new(mapper)));
        Ok(())
    }

    fn mapper(&self) -> NeighborhoodResult<&dyn CoordinateMapper> {
        self.mapper
            .as_ref()
            .map(MapperBinding::mapper)
            .ok_or_else(|| {
                NeighborhoodError::NotImplemented(
                    "no coordinate mapper attached; translating coordinates to feature ids needs one"
                        .to_string(),
                )
            })
    }

    /// Neighbor coordinates of `feature_id` in every space
    ///
    /// # Errors
    /// `NotTrained` before `train`; `UnknownSpace`/`UnknownFeature` if the
    /// dataset can't place the feature in one of the spaces.
    pub fn neighborhood_coordinates(&self, feature_id: FeatureId) -> NeighborhoodResult<SpaceCoordinates> {
        let dataset = self.dataset()?;
        let mut result = SpaceCoordinates::new();

        for (space, provider) in &self.spaces {
            let coord = dataset.coordinate(space, feature_id)?;
            let neighbors = provider.query(coord)?;
            trace!(
                target: "voxquery-neighborhood",
                "Feature {} at {} in '{}': {} neighbor coordinate(s)",
                feature_id,
                coord,
                space,
                neighbors.len()
            );
            result.insert(space.clone(), neighbors);
        }

        Ok(result)
    }

    /// [`Self::neighborhood_coordinates`] for many features, results in input order
    pub fn neighborhood_coordinates_batch(
        &self,
        feature_ids: &[FeatureId],
    ) -> NeighborhoodResult<Vec<SpaceCoordinates>> {
        self.dataset()?;

        #[cfg(feature = "parallel")]
        if self.parallel {
            let run = || {
                feature_ids
                    .par_iter()
                    .map(|&id| self.neighborhood_coordinates(id))
                    .collect()
            };
            return match &self.pool {
                Some(pool) => pool.install(run),
                None => run(),
            };
        }

        feature_ids
            .iter()
            .map(|&id| self.neighborhood_coordinates(id))
            .collect()
    }

    /// Feature ids in the neighborhood of `feature_id` across all spaces
    ///
    /// # Errors
    /// `NotImplemented` when no mapper is attached; otherwise as
    /// [`Self::neighborhood_coordinates`] plus mapper errors.
    pub fn query(&self, feature_id: FeatureId) -> NeighborhoodResult<Vec<FeatureId>> {
        let coordinates = self.neighborhood_coordinates(feature_id)?;
        self.mapper()?.feature_ids(&coordinates, self.sift_policy)
    }

    /// [`Self::query`] for many features, results in input order
    pub fn query_batch(&self, feature_ids: &[FeatureId]) -> NeighborhoodResult<Vec<Vec<FeatureId>>> {
        let mapper = self.mapper()?;
        self.neighborhood_coordinates_batch(feature_ids)?
            .iter()
            .map(|coordinates| mapper.feature_ids(coordinates, self.sift_policy))
            .collect()
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("spaces", &self.spaces.keys().collect::<Vec<_>>())
            .field("trained", &self.is_trained())
            .field("mapper", &self.mapper.is_some())
            .field("sift_policy", &self.sift_policy)
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureAttributeTable;
    use crate::types::Point3;
    use voxquery_config::SpaceConfig;

    fn line_dataset() -> SharedDataset {
        // Five features on a line along x in voxel space
        let coords = (0..5).map(|x| Point3::new(x, 0, 0)).collect();
        FeatureAttributeTable::new(5)
            .with_space("voxel_indices", coords)
            .unwrap()
            .into_shared()
    }

    fn engine() -> QueryEngine {
        QueryEngine::new().with_space(
            "voxel_indices",
            Sphere::with_extent(3, (5, 1, 1)).unwrap(),
        )
    }

    #[test]
    fn test_untrained_engine_fails_fast() {
        let engine = engine();
        assert!(!engine.is_trained());
        assert!(matches!(
            engine.neighborhood_coordinates(0),
            Err(NeighborhoodError::NotTrained(_))
        ));
        assert!(matches!(
            engine.neighborhood_coordinates_batch(&[0]),
            Err(NeighborhoodError::NotTrained(_))
        ));
    }

    #[test]
    fn test_neighborhood_coordinates() {
        let mut engine = engine();
        engine.train(line_dataset());

        let result = engine.neighborhood_coordinates(2).unwrap();
        assert_eq!(
            result["voxel_indices"],
            vec![Point3::new(1, 0, 0), Point3::new(2, 0, 0), Point3::new(3, 0, 0)]
        );
    }

    #[test]
    fn test_query_without_mapper_is_not_implemented() {
        let mut engine = engine();
        engine.train(line_dataset());
        assert!(matches!(
            engine.query(2),
            Err(NeighborhoodError::NotImplemented(_))
        ));
        assert!(matches!(
            engine.query_batch(&[1, 2]),
            Err(NeighborhoodError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_train_does_not_propagate() {
        let mut engine = engine();
        engine.train(line_dataset());
        assert!(engine.is_trained());
        assert!(!engine.provider("voxel_indices").unwrap().is_trained());
    }

    #[test]
    fn test_train_all_propagates() {
        let mut engine = engine();
        engine.train_all(line_dataset());
        assert!(engine.is_trained());
        assert!(engine.provider("voxel_indices").unwrap().is_trained());
    }

    #[test]
    fn test_query_with_index_mapper() {
        let mut engine = engine();
        engine.train(line_dataset());
        engine.attach_index_mapper().unwrap();

        assert_eq!(engine.query(0).unwrap(), vec![0, 1]);
        assert_eq!(engine.query(2).unwrap(), vec![1, 2, 3]);
        assert_eq!(engine.query_batch(&[4, 0]).unwrap(), vec![vec![3, 4], vec![0, 1]]);
    }

    #[test]
    fn test_policy_change_after_attaching_mapper() {
        let dataset = FeatureAttributeTable::new(3)
            .with_space(
                "voxel_indices",
                vec![Point3::new(0, 0, 0), Point3::new(1, 0, 0), Point3::new(9, 9, 0)],
            )
            .unwrap()
            .with_space(
                "mni",
                vec![Point3::new(0, 0, 0), Point3::new(7, 0, 0), Point3::new(0, 0, 1)],
            )
            .unwrap()
            .into_shared();
        let mut engine = QueryEngine::new()
            .with_space("voxel_indices", Sphere::new(3).unwrap())
            .with_space("mni", Sphere::new(3).unwrap());
        engine.train(dataset);
        engine.attach_index_mapper().unwrap();
        assert_eq!(engine.query(0).unwrap(), vec![0, 1, 2]);

        engine.set_sift_policy(SiftPolicy::Intersection);
        assert_eq!(engine.sift_policy(), SiftPolicy::Intersection);
        assert_eq!(engine.query(0).unwrap(), vec![0]);
        assert_eq!(engine.query_batch(&[0]).unwrap(), vec![vec![0]]);

        engine.set_sift_policy(SiftPolicy::Union);
        assert_eq!(engine.query(0).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_retraining_reindexes_attached_mapper() {
        let mut engine = engine();
        engine.train(line_dataset());
        engine.attach_index_mapper().unwrap();
        assert_eq!(engine.query(0).unwrap(), vec![0, 1]);

        // Feature 1 moves out of reach of feature 0
        let moved = FeatureAttributeTable::new(2)
            .with_space("voxel_indices", vec![Point3::new(0, 0, 0), Point3::new(4, 0, 0)])
            .unwrap()
            .into_shared();
        engine.train(moved);
        assert!(engine.has_mapper());
        assert_eq!(engine.query(0).unwrap(), vec![0]);
        assert_eq!(engine.query(1).unwrap(), vec![1]);
    }

    #[test]
    fn test_retraining_keeps_caller_mapper() {
        let mut engine = engine();
        engine.train(line_dataset());
        let fixed = VoxelIndexMapper::from_dataset(line_dataset().as_ref()).unwrap();
        engine.set_mapper(Arc::new(fixed));

        let moved = FeatureAttributeTable::new(2)
            .with_space("voxel_indices", vec![Point3::new(0, 0, 0), Point3::new(4, 0, 0)])
            .unwrap()
            .into_shared();
        engine.train(moved);

        // Caller-owned index still describes the five-feature line
        assert_eq!(engine.query(1).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_attach_index_mapper_requires_training() {
        let mut engine = engine();
        assert!(matches!(
            engine.attach_index_mapper(),
            Err(NeighborhoodError::NotTrained(_))
        ));
    }

    #[test]
    fn test_unknown_feature() {
        let mut engine = engine();
        engine.train(line_dataset());
        assert!(matches!(
            engine.neighborhood_coordinates(99),
            Err(NeighborhoodError::UnknownFeature { feature_id: 99, .. })
        ));
    }

    #[test]
    fn test_batch_matches_single_queries() {
        let mut engine = engine();
        engine.train(line_dataset());
        let ids = [4, 0, 2, 2];

        let batch = engine.neighborhood_coordinates_batch(&ids).unwrap();
        for (id, coords) in ids.iter().zip(&batch) {
            assert_eq!(coords, &engine.neighborhood_coordinates(*id).unwrap());
        }

        engine.set_parallel(false);
        assert_eq!(engine.neighborhood_coordinates_batch(&ids).unwrap(), batch);
    }

    #[test]
    fn test_from_config() {
        let mut config = VoxqueryConfig::default();
        config.neighborhood.default_diameter = 5;
        let mut space = SpaceConfig::new("voxel_indices");
        space.extent = Some(vec![5, 1, 1]);
        config.spaces.push(space);
        config.query.sift_policy = "intersection".to_string();
        config.system.max_threads = 2;

        let engine = QueryEngine::from_config(&config).unwrap();
        assert_eq!(engine.spaces().collect::<Vec<_>>(), vec!["voxel_indices"]);
        assert_eq!(engine.sift_policy(), SiftPolicy::Intersection);
    }

    #[test]
    fn test_from_invalid_config() {
        let mut config = VoxqueryConfig::default();
        let mut space = SpaceConfig::new("voxel_indices");
        space.diameter = Some(4);
        config.spaces.push(space);

        assert!(matches!(
            QueryEngine::from_config(&config),
            Err(NeighborhoodError::Config(_))
        ));
    }

    #[test]
    fn test_from_spaces() {
        let engine = QueryEngine::from_spaces(vec![
            ("voxel_indices", Sphere::new(3).unwrap()),
            ("mni", Sphere::new(5).unwrap()),
        ]);
        assert_eq!(engine.spaces().collect::<Vec<_>>(), vec!["mni", "voxel_indices"]);
        assert!(!engine.has_mapper());
    }

    #[test]
    fn test_add_space_replaces() {
        let mut engine = engine();
        let previous = engine.add_space("voxel_indices", Sphere::new(5).unwrap());
        assert!(previous.is_some());
        assert!(engine.add_space("mni", Sphere::new(3).unwrap()).is_none());
        assert_eq!(engine.spaces().collect::<Vec<_>>(), vec!["mni", "voxel_indices"]);
    }
}
