// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the query engine
//!
//! Builds engines over small two-space datasets and checks the full
//! feature -> coordinates -> feature id round trip.

use std::sync::Arc;

use voxquery_config::{SpaceConfig, VoxqueryConfig};
use voxquery_neighborhood::{
    FeatureAttributeTable, NeighborhoodError, NeighborhoodProvider, Point3, QueryEngine,
    SharedDataset, SiftPolicy, Sphere, VoxelIndexMapper,
};

/// 3x3x1 voxel grid, one feature per voxel, plus a coarse "mni" space in
/// which only the left column shares a coordinate
fn grid_dataset() -> SharedDataset {
    let mut voxels = Vec::new();
    let mut mni = Vec::new();
    for x in 0..3 {
        for y in 0..3 {
            voxels.push(Point3::new(x, y, 0));
            mni.push(Point3::new(if x == 0 { 0 } else { 10 * x + y }, 0, 0));
        }
    }
    FeatureAttributeTable::new(9)
        .with_space("voxel_indices", voxels)
        .unwrap()
        .with_space("mni", mni)
        .unwrap()
        .into_shared()
}

fn grid_engine() -> QueryEngine {
    QueryEngine::new()
        .with_space("voxel_indices", Sphere::with_extent(3, (3, 3, 1)).unwrap())
        .with_space("mni", Sphere::new(1).unwrap())
}

// ============================================================================
// Coordinates
// ============================================================================

#[test]
fn test_corner_feature_is_clipped_in_every_space() {
    let mut engine = grid_engine();
    engine.train(grid_dataset());

    let coords = engine.neighborhood_coordinates(0).unwrap();
    assert_eq!(coords.len(), 2);
    assert_eq!(
        coords["voxel_indices"],
        vec![Point3::new(0, 0, 0), Point3::new(0, 1, 0), Point3::new(1, 0, 0)]
    );
    assert_eq!(coords["mni"], vec![Point3::new(0, 0, 0)]);
}

#[test]
fn test_center_feature_gets_plus_shape() {
    let mut engine = grid_engine();
    engine.train(grid_dataset());

    // Feature 4 sits at (1, 1, 0); z is clipped by the 1-voxel extent
    let coords = engine.neighborhood_coordinates(4).unwrap();
    assert_eq!(coords["voxel_indices"].len(), 5);
}

// ============================================================================
// Feature ids
// ============================================================================

#[test]
fn test_union_and_intersection_over_spaces() {
    let dataset = grid_dataset();
    let mut engine = grid_engine();
    engine.train(Arc::clone(&dataset));

    let mapper = VoxelIndexMapper::from_dataset(dataset.as_ref()).unwrap();
    engine.set_mapper(Arc::new(mapper));
    // voxel neighbors of feature 0: {0, 1, 3}; mni neighbors: left column {0, 1, 2}
    assert_eq!(engine.query(0).unwrap(), vec![0, 1, 2, 3]);

    // Same mapper, the engine's policy decides
    engine.set_sift_policy(SiftPolicy::Intersection);
    assert_eq!(engine.query(0).unwrap(), vec![0, 1]);
}

#[test]
fn test_batch_query_preserves_input_order() {
    let mut engine = grid_engine();
    engine.train(grid_dataset());
    engine.set_sift_policy(SiftPolicy::Intersection);
    engine.attach_index_mapper().unwrap();

    let ids = [8, 0, 4];
    let batch = engine.query_batch(&ids).unwrap();
    assert_eq!(batch.len(), 3);
    for (id, found) in ids.iter().zip(&batch) {
        assert_eq!(found, &engine.query(*id).unwrap());
        assert!(found.contains(id));
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_query_before_training_fails() {
    let engine = grid_engine();
    assert!(matches!(
        engine.query(0),
        Err(NeighborhoodError::NotTrained(_))
    ));
}

#[test]
fn test_retraining_switches_dataset() {
    let mut engine = grid_engine();
    engine.train(grid_dataset());
    engine.attach_index_mapper().unwrap();
    assert!(engine.neighborhood_coordinates(8).is_ok());
    assert_eq!(engine.query(0).unwrap(), vec![0, 1, 2, 3]);

    // Feature 1 moves far away in both spaces
    let moved = FeatureAttributeTable::new(2)
        .with_space("voxel_indices", vec![Point3::ORIGIN, Point3::new(2, 2, 0)])
        .unwrap()
        .with_space("mni", vec![Point3::ORIGIN, Point3::new(50, 0, 0)])
        .unwrap()
        .into_shared();
    engine.train(moved);
    assert!(matches!(
        engine.neighborhood_coordinates(8),
        Err(NeighborhoodError::UnknownFeature { feature_id: 8, .. })
    ));
    assert_eq!(engine.query(0).unwrap(), vec![0]);
    assert_eq!(engine.query(1).unwrap(), vec![1]);
}

#[test]
fn test_missing_space_in_dataset() {
    let mut engine = grid_engine().with_space("talairach", Sphere::new(3).unwrap());
    engine.train(grid_dataset());
    assert!(matches!(
        engine.neighborhood_coordinates(0),
        Err(NeighborhoodError::UnknownSpace(space)) if space == "talairach"
    ));
}

#[test]
fn test_engine_from_config() {
    let mut config = VoxqueryConfig::default();
    let mut voxels = SpaceConfig::new("voxel_indices");
    voxels.extent = Some(vec![3, 3, 1]);
    config.spaces.push(voxels);
    let mut mni = SpaceConfig::new("mni");
    mni.diameter = Some(1);
    config.spaces.push(mni);

    let mut engine = QueryEngine::from_config(&config).unwrap();
    engine.train_all(grid_dataset());
    assert!(engine.provider("mni").unwrap().is_trained());

    let configured = engine.neighborhood_coordinates(0).unwrap();
    let mut manual = grid_engine();
    manual.train(grid_dataset());
    assert_eq!(configured, manual.neighborhood_coordinates(0).unwrap());
}

#[test]
fn test_engine_is_shareable_across_threads() {
    let mut engine = grid_engine();
    engine.train(grid_dataset());
    engine.attach_index_mapper().unwrap();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|id| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.query(id).unwrap())
        })
        .collect();

    for (id, handle) in handles.into_iter().enumerate() {
        assert!(handle.join().unwrap().contains(&id));
    }
}
