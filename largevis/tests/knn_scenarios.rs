/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

use largevis::errors::LargeVisError;
use largevis::utils::{brute_force_kneighbors, recall};
use largevis::*;
use assert_approx_eq::assert_approx_eq;
use ndarray::{arr2, Array2};
use pointcloud::data_sources::DataRam;
use pointcloud::pc_errors::PointCloudError;
use pointcloud::*;
use rand::prelude::*;
use std::sync::Arc;

fn two_clusters() -> Array2<f32> {
    arr2(&[
        [0.0, 0.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [10.0, 10.0],
        [11.0, 10.0],
        [10.0, 11.0],
    ])
}

fn random_matrix(count: usize, dim: usize, seed: u64) -> Array2<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    Array2::from_shape_fn((count, dim), |_| rng.gen::<f32>())
}

fn exact_indices(data: &Array2<f32>, k: usize) -> Array2<usize> {
    let cloud = DataRam::from_array(data.view(), MetricSpec::Euclidean).unwrap();
    let rows = brute_force_kneighbors(&cloud, k, true).unwrap();
    Array2::from_shape_fn((rows.len(), k), |(r, c)| rows[r][c].1)
}

#[test]
fn clusters_stay_apart() {
    let data = two_clusters();
    let tree = kdtree_fit(data.view(), 2, MetricSpec::Euclidean, 2).unwrap();
    let (indices, distances) = kdtree_predict(&tree, data.view()).unwrap();

    assert_eq!(indices[[0, 0]], 0);
    assert_eq!(distances[[0, 0]], 0.0);
    assert!(indices[[0, 1]] == 1 || indices[[0, 1]] == 2);
    assert_approx_eq!(distances[[0, 1]], 1.0);

    assert_eq!(indices[[3, 0]], 3);
    assert!(indices[[3, 1]] == 4 || indices[[3, 1]] == 5);
    assert_approx_eq!(distances[[3, 1]], 1.0);

    for r in 0..6 {
        for c in 0..2 {
            assert_eq!(indices[[r, c]] / 3, r / 3, "row {} crossed clusters", r);
        }
    }
}

#[test]
fn approximate_engine_on_clusters() {
    let data = two_clusters();
    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 2;
    parameters.leaf_capacity = 2;
    parameters.num_trees = 5;
    parameters.rng_seed = Some(3);
    let (indices, distances) = largevis_fit(data.view(), &parameters).unwrap();
    for r in 0..6 {
        assert_eq!(indices[[r, 0]], r);
        assert_eq!(distances[[r, 0]], 0.0);
        assert_eq!(indices[[r, 1]] / 3, r / 3);
        assert!(distances[[r, 1]] <= 1.5);
    }
}

#[test]
fn engines_agree_on_duplicated_rows() {
    let data = arr2(&[
        [0.0, 0.0],
        [0.0, 0.0],
        [5.0, 5.0],
        [6.0, 5.0],
        [5.0, 5.0],
    ]);
    let cloud = Arc::new(DataRam::from_array(data.view(), MetricSpec::Euclidean).unwrap());
    let tree = KdTreeBuilder::new()
        .set_leaf_capacity(1)
        .build(Arc::clone(&cloud))
        .unwrap();
    let rows = tree.kneighbors(2).unwrap();
    let kd_indices = Array2::from_shape_fn((5, 2), |(r, c)| rows[r][c].1);

    // One leaf holding everything makes the forest candidates complete
    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 2;
    parameters.num_trees = 1;
    parameters.leaf_capacity = 5;
    parameters.rng_seed = Some(4);
    let (indices, distances) = largevis_fit(data.view(), &parameters).unwrap();

    assert_eq!(indices, kd_indices);
    assert_eq!(indices, exact_indices(&data, 2));
    assert_eq!(indices.column(0).to_vec(), vec![0, 1, 2, 3, 4]);
    assert_eq!(indices[[1, 1]], 0);
    assert_eq!(indices[[4, 1]], 2);
    assert_eq!(distances[[1, 1]], 0.0);
}

#[test]
fn k_equal_to_len_returns_everything() {
    let data = two_clusters();
    let tree = kdtree_fit(data.view(), 6, MetricSpec::Euclidean, 1).unwrap();
    let (indices, distances) = kdtree_predict(&tree, data.view()).unwrap();
    let far = 200.0f32.sqrt();
    for r in 0..6 {
        let mut seen: Vec<usize> = indices.row(r).to_vec();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        for c in 1..6 {
            assert!(distances[[r, c - 1]] <= distances[[r, c]]);
        }
    }
    // (0,0) to (10,10)
    assert_eq!(indices[[0, 3]], 3);
    assert_approx_eq!(distances[[0, 3]], far, 1e-4);
    assert_approx_eq!(distances[[0, 5]], (221.0f32).sqrt(), 1e-4);

    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 6;
    parameters.num_trees = 2;
    parameters.leaf_capacity = 3;
    parameters.rng_seed = Some(0);
    let (approx_indices, approx_distances) = largevis_fit(data.view(), &parameters).unwrap();
    assert_eq!(approx_indices, indices);
    for (a, b) in approx_distances.iter().zip(distances.iter()) {
        assert_approx_eq!(*a, *b, 1e-4);
    }
}

#[test]
fn forest_recall_grows_with_iterations() {
    let data = random_matrix(200, 5, 17);
    let exact = exact_indices(&data, 5);

    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 5;
    parameters.leaf_capacity = 8;
    parameters.num_trees = 5;
    parameters.rng_seed = Some(11);

    let mut last = 0.0;
    for iterations in 0..4 {
        parameters.iterations = iterations;
        let (indices, _) = largevis_fit(data.view(), &parameters).unwrap();
        let score = recall(indices.view(), exact.view()).unwrap();
        assert!(
            score >= last,
            "recall dropped from {} to {} at {} iterations",
            last,
            score,
            iterations
        );
        last = score;
    }
    assert!(last >= 0.6, "recall only reached {}", last);
}

#[test]
fn until_stable_matches_enough_fixed_passes() {
    let data = random_matrix(150, 4, 5);
    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 4;
    parameters.num_trees = 2;
    parameters.rng_seed = Some(8);
    parameters.iterations = 50;
    parameters.termination = TerminationPolicy::UntilStable;
    let (stable, _, report) = largevis_fit_with_report(data.view(), &parameters).unwrap();
    assert!(report.converged);
    assert!(report.iterations_run < 50);
    assert_eq!(report.changed_per_iteration.last(), Some(&0));

    parameters.iterations = report.iterations_run;
    parameters.termination = TerminationPolicy::Fixed;
    let (fixed, _) = largevis_fit(data.view(), &parameters).unwrap();
    assert_eq!(stable, fixed);
}

#[test]
fn kd_tree_matches_brute_force_without_self() {
    let data = random_matrix(300, 3, 2);
    let cloud = DataRam::from_array(data.view(), MetricSpec::Manhattan).unwrap();
    let exact = brute_force_kneighbors(&cloud, 7, false).unwrap();
    let tree = KdTreeBuilder::new()
        .set_leaf_capacity(6)
        .set_include_self(false)
        .build(std::sync::Arc::new(cloud))
        .unwrap();
    assert_eq!(tree.kneighbors(7).unwrap(), exact);
}

#[test]
fn bad_inputs() {
    let data = two_clusters();
    assert!(matches!(
        kdtree_fit(data.view(), 7, MetricSpec::Euclidean, 4),
        Err(LargeVisError::InvalidK { k: 7, len: 6 })
    ));
    let tree = kdtree_fit(data.view(), 2, MetricSpec::Euclidean, 4).unwrap();
    let wrong_width = arr2(&[[0.0, 0.0, 0.0]]);
    assert!(matches!(
        kdtree_predict(&tree, wrong_width.view()),
        Err(LargeVisError::PointCloudError(
            PointCloudError::DimensionMismatch { .. }
        ))
    ));
    let mut nan = two_clusters();
    nan[[4, 1]] = f32::NAN;
    assert!(matches!(
        kdtree_fit(nan.view(), 2, MetricSpec::Euclidean, 4),
        Err(LargeVisError::PointCloudError(
            PointCloudError::NonFiniteValue { row: 4, column: 1 }
        ))
    ));
    let mut parameters = LargeVisParameters::default();
    parameters.num_neighbors = 2;
    parameters.num_trees = 0;
    assert!(matches!(
        largevis_fit(data.view(), &parameters),
        Err(LargeVisError::InvalidParameter {
            name: "num_trees",
            ..
        })
    ));
}
