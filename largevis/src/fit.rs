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

//! Matrix in, matrix out entry points. Data comes in as an `N x M` matrix of rows, neighbors go
//! out as an `N x k` index matrix and an `N x k` distance matrix, rows nearest first.

use crate::errors::*;
use crate::forest::{CandidateGraph, ForestBuilder, RandomProjectionForest};
use crate::kdtree::{KdTree, KdTreeBuilder};
use crate::query_interface::{knn_arrays, rows_to_arrays};
use crate::refine::{NeighborGraphRefiner, RefinementReport};
use crate::LargeVisParameters;
use pointcloud::data_sources::DataRam;
use pointcloud::*;

use log::info;
use ndarray::{Array2, ArrayView2};
use std::sync::Arc;

fn load(data: ArrayView2<f32>, metric: MetricSpec) -> LargeVisResult<Arc<DefaultCloud>> {
    metric.validate()?;
    Ok(Arc::new(DataRam::from_array(data, metric)?))
}

/// Builds an exact index over the rows of `data`. The tree remembers `num_neighbors` for
/// [`kdtree_predict`].
pub fn kdtree_fit(
    data: ArrayView2<f32>,
    num_neighbors: usize,
    metric: MetricSpec,
    leaf_capacity: usize,
) -> LargeVisResult<KdTree<DefaultCloud>> {
    let data = load(data, metric)?;
    LargeVisError::check_k(num_neighbors, data.len())?;
    KdTreeBuilder::new()
        .set_leaf_capacity(leaf_capacity)
        .set_num_neighbors(num_neighbors)
        .build(data)
}

/// The tree's `num_neighbors` nearest indexed points to each query row.
pub fn kdtree_predict<D: PointCloud>(
    tree: &KdTree<D>,
    queries: ArrayView2<f32>,
) -> LargeVisResult<(Array2<usize>, Array2<f32>)> {
    knn_arrays(tree, queries, tree.num_neighbors())
}

/// Builds a seeded forest over the rows of `data` and gathers its candidate graph.
pub fn forest_fit(
    data: ArrayView2<f32>,
    num_neighbors: usize,
    num_trees: usize,
    leaf_capacity: usize,
    seed: Option<u64>,
) -> LargeVisResult<(RandomProjectionForest<DefaultCloud>, CandidateGraph)> {
    let data = load(data, MetricSpec::Euclidean)?;
    LargeVisError::check_k(num_neighbors, data.len())?;
    let mut builder = ForestBuilder::new();
    builder
        .set_num_trees(num_trees)
        .set_leaf_capacity(leaf_capacity);
    if let Some(seed) = seed {
        builder.set_rng_seed(seed);
    }
    let forest = builder.build(data)?;
    let graph = forest.candidate_graph();
    Ok((forest, graph))
}

/// The approximate k nearest neighbor graph of the rows of `data`: a random projection forest
/// followed by neighbor graph refinement, configured by `parameters`.
pub fn largevis_fit(
    data: ArrayView2<f32>,
    parameters: &LargeVisParameters,
) -> LargeVisResult<(Array2<usize>, Array2<f32>)> {
    let (indices, distances, _) = largevis_fit_with_report(data, parameters)?;
    Ok((indices, distances))
}

/// [`largevis_fit`], together with the report of the refinement.
pub fn largevis_fit_with_report(
    data: ArrayView2<f32>,
    parameters: &LargeVisParameters,
) -> LargeVisResult<(Array2<usize>, Array2<f32>, RefinementReport)> {
    parameters.validate()?;
    let data = load(data, parameters.metric)?;
    LargeVisError::check_k(parameters.num_neighbors, data.len())?;
    let forest = ForestBuilder::from_parameters(parameters).build(Arc::clone(&data))?;
    let graph = forest.candidate_graph();
    info!(
        "Forest gave {:.1} candidates per point on average",
        graph.average_size()
    );
    let (rows, report) =
        NeighborGraphRefiner::from_parameters(parameters).refine(data.as_ref(), &graph)?;
    let (indices, distances) = rows_to_arrays(&rows, parameters.num_neighbors);
    Ok((indices, distances, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn clusters() -> Array2<f32> {
        arr2(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [10.0, 10.0],
            [11.0, 10.0],
            [10.0, 11.0],
        ])
    }

    #[test]
    fn predict_uses_fitted_k() {
        let data = clusters();
        let tree = kdtree_fit(data.view(), 2, MetricSpec::Euclidean, 1).unwrap();
        let (indices, distances) = kdtree_predict(&tree, data.view()).unwrap();
        assert_eq!(indices.dim(), (6, 2));
        for r in 0..6 {
            assert_eq!(indices[[r, 0]], r);
            assert_eq!(distances[[r, 0]], 0.0);
            assert_approx_eq!(distances[[r, 1]], 1.0);
        }
    }

    #[test]
    fn fit_errors() {
        let data = clusters();
        assert!(matches!(
            kdtree_fit(data.view(), 0, MetricSpec::Euclidean, 4),
            Err(LargeVisError::InvalidK { .. })
        ));
        assert!(matches!(
            kdtree_fit(data.view(), 7, MetricSpec::Euclidean, 4),
            Err(LargeVisError::InvalidK { .. })
        ));
        let empty = Array2::<f32>::zeros((0, 2));
        assert!(matches!(
            kdtree_fit(empty.view(), 1, MetricSpec::Euclidean, 4),
            Err(LargeVisError::PointCloudError(
                pointcloud::pc_errors::PointCloudError::EmptyDataset
            ))
        ));
        assert!(matches!(
            kdtree_fit(data.view(), 1, MetricSpec::Minkowski { p: 0.0 }, 4),
            Err(LargeVisError::PointCloudError(
                pointcloud::pc_errors::PointCloudError::InvalidMetric { .. }
            ))
        ));
    }

    #[test]
    fn forest_fit_graph_covers_points() {
        let data = clusters();
        let (forest, graph) = forest_fit(data.view(), 2, 3, 3, Some(0)).unwrap();
        assert_eq!(forest.num_trees(), 3);
        assert_eq!(graph.len(), 6);
        for i in 0..6 {
            assert!(!graph.candidates(i).contains(&i));
        }
    }

    #[test]
    fn largevis_fit_shapes() {
        let data = clusters();
        let mut parameters = LargeVisParameters::default();
        parameters.num_neighbors = 3;
        parameters.leaf_capacity = 3;
        parameters.num_trees = 4;
        parameters.rng_seed = Some(1);
        let (indices, distances, report) =
            largevis_fit_with_report(data.view(), &parameters).unwrap();
        assert_eq!(indices.dim(), (6, 3));
        assert_eq!(distances.dim(), (6, 3));
        assert_eq!(report.iterations_run, 3);
        for r in 0..6 {
            assert_eq!(indices[[r, 0]], r);
            // Each cluster has exactly two other members
            let cluster = r / 3;
            assert_eq!(indices[[r, 1]] / 3, cluster);
            assert_eq!(indices[[r, 2]] / 3, cluster);
        }
    }

    #[test]
    fn fits_from_inside_a_rayon_worker() {
        let data = clusters();
        let mut parameters = LargeVisParameters::default();
        parameters.num_neighbors = 3;
        parameters.leaf_capacity = 3;
        parameters.num_trees = 4;
        parameters.rng_seed = Some(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let (inside, _) = pool
            .install(|| largevis_fit(data.view(), &parameters))
            .unwrap();
        let (outside, _) = largevis_fit(data.view(), &parameters).unwrap();
        assert_eq!(inside, outside);

        let (_, graph) = pool
            .install(|| forest_fit(data.view(), 2, 3, 3, Some(0)))
            .unwrap();
        assert_eq!(graph.len(), 6);
    }
}
