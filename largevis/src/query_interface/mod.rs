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

//! Interfaces that simplify bulk queries

use crate::errors::*;
use crate::kdtree::KdTree;
use pointcloud::pc_errors::PointCloudError;
use pointcloud::*;

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use std::sync::Arc;

/// Packs rows of `(distance, index)` pairs into an index and a distance matrix. Every row
/// needs at least `k` entries.
pub(crate) fn rows_to_arrays(
    rows: &[Vec<(f32, PointIndex)>],
    k: usize,
) -> (Array2<usize>, Array2<f32>) {
    let indices = Array2::from_shape_fn((rows.len(), k), |(r, c)| rows[r][c].1);
    let distances = Array2::from_shape_fn((rows.len(), k), |(r, c)| rows[r][c].0);
    (indices, distances)
}

/// Checks the width and the values of every query row up front, so errors name the row.
pub(crate) fn check_queries(queries: ArrayView2<f32>, dim: usize) -> LargeVisResult<()> {
    if queries.ncols() != dim {
        return Err(PointCloudError::width(dim, queries.ncols()).into());
    }
    for (row, query) in queries.outer_iter().enumerate() {
        if let Some(column) = query.iter().position(|v| !v.is_finite()) {
            return Err(PointCloudError::NonFiniteValue { row, column }.into());
        }
    }
    Ok(())
}

/// The `k` nearest neighbors of each query row, as an index matrix and a distance matrix.
pub(crate) fn knn_arrays<D: PointCloud>(
    tree: &KdTree<D>,
    queries: ArrayView2<f32>,
    k: usize,
) -> LargeVisResult<(Array2<usize>, Array2<f32>)> {
    check_queries(queries, tree.dim())?;
    LargeVisError::check_k(k, tree.len())?;
    let rows = (0..queries.nrows())
        .into_par_iter()
        .map(|r| tree.knn(&queries.row(r).to_vec(), k))
        .collect::<LargeVisResult<Vec<Vec<(f32, PointIndex)>>>>()?;
    Ok(rows_to_arrays(&rows, k))
}

/// Inteface for bulk queries. Handles cloning the tree for you
pub struct BulkInterface<D: PointCloud> {
    tree: Arc<KdTree<D>>,
}

impl<D: PointCloud> BulkInterface<D> {
    /// Creates a new one.
    pub fn new(tree: Arc<KdTree<D>>) -> Self {
        BulkInterface { tree }
    }

    /// The tree being queried
    pub fn tree(&self) -> &Arc<KdTree<D>> {
        &self.tree
    }

    /// Bulk knn
    pub fn knn<T: AsRef<[f32]> + Sync>(
        &self,
        points: &[T],
        k: usize,
    ) -> Vec<LargeVisResult<Vec<(f32, PointIndex)>>> {
        points
            .par_iter()
            .map(|p| self.tree.knn(p.as_ref(), k))
            .collect()
    }

    /// Bulk knn of indexed points, honoring the tree's `include_self`
    pub fn knn_index(
        &self,
        point_indexes: &[PointIndex],
        k: usize,
    ) -> Vec<LargeVisResult<Vec<(f32, PointIndex)>>> {
        point_indexes
            .par_iter()
            .map(|i| self.tree.knn_index(*i, k))
            .collect()
    }

    /// Bulk radius query
    pub fn within_radius<T: AsRef<[f32]> + Sync>(
        &self,
        points: &[T],
        radius: f32,
    ) -> Vec<LargeVisResult<Vec<(f32, PointIndex)>>> {
        points
            .par_iter()
            .map(|p| self.tree.within_radius(p.as_ref(), radius))
            .collect()
    }

    /// Bulk knn of the rows of a matrix, packed into an index matrix and a distance matrix.
    /// Fails on the first bad row.
    pub fn knn_array(
        &self,
        queries: ArrayView2<f32>,
        k: usize,
    ) -> LargeVisResult<(Array2<usize>, Array2<f32>)> {
        knn_arrays(&self.tree, queries, k)
    }
}
