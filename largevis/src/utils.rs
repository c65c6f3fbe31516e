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

//! Ground truth helpers, a linear scan k-NN and a recall measure to grade approximate
//! results with.

use crate::errors::*;
use crate::query_tools::BoundedNeighborSet;
use fxhash::FxHashSet;
use ndarray::ArrayView2;
use pointcloud::*;
use rayon::prelude::*;

/// The `k` nearest points to `point` by a full scan of the cloud, nearest first with ties going
/// to the smaller index. `skip` leaves one index out of the scan.
pub fn brute_force_knn<D: PointCloud>(
    data: &D,
    point: &[f32],
    k: usize,
    skip: Option<PointIndex>,
) -> LargeVisResult<Vec<(f32, PointIndex)>> {
    data.check_point(point)?;
    let available = data.len() - skip.map(|_| 1).unwrap_or(0);
    LargeVisError::check_k(k, available)?;
    let indexes = data.reference_indexes();
    let dists = data.distances_to_point(point, &indexes)?;
    let mut neighbors = BoundedNeighborSet::new(k);
    for (i, d) in indexes.iter().zip(dists) {
        if Some(*i) != skip {
            neighbors.push(*i, d);
        }
    }
    Ok(neighbors.unpack())
}

/// The exact k nearest neighbor graph of the cloud, in parallel over the points. With
/// `include_self` each row starts with its own point, even when it has exact duplicates.
/// Without it each point is left out of its own row.
pub fn brute_force_kneighbors<D: PointCloud>(
    data: &D,
    k: usize,
    include_self: bool,
) -> LargeVisResult<Vec<Vec<(f32, PointIndex)>>> {
    if include_self {
        LargeVisError::check_k(k, data.len())?;
    }
    (0..data.len())
        .into_par_iter()
        .map(|i| {
            if !include_self {
                return brute_force_knn(data, data.point(i)?, k, Some(i));
            }
            let mut row = Vec::with_capacity(k);
            row.push((0.0, i));
            if k > 1 {
                row.extend(brute_force_knn(data, data.point(i)?, k - 1, Some(i))?);
            }
            Ok(row)
        })
        .collect()
}

/// Average overlap between the rows of an approximate and an exact neighbor index matrix, as
/// a fraction of the row width. Both need the same shape.
pub fn recall(approximate: ArrayView2<usize>, exact: ArrayView2<usize>) -> LargeVisResult<f32> {
    if approximate.dim() != exact.dim() {
        return Err(LargeVisError::invalid_parameter(
            "approximate",
            format!(
                "shape {:?} does not match the exact shape {:?}",
                approximate.dim(),
                exact.dim()
            ),
        ));
    }
    let (rows, cols) = exact.dim();
    if rows == 0 || cols == 0 {
        return Ok(1.0);
    }
    let hits: usize = approximate
        .outer_iter()
        .zip(exact.outer_iter())
        .map(|(a, e)| {
            let truth: FxHashSet<usize> = e.iter().cloned().collect();
            let found: FxHashSet<usize> = a.iter().cloned().collect();
            found.intersection(&truth).count()
        })
        .sum();
    Ok(hits as f32 / (rows * cols) as f32)
}
