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

use super::node::*;
use super::KdTree;
use crate::errors::*;
use crate::partition::{median_split, SubTree};
use crate::LargeVisParameters;
use pointcloud::pc_errors::{PointCloudError, PointCloudResult};
use pointcloud::*;

use log::info;
use std::sync::Arc;
use std::time::Instant;

/// Slices larger than this get their two halves built on separate rayon tasks.
const PARALLEL_CUTOFF: usize = 2048;

/// Recursive halving of `indexes`, which sits at `offset` in the final permutation. The
/// split axis cycles with the depth.
fn build_subtree<D: PointCloud>(
    data: &D,
    indexes: &mut [PointIndex],
    offset: usize,
    depth: usize,
    leaf_capacity: usize,
) -> PointCloudResult<SubTree<KdNode>> {
    let bbox = BoundingBox::covering(data, indexes)?;
    let count = indexes.len();
    if count <= leaf_capacity {
        return Ok(SubTree::leaf(KdNode::Leaf {
            bbox,
            start: offset,
            end: offset + count,
        }));
    }
    let axis = depth % data.dim();
    let keys = indexes
        .iter()
        .map(|i| data.point(*i).map(|p| p[axis]))
        .collect::<PointCloudResult<Vec<f32>>>()?;
    let (mid, split) = median_split(indexes, &keys);
    let (left_indexes, right_indexes) = indexes.split_at_mut(mid);

    let (left, right) = if count > PARALLEL_CUTOFF {
        rayon::join(
            || build_subtree(data, left_indexes, offset, depth + 1, leaf_capacity),
            || build_subtree(data, right_indexes, offset + mid, depth + 1, leaf_capacity),
        )
    } else {
        (
            build_subtree(data, left_indexes, offset, depth + 1, leaf_capacity),
            build_subtree(data, right_indexes, offset + mid, depth + 1, leaf_capacity),
        )
    };
    Ok(SubTree::join(left?, right?, |left, right| KdNode::Internal {
        bbox,
        axis,
        split,
        left,
        right,
    }))
}

/// A construction object for a KD-tree.
#[derive(Debug, Clone)]
pub struct KdTreeBuilder {
    pub(crate) leaf_capacity: usize,
    pub(crate) num_neighbors: usize,
    pub(crate) include_self: bool,
    pub(crate) verbosity: u32,
}

impl Default for KdTreeBuilder {
    fn default() -> KdTreeBuilder {
        KdTreeBuilder {
            leaf_capacity: 16,
            num_neighbors: 10,
            include_self: true,
            verbosity: 0,
        }
    }
}

impl KdTreeBuilder {
    /// Creates a new builder with sensible defaults.
    pub fn new() -> KdTreeBuilder {
        KdTreeBuilder::default()
    }

    /// Takes the tree related values out of a full parameter set.
    pub fn from_parameters(parameters: &LargeVisParameters) -> KdTreeBuilder {
        KdTreeBuilder {
            leaf_capacity: parameters.leaf_capacity,
            num_neighbors: parameters.num_neighbors,
            include_self: parameters.include_self,
            verbosity: parameters.verbosity,
        }
    }

    /// Maximum number of points in a leaf. Smaller leaves mean a deeper tree and fewer
    /// distance calls at the bottom.
    pub fn set_leaf_capacity(&mut self, x: usize) -> &mut Self {
        self.leaf_capacity = x;
        self
    }
    /// The `k` used when a query doesn't give one, see [`crate::kdtree_predict`].
    pub fn set_num_neighbors(&mut self, x: usize) -> &mut Self {
        self.num_neighbors = x;
        self
    }
    /// If queries by training index report the point itself first, at distance 0, ahead of any
    /// exact duplicates.
    pub fn set_include_self(&mut self, x: bool) -> &mut Self {
        self.include_self = x;
        self
    }
    /// Above 1 the build reports its timing to stdout.
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }

    /// Builds the tree over the cloud. The cloud is shared, not copied.
    pub fn build<D: PointCloud>(&self, data: Arc<D>) -> LargeVisResult<KdTree<D>> {
        if self.leaf_capacity == 0 {
            return Err(LargeVisError::invalid_parameter(
                "leaf_capacity",
                "a leaf has to hold at least one point",
            ));
        }
        if data.is_empty() {
            return Err(PointCloudError::EmptyDataset.into());
        }
        let now = Instant::now();
        let mut permutation = data.reference_indexes();
        let built = build_subtree(data.as_ref(), &mut permutation, 0, 0, self.leaf_capacity)?;
        info!(
            "Built a KD-tree over {} points with {} nodes and depth {} in {:?}",
            data.len(),
            built.nodes.len(),
            built.depth,
            now.elapsed()
        );
        if self.verbosity > 1 {
            println!(
                "Finished building, took {:?} for {} leaves",
                now.elapsed(),
                (built.nodes.len() + 1) / 2
            );
        }
        Ok(KdTree {
            data,
            nodes: built.nodes,
            permutation,
            depth: built.depth,
            leaf_capacity: self.leaf_capacity,
            num_neighbors: self.num_neighbors,
            include_self: self.include_self,
        })
    }
}
