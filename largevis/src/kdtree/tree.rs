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
use crate::errors::*;
use crate::query_tools::BoundedNeighborSet;
use pointcloud::*;

use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

const ROOT: NodeIndex = 0;

/// An exact k-nearest-neighbor index. Built once by a [`crate::KdTreeBuilder`], read only
/// afterwards, so it can be shared between threads and queried concurrently.
#[derive(Debug)]
pub struct KdTree<D: PointCloud> {
    pub(crate) data: Arc<D>,
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) permutation: Vec<PointIndex>,
    pub(crate) depth: usize,
    pub(crate) leaf_capacity: usize,
    pub(crate) num_neighbors: usize,
    pub(crate) include_self: bool,
}

impl<D: PointCloud> KdTree<D> {
    /// The cloud the tree indexes
    pub fn point_cloud(&self) -> &Arc<D> {
        &self.data
    }

    /// The number of indexed points
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Never true for a built tree
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Width of the indexed points
    pub fn dim(&self) -> usize {
        self.data.dim()
    }

    /// Maximum number of points a leaf was allowed to hold
    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// The `k` the tree was fitted for
    pub fn num_neighbors(&self) -> usize {
        self.num_neighbors
    }

    /// If queries by index report the point itself
    pub fn include_self(&self) -> bool {
        self.include_self
    }

    /// Length of the longest path from the root to a leaf
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The point indexes grouped by leaf
    pub fn permutation(&self) -> &[PointIndex] {
        &self.permutation
    }

    /// The root node
    pub fn root(&self) -> &KdNode {
        &self.nodes[ROOT]
    }

    /// The contents of every leaf, left to right.
    pub fn leaves(&self) -> Vec<&[PointIndex]> {
        let mut leaves: Vec<(usize, &[PointIndex])> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                KdNode::Leaf { start, end, .. } => {
                    Some((*start, &self.permutation[*start..*end]))
                }
                _ => None,
            })
            .collect();
        leaves.sort_by_key(|(start, _)| *start);
        leaves.into_iter().map(|(_, leaf)| leaf).collect()
    }

    /// The `k` nearest indexed points to `point`, nearest first, ties broken by the smaller index.
    /// A point that is in the tree comes back as its own nearest neighbor.
    pub fn knn(&self, point: &[f32], k: usize) -> LargeVisResult<Vec<(f32, PointIndex)>> {
        self.data.check_point(point)?;
        LargeVisError::check_k(k, self.len())?;
        let mut neighbors = BoundedNeighborSet::new(k);
        self.search_knn(ROOT, point, None, &mut neighbors)?;
        Ok(neighbors.unpack())
    }

    /// The `k` nearest neighbors of an indexed point. With `include_self` the point itself is
    /// always first, ahead of any exact duplicates, followed by its `k - 1` nearest others.
    /// Without it the point is skipped, so `k` can be at most `len() - 1`.
    pub fn knn_index(
        &self,
        index: PointIndex,
        k: usize,
    ) -> LargeVisResult<Vec<(f32, PointIndex)>> {
        let point = self.data.point(index)?;
        let others = if self.include_self {
            LargeVisError::check_k(k, self.len())?;
            k - 1
        } else {
            LargeVisError::check_k(k, self.len() - 1)?;
            k
        };
        let mut neighbors = BoundedNeighborSet::new(others);
        self.search_knn(ROOT, point, Some(index), &mut neighbors)?;
        let mut found = neighbors.unpack();
        if self.include_self {
            found.insert(0, (0.0, index));
        }
        Ok(found)
    }

    /// The k nearest neighbor graph of the indexed points, one row per point.
    pub fn kneighbors(&self, k: usize) -> LargeVisResult<Vec<Vec<(f32, PointIndex)>>> {
        (0..self.len())
            .into_par_iter()
            .map(|i| self.knn_index(i, k))
            .collect()
    }

    /// Every indexed point within `radius` of `point`, boundary included, nearest first.
    pub fn within_radius(
        &self,
        point: &[f32],
        radius: f32,
    ) -> LargeVisResult<Vec<(f32, PointIndex)>> {
        self.data.check_point(point)?;
        if !(radius >= 0.0 && radius.is_finite()) {
            return Err(LargeVisError::invalid_parameter(
                "radius",
                format!("needs to be finite and non-negative, got {}", radius),
            ));
        }
        let mut found = Vec::new();
        self.search_radius(ROOT, point, radius, &mut found)?;
        found.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        Ok(found)
    }

    fn search_knn(
        &self,
        node: NodeIndex,
        point: &[f32],
        skip: Option<PointIndex>,
        neighbors: &mut BoundedNeighborSet,
    ) -> LargeVisResult<()> {
        let metric = self.data.metric();
        match &self.nodes[node] {
            KdNode::Leaf { start, end, .. } => {
                for i in &self.permutation[*start..*end] {
                    if Some(*i) == skip {
                        continue;
                    }
                    let dist = metric.dense(point, self.data.point(*i)?);
                    neighbors.push(*i, dist);
                }
            }
            KdNode::Internal { left, right, .. } => {
                let left_dist = self.nodes[*left].bbox().distance(metric, point);
                let right_dist = self.nodes[*right].bbox().distance(metric, point);
                let ((near, near_dist), (far, far_dist)) = if left_dist <= right_dist {
                    ((*left, left_dist), (*right, right_dist))
                } else {
                    ((*right, right_dist), (*left, left_dist))
                };
                if neighbors.would_accept(near_dist) {
                    self.search_knn(near, point, skip, neighbors)?;
                }
                // The near side may have tightened the bound
                if neighbors.would_accept(far_dist) {
                    self.search_knn(far, point, skip, neighbors)?;
                }
            }
        }
        Ok(())
    }

    fn search_radius(
        &self,
        node: NodeIndex,
        point: &[f32],
        radius: f32,
        found: &mut Vec<(f32, PointIndex)>,
    ) -> LargeVisResult<()> {
        let metric = self.data.metric();
        let current = &self.nodes[node];
        if current.bbox().distance(metric, point) > radius {
            return Ok(());
        }
        match current {
            KdNode::Leaf { start, end, .. } => {
                for i in &self.permutation[*start..*end] {
                    let dist = metric.dense(point, self.data.point(*i)?);
                    if dist <= radius {
                        found.push((dist, *i));
                    }
                }
            }
            KdNode::Internal { left, right, .. } => {
                self.search_radius(*left, point, radius, found)?;
                self.search_radius(*right, point, radius, found)?;
            }
        }
        Ok(())
    }
}
