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

use crate::partition::ArenaNode;
use pointcloud::pc_errors::PointCloudResult;
use pointcloud::*;

/// Position of a node in the tree's node array.
pub type NodeIndex = usize;

/// The smallest axis aligned box containing a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    lower: Vec<f32>,
    upper: Vec<f32>,
}

impl BoundingBox {
    /// The box around the given points of the cloud. Needs at least one index.
    pub(crate) fn covering<D: PointCloud>(
        data: &D,
        indexes: &[PointIndex],
    ) -> PointCloudResult<BoundingBox> {
        let mut lower = vec![std::f32::MAX; data.dim()];
        let mut upper = vec![std::f32::MIN; data.dim()];
        for i in indexes {
            let point = data.point(*i)?;
            for ((l, u), v) in lower.iter_mut().zip(upper.iter_mut()).zip(point) {
                if *v < *l {
                    *l = *v;
                }
                if *v > *u {
                    *u = *v;
                }
            }
        }
        Ok(BoundingBox { lower, upper })
    }

    /// Lower corner
    pub fn lower(&self) -> &[f32] {
        &self.lower
    }

    /// Upper corner
    pub fn upper(&self) -> &[f32] {
        &self.upper
    }

    /// If the point is inside the box, boundary included
    pub fn contains(&self, point: &[f32]) -> bool {
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(v, (l, u))| l <= v && v <= u)
    }

    /// Distance from the point to the nearest point of the box. A lower bound on the distance to
    /// anything inside.
    #[inline]
    pub fn distance<M: Metric>(&self, metric: &M, point: &[f32]) -> f32 {
        metric.box_distance(point, &self.lower, &self.upper)
    }
}

/// A node of the KD-tree. Leaves own a contiguous range of the tree's permutation array,
/// internal nodes own exactly two children in the node array.
#[derive(Debug, Clone)]
pub enum KdNode {
    /// Terminal node
    Leaf {
        /// Box around the points of the leaf
        bbox: BoundingBox,
        /// Start of the leaf's range in the permutation
        start: usize,
        /// End of the range, exclusive
        end: usize,
    },
    /// A split on one axis
    Internal {
        /// Box around every point of the subtree
        bbox: BoundingBox,
        /// Coordinate the points are split on
        axis: usize,
        /// Largest coordinate on the left
        split: f32,
        /// Child with coordinates `<= split`
        left: NodeIndex,
        /// Child with coordinates `>= split`
        right: NodeIndex,
    },
}

impl KdNode {
    /// The box around the node's subtree
    pub fn bbox(&self) -> &BoundingBox {
        match self {
            KdNode::Leaf { bbox, .. } => bbox,
            KdNode::Internal { bbox, .. } => bbox,
        }
    }

    /// If this is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, KdNode::Leaf { .. })
    }
}

impl ArenaNode for KdNode {
    fn shift(&mut self, by: NodeIndex) {
        if let KdNode::Internal { left, right, .. } = self {
            *left += by;
            *right += by;
        }
    }
}
