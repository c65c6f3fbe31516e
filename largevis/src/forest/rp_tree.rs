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

use crate::partition::{median_split, ArenaNode, SubTree};
use pointcloud::pc_errors::PointCloudResult;
use pointcloud::*;

use rand::prelude::*;
use rand_distr::StandardNormal;

const PARALLEL_CUTOFF: usize = 2048;

/// A node of a random projection tree.
#[derive(Debug, Clone)]
pub enum RpNode {
    /// Terminal node, owns a range of the tree's permutation
    Leaf {
        /// Start of the range
        start: usize,
        /// End of the range, exclusive
        end: usize,
    },
    /// Split on the projection onto a random direction
    Internal {
        /// Unit length direction the points were projected on
        direction: Vec<f32>,
        /// Largest projection on the left
        split: f32,
        /// Child with projections `<= split`
        left: usize,
        /// Child with projections `>= split`
        right: usize,
    },
}

impl ArenaNode for RpNode {
    fn shift(&mut self, by: usize) {
        if let RpNode::Internal { left, right, .. } = self {
            *left += by;
            *right += by;
        }
    }
}

/// Uniform direction on the unit sphere, a normalized gaussian vector.
pub(crate) fn random_direction<R: Rng>(dim: usize, rng: &mut R) -> Vec<f32> {
    loop {
        let direction: Vec<f32> = (0..dim)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        let norm = direction.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 && norm.is_finite() {
            return direction.iter().map(|x| x / norm).collect();
        }
    }
}

#[inline]
fn project(point: &[f32], direction: &[f32]) -> f32 {
    point.iter().zip(direction).map(|(x, d)| x * d).sum()
}

/// Each node owns its own rng, seeded by its parent, so the shape of the tree doesn't depend on
/// which rayon worker got to which half first.
fn build_subtree<D: PointCloud>(
    data: &D,
    indexes: &mut [PointIndex],
    offset: usize,
    leaf_capacity: usize,
    mut rng: SmallRng,
) -> PointCloudResult<SubTree<RpNode>> {
    let count = indexes.len();
    if count <= leaf_capacity {
        return Ok(SubTree::leaf(RpNode::Leaf {
            start: offset,
            end: offset + count,
        }));
    }
    let direction = random_direction(data.dim(), &mut rng);
    let keys = indexes
        .iter()
        .map(|i| data.point(*i).map(|p| project(p, &direction)))
        .collect::<PointCloudResult<Vec<f32>>>()?;
    let (mid, split) = median_split(indexes, &keys);
    let (left_indexes, right_indexes) = indexes.split_at_mut(mid);
    let left_rng = SmallRng::seed_from_u64(rng.gen());
    let right_rng = SmallRng::seed_from_u64(rng.gen());

    let (left, right) = if count > PARALLEL_CUTOFF {
        rayon::join(
            || build_subtree(data, left_indexes, offset, leaf_capacity, left_rng),
            || build_subtree(data, right_indexes, offset + mid, leaf_capacity, right_rng),
        )
    } else {
        (
            build_subtree(data, left_indexes, offset, leaf_capacity, left_rng),
            build_subtree(data, right_indexes, offset + mid, leaf_capacity, right_rng),
        )
    };
    Ok(SubTree::join(left?, right?, |left, right| RpNode::Internal {
        direction,
        split,
        left,
        right,
    }))
}

/// One randomized partition of the cloud. Same recursive halving as the KD-tree, but each split
/// is at the median projection onto a fresh random direction. There are no bounding boxes, the
/// tree is only used to find points that land in the same leaf.
#[derive(Debug, Clone)]
pub struct RandomProjectionTree {
    nodes: Vec<RpNode>,
    permutation: Vec<PointIndex>,
    depth: usize,
}

impl RandomProjectionTree {
    /// Builds a tree over every point of the cloud. The same seed gives the same tree.
    pub fn build<D: PointCloud>(
        data: &D,
        leaf_capacity: usize,
        seed: u64,
    ) -> PointCloudResult<RandomProjectionTree> {
        let mut permutation = data.reference_indexes();
        let built = build_subtree(
            data,
            &mut permutation,
            0,
            leaf_capacity.max(1),
            SmallRng::seed_from_u64(seed),
        )?;
        Ok(RandomProjectionTree {
            nodes: built.nodes,
            permutation,
            depth: built.depth,
        })
    }

    /// Length of the longest path from the root to a leaf
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The nodes, root first
    pub fn nodes(&self) -> &[RpNode] {
        &self.nodes
    }

    /// The point indexes grouped by leaf
    pub fn permutation(&self) -> &[PointIndex] {
        &self.permutation
    }

    /// The contents of every leaf, left to right
    pub fn leaves(&self) -> Vec<&[PointIndex]> {
        let mut leaves: Vec<(usize, usize)> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                RpNode::Leaf { start, end } => Some((*start, *end)),
                _ => None,
            })
            .collect();
        leaves.sort();
        leaves
            .into_iter()
            .map(|(start, end)| &self.permutation[start..end])
            .collect()
    }

    /// Routes a point down the tree, and returns the leaf it ends up in. Projections equal to a
    /// split go left.
    pub fn leaf_for(&self, point: &[f32]) -> &[PointIndex] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                RpNode::Leaf { start, end } => return &self.permutation[*start..*end],
                RpNode::Internal {
                    direction,
                    split,
                    left,
                    right,
                } => {
                    node = if project(point, direction) <= *split {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointcloud::data_sources::DataRam;

    fn random_cloud(count: usize, dim: usize, seed: u64) -> DataRam<L2> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let data = (0..count * dim).map(|_| rng.gen::<f32>()).collect();
        DataRam::new(data, dim, L2 {}).unwrap()
    }

    #[test]
    fn directions_are_unit_length() {
        let mut rng = SmallRng::seed_from_u64(0);
        for dim in 1..20 {
            let direction = random_direction(dim, &mut rng);
            assert_eq!(direction.len(), dim);
            assert_approx_eq!(project(&direction, &direction), 1.0, 1.0e-5);
        }
    }

    #[test]
    fn permutation_is_a_bijection() {
        let data = random_cloud(3000, 5, 1);
        let tree = RandomProjectionTree::build(&data, 16, 7).unwrap();
        let mut seen = tree.leaves().concat();
        seen.sort();
        assert_eq!(seen, (0..3000).collect::<Vec<PointIndex>>());
        for leaf in tree.leaves() {
            assert!(!leaf.is_empty() && leaf.len() <= 16);
        }
        assert_eq!(tree.node_count(), 2 * tree.leaves().len() - 1);
    }

    #[test]
    fn same_seed_same_tree() {
        let data = random_cloud(5000, 3, 2);
        let a = RandomProjectionTree::build(&data, 10, 42).unwrap();
        let b = RandomProjectionTree::build(&data, 10, 42).unwrap();
        let c = RandomProjectionTree::build(&data, 10, 43).unwrap();
        assert_eq!(a.leaves(), b.leaves());
        assert_ne!(a.leaves(), c.leaves());
    }

    #[test]
    fn indexed_points_route_to_their_leaf() {
        let data = random_cloud(500, 4, 3);
        let tree = RandomProjectionTree::build(&data, 8, 5).unwrap();
        for i in 0..500 {
            assert!(tree.leaf_for(data.point(i).unwrap()).contains(&i));
        }
    }

    #[test]
    fn duplicates_terminate() {
        let data = DataRam::new(vec![0.5; 3 * 777], 3, L2 {}).unwrap();
        let tree = RandomProjectionTree::build(&data, 4, 9).unwrap();
        assert_eq!(tree.leaves().concat().len(), 777);
        assert!(tree.depth() <= 8);
    }
}
