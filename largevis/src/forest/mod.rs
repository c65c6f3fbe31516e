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

//! # Random projection forest
//! The first half of the approximate engine. Each tree splits the cloud at the median
//! projection onto random directions, so nearby points tend to share leaves. Points that share
//! a leaf in any tree become candidate neighbors of each other, and the
//! [`crate::NeighborGraphRefiner`] ranks and improves those candidates.

mod builders;
mod candidates;
mod rp_tree;

pub use builders::ForestBuilder;
pub use candidates::CandidateGraph;
pub use rp_tree::{RandomProjectionTree, RpNode};

use pointcloud::PointCloud;
use std::sync::Arc;

/// An ordered set of independently built random projection trees over one cloud.
#[derive(Debug)]
pub struct RandomProjectionForest<D: PointCloud> {
    pub(crate) data: Arc<D>,
    pub(crate) trees: Vec<RandomProjectionTree>,
    pub(crate) leaf_capacity: usize,
    pub(crate) max_candidates: Option<usize>,
}

impl<D: PointCloud> RandomProjectionForest<D> {
    /// The cloud the forest partitions
    pub fn point_cloud(&self) -> &Arc<D> {
        &self.data
    }

    /// The trees, in build order
    pub fn trees(&self) -> &[RandomProjectionTree] {
        &self.trees
    }

    /// Number of trees
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Maximum number of points a leaf was allowed to hold
    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// The co-leaf candidates of every point, capped at the builder's `max_candidates`.
    pub fn candidate_graph(&self) -> CandidateGraph {
        CandidateGraph::from_trees(&self.trees, self.data.len(), self.max_candidates)
    }
}
