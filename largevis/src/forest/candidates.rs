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

use super::RandomProjectionTree;
use fxhash::FxHashSet;
use pointcloud::PointIndex;
use rayon::prelude::*;

/// For every point, the points it shared a leaf with in some tree of the forest. These are the
/// plausible neighbors the refiner starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGraph {
    candidates: Vec<Vec<PointIndex>>,
    max_candidates: Option<usize>,
}

/// Leaf number of each point in one tree.
fn leaf_membership(tree: &RandomProjectionTree, len: usize) -> Vec<usize> {
    let mut membership = vec![0; len];
    for (leaf_index, leaf) in tree.leaves().iter().enumerate() {
        for i in leaf.iter() {
            membership[*i] = leaf_index;
        }
    }
    membership
}

impl CandidateGraph {
    /// Collects the co-leaf points of each point, tree by tree and in leaf order, skipping the
    /// point itself and anything already seen. Stops at `max_candidates` per point.
    pub fn from_trees(
        trees: &[RandomProjectionTree],
        len: usize,
        max_candidates: Option<usize>,
    ) -> CandidateGraph {
        let leaves: Vec<(Vec<&[PointIndex]>, Vec<usize>)> = trees
            .par_iter()
            .map(|tree| (tree.leaves(), leaf_membership(tree, len)))
            .collect();
        let cap = max_candidates.unwrap_or(std::usize::MAX);

        let candidates = (0..len)
            .into_par_iter()
            .map(|i| {
                let mut seen: FxHashSet<PointIndex> = FxHashSet::default();
                seen.insert(i);
                let mut found = Vec::new();
                'trees: for (tree_leaves, membership) in leaves.iter() {
                    for j in tree_leaves[membership[i]].iter() {
                        if found.len() >= cap {
                            break 'trees;
                        }
                        if seen.insert(*j) {
                            found.push(*j);
                        }
                    }
                }
                found
            })
            .collect();
        CandidateGraph {
            candidates,
            max_candidates,
        }
    }

    /// Wraps explicit candidate lists. Self references and repeats are dropped, the first
    /// occurrence wins.
    pub fn from_lists(lists: Vec<Vec<PointIndex>>) -> CandidateGraph {
        let candidates = lists
            .into_iter()
            .enumerate()
            .map(|(i, list)| {
                let mut seen: FxHashSet<PointIndex> = FxHashSet::default();
                seen.insert(i);
                list.into_iter().filter(|j| seen.insert(*j)).collect()
            })
            .collect();
        CandidateGraph {
            candidates,
            max_candidates: None,
        }
    }

    /// Number of points in the graph
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// If there are no points
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The cap on the candidates per point, if there is one
    pub fn max_candidates(&self) -> Option<usize> {
        self.max_candidates
    }

    /// The candidates of a point, in the order they were found
    pub fn candidates(&self, i: PointIndex) -> &[PointIndex] {
        &self.candidates[i]
    }

    /// Iterates over the candidate lists by point
    pub fn iter(&self) -> impl Iterator<Item = &[PointIndex]> + '_ {
        self.candidates.iter().map(|c| c.as_slice())
    }

    /// Mean number of candidates per point
    pub fn average_size(&self) -> f32 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        let total: usize = self.candidates.iter().map(|c| c.len()).sum();
        total as f32 / self.candidates.len() as f32
    }
}
