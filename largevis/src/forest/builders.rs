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

use super::*;
use crate::errors::*;
use crate::LargeVisParameters;
use pointcloud::pc_errors::{PointCloudError, PointCloudResult};
use pointcloud::*;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use pbr::ProgressBar;
use rand::prelude::*;
use std::sync::Arc;
use std::time::Instant;

type TreeBuildResult = (usize, PointCloudResult<RandomProjectionTree>);

/// A construction object for a random projection forest.
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    pub(crate) leaf_capacity: usize,
    pub(crate) num_trees: usize,
    pub(crate) max_candidates: Option<usize>,
    pub(crate) verbosity: u32,
    pub(crate) rng_seed: Option<u64>,
}

impl Default for ForestBuilder {
    fn default() -> ForestBuilder {
        ForestBuilder {
            leaf_capacity: 16,
            num_trees: 10,
            max_candidates: None,
            verbosity: 0,
            rng_seed: None,
        }
    }
}

impl ForestBuilder {
    /// Creates a new builder with sensible defaults.
    pub fn new() -> ForestBuilder {
        ForestBuilder::default()
    }

    /// Takes the forest related values out of a full parameter set.
    pub fn from_parameters(parameters: &LargeVisParameters) -> ForestBuilder {
        ForestBuilder {
            leaf_capacity: parameters.leaf_capacity,
            num_trees: parameters.num_trees,
            max_candidates: parameters.max_candidates,
            verbosity: parameters.verbosity,
            rng_seed: parameters.rng_seed,
        }
    }

    /// Maximum number of points in a leaf. Bigger leaves give more candidates per tree.
    pub fn set_leaf_capacity(&mut self, x: usize) -> &mut Self {
        self.leaf_capacity = x;
        self
    }
    /// More trees means better recall, at the cost of build time and bigger candidate sets.
    pub fn set_num_trees(&mut self, x: usize) -> &mut Self {
        self.num_trees = x;
        self
    }
    /// Caps the candidates gathered per point.
    pub fn set_max_candidates(&mut self, x: usize) -> &mut Self {
        self.max_candidates = Some(x);
        self
    }
    /// Above 1 a progress bar is drawn while the trees come in.
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }
    /// Tree `t` is seeded with `x ^ t`. Without a seed the trees are seeded from entropy.
    pub fn set_rng_seed(&mut self, x: u64) -> &mut Self {
        self.rng_seed = Some(x);
        self
    }

    /// Builds every tree on its own task of a rayon scope, and collects them over a channel.
    pub fn build<D: PointCloud>(&self, data: Arc<D>) -> LargeVisResult<RandomProjectionForest<D>> {
        if self.leaf_capacity == 0 {
            return Err(LargeVisError::invalid_parameter(
                "leaf_capacity",
                "a leaf has to hold at least one point",
            ));
        }
        if self.num_trees == 0 {
            return Err(LargeVisError::invalid_parameter(
                "num_trees",
                "the forest needs at least one tree",
            ));
        }
        if self.max_candidates == Some(0) {
            return Err(LargeVisError::invalid_parameter(
                "max_candidates",
                "needs to be at least 1",
            ));
        }
        if data.is_empty() {
            return Err(PointCloudError::EmptyDataset.into());
        }

        let now = Instant::now();
        let mut entropy = SmallRng::from_entropy();
        let seeds: Vec<u64> = (0..self.num_trees)
            .map(|tree_index| match self.rng_seed {
                Some(seed) => seed ^ tree_index as u64,
                None => entropy.gen(),
            })
            .collect();

        let (tree_sender, tree_receiver): (Sender<TreeBuildResult>, Receiver<TreeBuildResult>) =
            unbounded();
        // The scope waits by working, so this is safe to call from inside a rayon pool.
        rayon::scope(|s| {
            for (tree_index, seed) in seeds.iter().enumerate() {
                let data = data.as_ref();
                let tree_sender = tree_sender.clone();
                let leaf_capacity = self.leaf_capacity;
                let seed = *seed;
                s.spawn(move |_| {
                    let tree = RandomProjectionTree::build(data, leaf_capacity, seed);
                    // The receiver outlives the scope
                    let _ = tree_sender.send((tree_index, tree));
                });
            }
        });
        drop(tree_sender);

        let mut pb = ProgressBar::new(self.num_trees as u64);
        if self.verbosity > 1 {
            pb.format("╢▌▌░╟");
        }
        let mut trees: Vec<Option<RandomProjectionTree>> = vec![None; self.num_trees];
        for (tree_index, tree) in tree_receiver.iter() {
            let tree = tree?;
            debug!(
                "Tree {} has depth {} and {} nodes",
                tree_index,
                tree.depth(),
                tree.node_count()
            );
            trees[tree_index] = Some(tree);
            if self.verbosity > 1 {
                pb.inc();
            }
        }
        if self.verbosity > 1 {
            pb.finish_print("Finished building the forest");
        }
        let trees: Vec<RandomProjectionTree> = trees.into_iter().flatten().collect();
        info!(
            "Built {} random projection trees over {} points in {:?}",
            trees.len(),
            data.len(),
            now.elapsed()
        );
        Ok(RandomProjectionForest {
            data,
            trees,
            leaf_capacity: self.leaf_capacity,
            max_candidates: self.max_candidates,
        })
    }
}
