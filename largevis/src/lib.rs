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

#![warn(missing_docs)]

//! # LargeVis
//! Two ways of finding the k nearest neighbors of every row of a dense `N x M` matrix.
//!
//! The exact engine is a KD-tree. It splits the points at the median of one coordinate per
//! level, keeps a bounding box per node, and answers queries with a best-first descent that
//! only opens a subtree when its box could still hold a point closer than the current k-th
//! best. The answers match a brute force scan exactly, ties included.
//!
//! The approximate engine is the first half of LargeVis: a forest of random projection trees
//! proposes candidates (the points that shared a leaf), and the neighbor graph refiner then
//! improves each point's list by looking at its neighbors' neighbors.
//!
//! ## Parameter Guide
//! The `leaf_capacity` controls how many points a leaf is allowed to hold, for both kinds of
//! tree. A smaller value gives deeper trees. For the KD-tree that means more pruning and fewer
//! distance computations per query, up to a point. For the forest it means fewer candidates per
//! tree, so you need more trees for the same recall.
//!
//! The `num_trees` is the main recall knob of the approximate engine. Each tree adds roughly
//! `leaf_capacity` candidates per point, and the build is embarrassingly parallel.
//!
//! The `iterations` of refinement are cheap compared to the forest. Recall never drops from
//! one pass to the next, and 2 or 3 passes usually get most of the way. The
//! [`TerminationPolicy::UntilStable`] policy stops early once a pass changes nothing.
//!
//! All of these can be read from a yaml file with [`LargeVisParameters::from_yaml`].
//!

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod errors;
pub use errors::{LargeVisError, LargeVisResult};

pub mod query_tools;
pub(crate) mod partition;

pub mod kdtree;
pub use kdtree::{KdTree, KdTreeBuilder};

pub mod forest;
pub use forest::{CandidateGraph, ForestBuilder, RandomProjectionForest, RandomProjectionTree};

pub mod refine;
pub use refine::{NeighborGraphRefiner, RefinementReport, TerminationPolicy};

pub mod parameters;
pub use parameters::LargeVisParameters;

pub mod query_interface;
pub mod utils;

mod fit;
pub use fit::{forest_fit, kdtree_fit, kdtree_predict, largevis_fit, largevis_fit_with_report};
