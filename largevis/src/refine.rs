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

//! # Neighbor graph refinement
//! The second half of the approximate engine. Starting from the forest's candidates, each
//! iteration looks at the neighbors of every point's neighbors, and keeps the closest ones.
//!
//! Every point of an iteration reads the graph the previous iteration finished, and the new graph
//! only replaces it once every point is done. The result doesn't depend on the order the points
//! are visited in, so the pass runs in parallel.

use crate::errors::*;
use crate::forest::CandidateGraph;
use crate::query_tools::BoundedNeighborSet;
use crate::utils::brute_force_knn;
use crate::LargeVisParameters;
use pointcloud::*;

use fxhash::FxHashSet;
use log::{debug, info, warn};
use pbr::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// When the refiner stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Always run every iteration
    Fixed,
    /// Stop as soon as an iteration leaves every neighbor list unchanged, or after the
    /// configured iterations
    UntilStable,
}

impl Default for TerminationPolicy {
    fn default() -> TerminationPolicy {
        TerminationPolicy::Fixed
    }
}

impl TerminationPolicy {
    /// Parses `fixed` or `until_stable`
    pub fn from_name(name: &str) -> Option<TerminationPolicy> {
        match name {
            "fixed" => Some(TerminationPolicy::Fixed),
            "until_stable" => Some(TerminationPolicy::UntilStable),
            _ => None,
        }
    }
}

/// What happened during a refinement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefinementReport {
    /// Iterations actually run
    pub iterations_run: usize,
    /// If the last iteration run changed nothing
    pub converged: bool,
    /// Number of points whose neighbor list changed, per iteration
    pub changed_per_iteration: Vec<usize>,
    /// Points that had fewer than k neighbors after the last iteration, and were filled in by a
    /// linear scan
    pub short_rows: usize,
}

/// Neighbor list of one point, nearest first.
type NeighborRow = Vec<(f32, PointIndex)>;

/// Improves a candidate graph toward the true k nearest neighbor graph.
#[derive(Debug, Clone)]
pub struct NeighborGraphRefiner {
    pub(crate) num_neighbors: usize,
    pub(crate) iterations: usize,
    pub(crate) termination: TerminationPolicy,
    pub(crate) include_self: bool,
    pub(crate) verbosity: u32,
}

impl Default for NeighborGraphRefiner {
    fn default() -> NeighborGraphRefiner {
        NeighborGraphRefiner {
            num_neighbors: 10,
            iterations: 3,
            termination: TerminationPolicy::Fixed,
            include_self: true,
            verbosity: 0,
        }
    }
}

impl NeighborGraphRefiner {
    /// Creates a refiner with sensible defaults.
    pub fn new() -> NeighborGraphRefiner {
        NeighborGraphRefiner::default()
    }

    /// Takes the refinement related values out of a full parameter set.
    pub fn from_parameters(parameters: &LargeVisParameters) -> NeighborGraphRefiner {
        NeighborGraphRefiner {
            num_neighbors: parameters.num_neighbors,
            iterations: parameters.iterations,
            termination: parameters.termination,
            include_self: parameters.include_self,
            verbosity: parameters.verbosity,
        }
    }

    /// Width of the output, the point itself included when `include_self` is set.
    pub fn set_num_neighbors(&mut self, x: usize) -> &mut Self {
        self.num_neighbors = x;
        self
    }
    /// The number of neighbor-of-neighbor passes. Zero just ranks the candidates.
    pub fn set_iterations(&mut self, x: usize) -> &mut Self {
        self.iterations = x;
        self
    }
    /// See [`TerminationPolicy`]
    pub fn set_termination(&mut self, x: TerminationPolicy) -> &mut Self {
        self.termination = x;
        self
    }
    /// If column 0 of each row is the point itself, at distance 0
    pub fn set_include_self(&mut self, x: bool) -> &mut Self {
        self.include_self = x;
        self
    }
    /// Above 1 a progress bar is drawn over the iterations.
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }

    /// Ranks the candidates and refines them. Returns one row of `num_neighbors` neighbors per
    /// point, nearest first, and a report of the run.
    pub fn refine<D: PointCloud>(
        &self,
        data: &D,
        graph: &CandidateGraph,
    ) -> LargeVisResult<(Vec<NeighborRow>, RefinementReport)> {
        if graph.len() != data.len() {
            return Err(LargeVisError::invalid_parameter(
                "graph",
                format!(
                    "has {} points but the cloud has {}",
                    graph.len(),
                    data.len()
                ),
            ));
        }
        LargeVisError::check_k(self.num_neighbors, data.len())?;
        // neighbors other than the point itself
        let others = if self.include_self {
            self.num_neighbors - 1
        } else {
            self.num_neighbors
        };
        if !self.include_self && others >= data.len() {
            return Err(LargeVisError::InvalidK {
                k: self.num_neighbors,
                len: data.len() - 1,
            });
        }

        let now = Instant::now();
        // Every candidate stays in play until the first expansion narrows the rows down
        let mut current: Vec<NeighborRow> = (0..data.len())
            .into_par_iter()
            .map(|i| rank(data, i, graph.candidates(i)))
            .collect::<LargeVisResult<Vec<NeighborRow>>>()?;

        let mut report = RefinementReport::default();
        let mut pb = ProgressBar::new(self.iterations as u64);
        if self.verbosity > 1 {
            pb.format("╢▌▌░╟");
        }
        for iteration in 0..self.iterations {
            let snapshot = &current;
            let next: Vec<NeighborRow> = (0..data.len())
                .into_par_iter()
                .map(|i| expand(data, i, snapshot, others))
                .collect::<LargeVisResult<Vec<NeighborRow>>>()?;
            let changed = next
                .par_iter()
                .zip(current.par_iter())
                .filter(|(new, old)| !same_indexes(new, &old[..old.len().min(others)]))
                .count();
            current = next;

            report.iterations_run += 1;
            report.changed_per_iteration.push(changed);
            report.converged = changed == 0;
            debug!("Refinement iteration {} changed {} rows", iteration, changed);
            if self.verbosity > 1 {
                pb.inc();
            }
            if report.converged && self.termination == TerminationPolicy::UntilStable {
                break;
            }
        }
        if self.verbosity > 1 {
            pb.finish_print("Finished refining");
        }
        for row in current.iter_mut() {
            row.truncate(others);
        }

        let short_rows = current.iter().filter(|row| row.len() < others).count();
        if short_rows > 0 {
            warn!(
                "{} points had fewer than {} candidates, filling them in by a linear scan",
                short_rows, others
            );
            current = current
                .into_par_iter()
                .enumerate()
                .map(|(i, row)| {
                    if row.len() < others {
                        brute_force_knn(data, data.point(i)?, others, Some(i))
                    } else {
                        Ok(row)
                    }
                })
                .collect::<LargeVisResult<Vec<NeighborRow>>>()?;
        }
        report.short_rows = short_rows;

        if self.include_self {
            for (i, row) in current.iter_mut().enumerate() {
                row.insert(0, (0.0, i));
            }
        }
        info!(
            "Refined {} neighbor lists in {} iterations in {:?}",
            current.len(),
            report.iterations_run,
            now.elapsed()
        );
        Ok((current, report))
    }
}

/// All of the given points, sorted by their distance to point `i`.
fn rank<D: PointCloud>(
    data: &D,
    i: PointIndex,
    candidates: &[PointIndex],
) -> LargeVisResult<NeighborRow> {
    let dists = data.distances_to_point_index(i, candidates)?;
    let mut neighbors = BoundedNeighborSet::new(candidates.len());
    neighbors.push_points(candidates, &dists);
    Ok(neighbors.unpack())
}

/// The `m` nearest of point `i`'s neighbors and their neighbors, read from `snapshot`.
fn expand<D: PointCloud>(
    data: &D,
    i: PointIndex,
    snapshot: &[NeighborRow],
    m: usize,
) -> LargeVisResult<NeighborRow> {
    let row = &snapshot[i];
    let mut seen: FxHashSet<PointIndex> = row.iter().map(|(_, j)| *j).collect();
    seen.insert(i);
    let mut fresh = Vec::new();
    for (_, j) in row.iter() {
        for (_, l) in snapshot[*j].iter() {
            if seen.insert(*l) {
                fresh.push(*l);
            }
        }
    }
    let dists = data.distances_to_point_index(i, &fresh)?;
    let mut neighbors = BoundedNeighborSet::new(m);
    for (d, j) in row.iter() {
        neighbors.push(*j, *d);
    }
    neighbors.push_points(&fresh, &dists);
    Ok(neighbors.unpack())
}

fn same_indexes(a: &[(f32, PointIndex)], b: &[(f32, PointIndex)]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.1 == y.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::brute_force_kneighbors;
    use pointcloud::data_sources::DataRam;
    use rand::prelude::*;

    fn random_cloud(count: usize, dim: usize, seed: u64) -> DataRam<L2> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let data = (0..count * dim).map(|_| rng.gen::<f32>()).collect();
        DataRam::new(data, dim, L2 {}).unwrap()
    }

    /// Points on a shuffled line, each point starts out knowing the next few indexes, which are
    /// at random positions. Refinement has to walk the graph to find the true neighbors.
    fn shuffled_line(count: usize) -> (DataRam<L2>, CandidateGraph) {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut order: Vec<usize> = (0..count).collect();
        order.shuffle(&mut rng);
        let rows: Vec<[f32; 1]> = order.iter().map(|x| [*x as f32]).collect();
        let data = DataRam::from_rows(&rows, L2 {}).unwrap();
        let lists = (0..count)
            .map(|i| (1..=5).map(|d| (i + d) % count).collect())
            .collect();
        (data, CandidateGraph::from_lists(lists))
    }

    fn overlap(rows: &[NeighborRow], truth: &[NeighborRow]) -> usize {
        rows.iter()
            .zip(truth)
            .map(|(a, b)| a.iter().filter(|x| b.iter().any(|y| y.1 == x.1)).count())
            .sum()
    }

    #[test]
    fn full_candidates_give_exact_results() {
        let data = random_cloud(60, 3, 1);
        let lists = (0..60).map(|_| (0..60).collect()).collect();
        let graph = CandidateGraph::from_lists(lists);
        let (rows, report) = NeighborGraphRefiner::new()
            .set_num_neighbors(5)
            .set_iterations(0)
            .refine(&data, &graph)
            .unwrap();
        assert_eq!(report.iterations_run, 0);
        let truth = brute_force_kneighbors(&data, 5, true).unwrap();
        assert_eq!(rows, truth);
    }

    #[test]
    fn recall_never_drops() {
        let (data, graph) = shuffled_line(300);
        let truth = brute_force_kneighbors(&data, 4, false).unwrap();
        let mut hits_per_run = Vec::new();
        for iterations in 0..5 {
            let (rows, _) = NeighborGraphRefiner::new()
                .set_num_neighbors(4)
                .set_include_self(false)
                .set_iterations(iterations)
                .refine(&data, &graph)
                .unwrap();
            assert!(rows.iter().all(|row| row.len() == 4));
            hits_per_run.push(overlap(&rows, &truth));
        }
        for pair in hits_per_run.windows(2) {
            assert!(pair[0] <= pair[1], "recall dropped: {:?}", hits_per_run);
        }
        assert!(hits_per_run[4] > hits_per_run[0]);
    }

    #[test]
    fn rows_are_sorted_with_self_first() {
        let data = random_cloud(100, 2, 2);
        let lists = (0..100)
            .map(|i| (1..8).map(|d| (i + d * 13) % 100).collect())
            .collect();
        let graph = CandidateGraph::from_lists(lists);
        let (rows, _) = NeighborGraphRefiner::new()
            .set_num_neighbors(4)
            .set_iterations(2)
            .refine(&data, &graph)
            .unwrap();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), 4);
            assert_eq!(row[0], (0.0, i));
            assert!(row[1..].iter().all(|(_, j)| *j != i));
            for pair in row.windows(2) {
                assert!(pair[0].0 <= pair[1].0);
            }
        }
    }

    #[test]
    fn first_pass_sees_every_candidate() {
        // 0 only reaches 3 through 2, its second candidate
        let data = DataRam::from_rows(&[[0.0], [5.0], [100.0], [1.0]], L2 {}).unwrap();
        let graph = CandidateGraph::from_lists(vec![vec![1, 2], vec![2], vec![3], vec![2]]);
        let mut refiner = NeighborGraphRefiner::new();
        refiner.set_num_neighbors(1).set_include_self(false);

        let (rows, report) = refiner.set_iterations(1).refine(&data, &graph).unwrap();
        assert_eq!(rows[0], vec![(1.0, 3)]);
        assert_eq!(report.changed_per_iteration, vec![2]);
        assert!(rows.iter().all(|row| row.len() == 1));

        let (rows, _) = refiner.set_iterations(0).refine(&data, &graph).unwrap();
        assert_eq!(rows[0], vec![(5.0, 1)]);
        assert!(rows.iter().all(|row| row.len() == 1));
    }

    #[test]
    fn stops_once_stable() {
        let data = random_cloud(80, 2, 3);
        let lists = (0..80).map(|_| (0..80).collect()).collect();
        let graph = CandidateGraph::from_lists(lists);
        let (_, report) = NeighborGraphRefiner::new()
            .set_num_neighbors(3)
            .set_iterations(10)
            .set_termination(TerminationPolicy::UntilStable)
            .refine(&data, &graph)
            .unwrap();
        // Exact from the start, so the first pass changes nothing
        assert_eq!(report.iterations_run, 1);
        assert!(report.converged);
        assert_eq!(report.changed_per_iteration, vec![0]);

        let (_, report) = NeighborGraphRefiner::new()
            .set_num_neighbors(3)
            .set_iterations(4)
            .refine(&data, &graph)
            .unwrap();
        assert_eq!(report.iterations_run, 4);
    }

    #[test]
    fn short_rows_are_filled() {
        let data = random_cloud(20, 2, 4);
        let graph = CandidateGraph::from_lists(vec![vec![]; 20]);
        let (rows, report) = NeighborGraphRefiner::new()
            .set_num_neighbors(3)
            .set_iterations(1)
            .refine(&data, &graph)
            .unwrap();
        assert_eq!(report.short_rows, 20);
        assert_eq!(rows, brute_force_kneighbors(&data, 3, true).unwrap());
    }

    #[test]
    fn k_is_checked() {
        let data = random_cloud(5, 2, 5);
        let graph = CandidateGraph::from_lists(vec![vec![]; 5]);
        let mut refiner = NeighborGraphRefiner::new();
        assert!(refiner.set_num_neighbors(6).refine(&data, &graph).is_err());
        assert!(refiner.set_num_neighbors(5).refine(&data, &graph).is_ok());
        assert!(refiner
            .set_include_self(false)
            .refine(&data, &graph)
            .is_err());
        assert!(refiner.set_num_neighbors(4).refine(&data, &graph).is_ok());
    }
}
