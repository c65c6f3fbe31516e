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

use super::query_items::QuerySingleton;
use pointcloud::PointIndex;
use std::collections::BinaryHeap;

/// The `k` best `(distance, index)` pairs seen so far for a single query.
///
/// This is a max-heap capped at `k`, the top is the current worst neighbor. Once the set is full,
/// a candidate only gets in if it beats the top, where "beats" means a smaller distance, or the
/// same distance and a smaller index. The set does not deduplicate, callers that can offer the
/// same point twice need to guard against it.
///
/// Lives for one query and is thrown away after `unpack`.
#[derive(Debug, Clone)]
pub struct BoundedNeighborSet {
    dist_heap: BinaryHeap<QuerySingleton>,
    k: usize,
}

impl BoundedNeighborSet {
    /// Creates an empty set that keeps at most `k` neighbors.
    pub fn new(k: usize) -> BoundedNeighborSet {
        BoundedNeighborSet {
            dist_heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// The capacity
    pub fn k(&self) -> usize {
        self.k
    }

    /// The current number of points in the set
    pub fn len(&self) -> usize {
        self.dist_heap.len()
    }

    /// If nothing has been inserted yet
    pub fn is_empty(&self) -> bool {
        self.dist_heap.is_empty()
    }

    /// Once full, every insert has to displace something
    pub fn is_full(&self) -> bool {
        self.dist_heap.len() >= self.k
    }

    /// The current kth distance. If the set isn't full it returns the maximum float value.
    pub fn max_dist(&self) -> f32 {
        if self.is_full() {
            self.dist_heap.peek().map(|x| x.dist).unwrap_or(std::f32::MAX)
        } else {
            std::f32::MAX
        }
    }

    /// Could anything at distance `dist` still make it in? This is the pruning test, so a tie
    /// with the kth distance is still worth a look (it may have a smaller index).
    #[inline]
    pub fn would_accept(&self, dist: f32) -> bool {
        match self.dist_heap.peek() {
            Some(worst) if self.is_full() => dist <= worst.dist,
            _ => self.k > 0,
        }
    }

    /// Offers a point, returns true if it was kept.
    pub fn push(&mut self, index: PointIndex, dist: f32) -> bool {
        if self.k == 0 {
            return false;
        }
        let candidate = QuerySingleton::new(index, dist);
        if !self.is_full() {
            self.dist_heap.push(candidate);
            return true;
        }
        match self.dist_heap.peek() {
            Some(worst) if candidate < *worst => {
                self.dist_heap.pop();
                self.dist_heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// Shove a bunch of points in
    pub fn push_points(&mut self, indexes: &[PointIndex], dists: &[f32]) {
        for (i, d) in indexes.iter().zip(dists) {
            self.push(*i, *d);
        }
    }

    /// The indexes currently held, in no particular order.
    pub fn indexes(&self) -> impl Iterator<Item = PointIndex> + '_ {
        self.dist_heap.iter().map(|q| q.index)
    }

    /// Unpacks the set, nearest first. This consumes the set.
    pub fn unpack(self) -> Vec<(f32, PointIndex)> {
        self.dist_heap
            .into_sorted_vec()
            .iter()
            .map(|q| (q.dist, q.index))
            .collect()
    }
}
