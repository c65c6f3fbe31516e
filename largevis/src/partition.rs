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

//! The median split and the node arena gluing shared by the KD-tree and the random projection
//! trees.

use pointcloud::PointIndex;
use std::cmp::Ordering;

#[inline]
fn key_order(a: &(f32, PointIndex), b: &(f32, PointIndex)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.cmp(&b.1))
}

/// Rearranges `indexes` so the first `⌈n/2⌉` entries are the ones with the smallest keys, where
/// `keys[j]` is the key of `indexes[j]`. Equal keys are ordered by point index, so points equal to
/// the median go left until the left half is full.
///
/// Returns the size of the left half and the split value, the largest key on the left. Every key
/// on the left is `<=` the split value and every key on the right is `>=` it.
///
/// Average linear time, this uses a selection rather than a sort. Needs at least 2 indexes so
/// that both halves are non-empty.
pub(crate) fn median_split(indexes: &mut [PointIndex], keys: &[f32]) -> (usize, f32) {
    debug_assert_eq!(indexes.len(), keys.len());
    debug_assert!(indexes.len() > 1);
    let mut keyed: Vec<(f32, PointIndex)> = keys
        .iter()
        .cloned()
        .zip(indexes.iter().cloned())
        .collect();
    let mid = (keyed.len() + 1) / 2;
    let (_, median, _) = keyed.select_nth_unstable_by(mid - 1, key_order);
    let split = median.0;
    for (slot, (_, i)) in indexes.iter_mut().zip(keyed) {
        *slot = i;
    }
    (mid, split)
}

/// A node that refers to its children by position in an array.
pub(crate) trait ArenaNode {
    /// Moves every child reference by `by`
    fn shift(&mut self, by: usize);
}

/// A subtree built on its own, root at position 0 of `nodes`.
#[derive(Debug)]
pub(crate) struct SubTree<N> {
    pub(crate) nodes: Vec<N>,
    pub(crate) depth: usize,
}

impl<N: ArenaNode> SubTree<N> {
    pub(crate) fn leaf(node: N) -> SubTree<N> {
        SubTree {
            nodes: vec![node],
            depth: 0,
        }
    }

    /// Glues two subtrees under a new root. `parent` gets the positions of the two children.
    pub(crate) fn join<F>(left: SubTree<N>, right: SubTree<N>, parent: F) -> SubTree<N>
    where
        F: FnOnce(usize, usize) -> N,
    {
        let right_start = 1 + left.nodes.len();
        let mut nodes = Vec::with_capacity(right_start + right.nodes.len());
        nodes.push(parent(1, right_start));
        nodes.extend(left.nodes.into_iter().map(|mut n| {
            n.shift(1);
            n
        }));
        nodes.extend(right.nodes.into_iter().map(|mut n| {
            n.shift(right_start);
            n
        }));
        SubTree {
            nodes,
            depth: 1 + left.depth.max(right.depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn halves_are_balanced_and_ordered() {
        let mut rng = SmallRng::seed_from_u64(0);
        for n in 2..50 {
            let mut indexes: Vec<PointIndex> = (0..n).map(|i| i * 3).collect();
            let key_of = |i: PointIndex| ((i * 7919) % 13) as f32;
            indexes.shuffle(&mut rng);
            let keys: Vec<f32> = indexes.iter().map(|i| key_of(*i)).collect();
            let (mid, split) = median_split(&mut indexes, &keys);

            assert_eq!(mid, (n + 1) / 2);
            assert!(indexes[..mid].iter().all(|i| key_of(*i) <= split));
            assert!(indexes[mid..].iter().all(|i| key_of(*i) >= split));
            let mut sorted = indexes.clone();
            sorted.sort();
            assert_eq!(sorted, (0..n).map(|i| i * 3).collect::<Vec<_>>());
        }
    }

    #[test]
    fn duplicates_go_left_by_index() {
        let mut indexes = vec![4, 1, 3, 0, 2];
        let keys = vec![1.0; 5];
        let (mid, split) = median_split(&mut indexes, &keys);
        assert_eq!(mid, 3);
        assert_eq!(split, 1.0);
        let mut left = indexes[..mid].to_vec();
        left.sort();
        assert_eq!(left, vec![0, 1, 2]);
    }

    #[derive(Debug, PartialEq)]
    enum TestNode {
        Leaf(usize),
        Split(usize, usize),
    }

    impl ArenaNode for TestNode {
        fn shift(&mut self, by: usize) {
            if let TestNode::Split(l, r) = self {
                *l += by;
                *r += by;
            }
        }
    }

    #[test]
    fn joined_children_point_at_the_right_nodes() {
        let left = SubTree::join(
            SubTree::leaf(TestNode::Leaf(0)),
            SubTree::leaf(TestNode::Leaf(1)),
            TestNode::Split,
        );
        let tree = SubTree::join(left, SubTree::leaf(TestNode::Leaf(2)), TestNode::Split);
        assert_eq!(tree.depth, 2);
        assert_eq!(
            tree.nodes,
            vec![
                TestNode::Split(1, 4),
                TestNode::Split(2, 3),
                TestNode::Leaf(0),
                TestNode::Leaf(1),
                TestNode::Leaf(2),
            ]
        );
    }
}
