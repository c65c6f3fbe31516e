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

//! # KD-tree
//! The exact engine. The tree halves the points at the median of one coordinate per level,
//! cycling through the axes with the depth, until a slice fits in a leaf. Every node keeps the
//! bounding box of its subtree, and a query skips any subtree whose box is further away than
//! the current kth best distance.
//!
//! Nodes live in one array and refer to their children by position, the two halves of a large
//! slice are built in parallel into their own arrays and glued together afterwards.

mod builders;
mod node;
mod tree;

pub use builders::KdTreeBuilder;
pub use node::{BoundingBox, KdNode, NodeIndex};
pub use tree::KdTree;
