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

use pointcloud::PointIndex;
use std::cmp::Ordering;

/// A point and its distance to the query. Ordered by distance, then by index, so the
/// largest element of a max-heap is the worst neighbor and ties go to the smaller index.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QuerySingleton {
    pub(crate) dist: f32,
    pub(crate) index: PointIndex,
}

impl QuerySingleton {
    pub(crate) fn new(index: PointIndex, dist: f32) -> QuerySingleton {
        QuerySingleton { dist, index }
    }
}

impl PartialEq for QuerySingleton {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QuerySingleton {}

impl Ord for QuerySingleton {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for QuerySingleton {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
