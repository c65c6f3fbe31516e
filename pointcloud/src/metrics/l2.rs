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

//! f32 implementation of the L2 metric.

use super::{diffs, gaps, Metric};

/// L2 norm, the square root of the sum of squares
#[derive(Debug, Clone, Copy, Default)]
pub struct L2 {}

#[inline]
fn sq_l2<I: Iterator<Item = f32>>(diffs: I) -> f32 {
    diffs.map(|d| d * d).fold(0.0, |acc, d| acc + d)
}

impl Metric for L2 {
    #[inline]
    fn dense(&self, x: &[f32], y: &[f32]) -> f32 {
        sq_l2(diffs(x, y)).sqrt()
    }

    #[inline]
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32 {
        sq_l2(gaps(x, lower, upper)).sqrt()
    }

    #[inline]
    fn norm(&self, x: &[f32]) -> f32 {
        sq_l2(x.iter().cloned()).sqrt()
    }
}
