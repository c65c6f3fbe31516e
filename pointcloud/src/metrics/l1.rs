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

//! f32 implementation of the L1 metric.

use super::{diffs, gaps, Metric};

/// L1 norm, the sum of absolute values
#[derive(Debug, Clone, Copy, Default)]
pub struct L1 {}

#[inline]
fn l1<I: Iterator<Item = f32>>(diffs: I) -> f32 {
    diffs.map(|d| d.abs()).fold(0.0, |acc, d| acc + d)
}

impl Metric for L1 {
    #[inline]
    fn dense(&self, x: &[f32], y: &[f32]) -> f32 {
        l1(diffs(x, y))
    }

    #[inline]
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32 {
        l1(gaps(x, lower, upper))
    }

    #[inline]
    fn norm(&self, x: &[f32]) -> f32 {
        l1(x.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxicab() {
        assert_approx_eq!(L1 {}.dense(&[0.0, 0.0], &[3.0, -4.0]), 7.0);
        assert_approx_eq!(L1 {}.norm(&[-1.0, 2.0]), 3.0);
        assert_approx_eq!(L1 {}.box_distance(&[2.0, -1.0], &[0.0, 0.0], &[1.0, 1.0]), 2.0);
    }
}
