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

//! General exponent Minkowski metrics and the Chebyshev limit.

use super::{diffs, gaps, Metric};
use crate::pc_errors::{PointCloudError, PointCloudResult};
use log::warn;

/// `(sum |x_i - y_i|^p)^(1/p)`
#[derive(Debug, Clone, Copy)]
pub struct Minkowski {
    p: f32,
}

impl Minkowski {
    /// Fails if the exponent is not a positive number.
    pub fn new(p: f32) -> PointCloudResult<Minkowski> {
        if !p.is_finite() || p <= 0.0 {
            return Err(PointCloudError::InvalidMetric {
                message: format!("minkowski exponent must be positive and finite, got {}", p),
            });
        }
        if p < 1.0 {
            warn!(
                "minkowski exponent {} is below 1, the triangle inequality does not hold",
                p
            );
        }
        Ok(Minkowski { p })
    }

    /// The exponent
    pub fn p(&self) -> f32 {
        self.p
    }
}

#[inline]
pub(crate) fn reduce<I: Iterator<Item = f32>>(p: f32, diffs: I) -> f32 {
    let total = diffs
        .map(|d| d.abs().powf(p))
        .fold(0.0, |acc: f32, d| acc + d);
    total.powf(p.recip())
}

impl Metric for Minkowski {
    #[inline]
    fn dense(&self, x: &[f32], y: &[f32]) -> f32 {
        reduce(self.p, diffs(x, y))
    }

    #[inline]
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32 {
        reduce(self.p, gaps(x, lower, upper))
    }
}

/// L-infinity, the largest absolute coordinate difference
#[derive(Debug, Clone, Copy, Default)]
pub struct Chebyshev {}

#[inline]
fn max_abs<I: Iterator<Item = f32>>(diffs: I) -> f32 {
    diffs.map(|d| d.abs()).fold(0.0, f32::max)
}

impl Metric for Chebyshev {
    #[inline]
    fn dense(&self, x: &[f32], y: &[f32]) -> f32 {
        max_abs(diffs(x, y))
    }

    #[inline]
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32 {
        max_abs(gaps(x, lower, upper))
    }

    #[inline]
    fn norm(&self, x: &[f32]) -> f32 {
        max_abs(x.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_root() {
        let m = Minkowski::new(3.0).unwrap();
        assert_approx_eq!(m.dense(&[0.0, 0.0], &[1.0, 1.0]), 2.0f32.powf(1.0 / 3.0));
    }

    #[test]
    fn large_p_approaches_chebyshev() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 2.5, -2.0];
        let m = Minkowski::new(60.0).unwrap();
        assert!((m.dense(&a, &b) - Chebyshev {}.dense(&a, &b)).abs() < 0.05);
    }

    #[test]
    fn rejects_nonpositive() {
        assert!(Minkowski::new(0.0).is_err());
        assert!(Minkowski::new(f32::INFINITY).is_err());
    }
}
