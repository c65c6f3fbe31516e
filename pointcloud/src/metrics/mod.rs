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

//! Supported distances.
//!
//! Every metric here belongs to the Minkowski family, so the distance from a point to an axis
//! aligned box is just the metric applied to the per-axis gaps. The dense distance and the box
//! distance share one reduction per metric, so the box bound never rounds above a true distance.

use crate::pc_errors::{PointCloudError, PointCloudResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

mod l1;
mod l2;
mod minkowski;

pub use l1::L1;
pub use l2::L2;
pub use minkowski::{Chebyshev, Minkowski};

/// The trait that enables a metric
pub trait Metric: 'static + Send + Sync + Debug + Clone {
    /// Dense calculation
    fn dense(&self, x: &[f32], y: &[f32]) -> f32;
    /// The smallest distance from `x` to any point of the box `[lower, upper]`. Zero when `x`
    /// is inside.
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32;
    /// The norm, `dense(x, 0)`
    fn norm(&self, x: &[f32]) -> f32 {
        let zeros = vec![0.0; x.len()];
        self.dense(x, &zeros)
    }
}

/// How far `v` sits outside of the slab `[lower, upper]`.
#[inline]
pub(crate) fn gap(v: f32, lower: f32, upper: f32) -> f32 {
    if v < lower {
        lower - v
    } else if v > upper {
        v - upper
    } else {
        0.0
    }
}

#[inline]
pub(crate) fn gaps<'a>(
    x: &'a [f32],
    lower: &'a [f32],
    upper: &'a [f32],
) -> impl Iterator<Item = f32> + 'a {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(v, (lo, hi))| gap(*v, *lo, *hi))
}

#[inline]
pub(crate) fn diffs<'a>(x: &'a [f32], y: &'a [f32]) -> impl Iterator<Item = f32> + 'a {
    x.iter().zip(y).map(|(a, b)| a - b)
}

/// Runtime selected metric. This is what the fit functions and the parameter files talk about.
///
/// ```yaml
/// metric: minkowski
/// p: 3.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetricSpec {
    /// Minkowski with p = 2
    Euclidean,
    /// Minkowski with p = 1
    Manhattan,
    /// General exponent, must be positive
    Minkowski {
        /// The exponent
        p: f32,
    },
    /// The p = infinity limit, the largest coordinate difference
    Chebyshev,
}

impl Default for MetricSpec {
    fn default() -> MetricSpec {
        MetricSpec::Euclidean
    }
}

impl MetricSpec {
    /// A checked Minkowski metric. Fails for non-positive or non-finite exponents.
    pub fn minkowski(p: f32) -> PointCloudResult<MetricSpec> {
        Minkowski::new(p).map(|m| MetricSpec::Minkowski { p: m.p() })
    }

    /// Parses the name used in parameter files. `p` is only read for `minkowski`.
    pub fn from_name(name: &str, p: Option<f32>) -> PointCloudResult<MetricSpec> {
        match name.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(MetricSpec::Euclidean),
            "manhattan" | "l1" => Ok(MetricSpec::Manhattan),
            "chebyshev" | "linf" => Ok(MetricSpec::Chebyshev),
            "minkowski" => match p {
                Some(p) => MetricSpec::minkowski(p),
                None => Err(PointCloudError::InvalidMetric {
                    message: "minkowski needs an exponent p".to_string(),
                }),
            },
            other => Err(PointCloudError::InvalidMetric {
                message: format!("unknown metric {:?}", other),
            }),
        }
    }

    /// Checks a metric that didn't come through a checked constructor, like a deserialized one.
    pub fn validate(&self) -> PointCloudResult<()> {
        match self {
            MetricSpec::Minkowski { p } => Minkowski::new(*p).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl Metric for MetricSpec {
    #[inline]
    fn dense(&self, x: &[f32], y: &[f32]) -> f32 {
        match self {
            MetricSpec::Euclidean => L2 {}.dense(x, y),
            MetricSpec::Manhattan => L1 {}.dense(x, y),
            MetricSpec::Minkowski { p } => minkowski::reduce(*p, diffs(x, y)),
            MetricSpec::Chebyshev => Chebyshev {}.dense(x, y),
        }
    }

    #[inline]
    fn box_distance(&self, x: &[f32], lower: &[f32], upper: &[f32]) -> f32 {
        match self {
            MetricSpec::Euclidean => L2 {}.box_distance(x, lower, upper),
            MetricSpec::Manhattan => L1 {}.box_distance(x, lower, upper),
            MetricSpec::Minkowski { p } => minkowski::reduce(*p, gaps(x, lower, upper)),
            MetricSpec::Chebyshev => Chebyshev {}.box_distance(x, lower, upper),
        }
    }
}
