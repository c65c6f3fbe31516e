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
//! # Point Cloud
//! Read-only access to a dense `N x M` dataset, together with the metrics the neighbor
//! indexes measure it with. Points are only ever addressed by their row index.
//!
//! The data is checked once on the way in (non-empty, rectangular, finite) so the index
//! builders downstream never have to think about NaNs wrecking a median split.

#![warn(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod pc_errors;
pub mod metrics;
pub mod data_sources;

mod base_traits;
#[doc(inline)]
pub use base_traits::*;

#[doc(inline)]
pub use metrics::{Chebyshev, Metric, MetricSpec, Minkowski, L1, L2};

use data_sources::DataRam;

/// A sensible default cloud, runtime selected metric.
pub type DefaultCloud = DataRam<MetricSpec>;

/// To make things more obvious, we type the point index.
/// This is the row of the point in the matrix the cloud was built from.
pub type PointIndex = usize;
