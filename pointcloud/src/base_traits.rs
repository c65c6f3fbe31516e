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

use rayon::prelude::*;
use std::cmp::min;
use std::fmt::Debug;

use crate::metrics::Metric;
use crate::pc_errors::*;
use crate::PointIndex;

#[inline]
fn chunk(data_dim: usize) -> usize {
    min(15000 / data_dim.max(1), 20)
}

/// Base trait for a point cloud
pub trait PointCloud: Debug + Send + Sync + 'static {
    /// Underlying metric this point cloud uses
    type Metric: Metric;

    /// The number of samples this cloud covers
    fn len(&self) -> usize;
    /// If this is empty
    fn is_empty(&self) -> bool;
    /// The dimension of the underlying data
    fn dim(&self) -> usize;
    /// The metric distances are measured with
    fn metric(&self) -> &Self::Metric;
    /// Indexes used for access
    fn reference_indexes(&self) -> Vec<PointIndex>;
    /// Gets a point from this dataset
    fn point(&self, pn: PointIndex) -> PointCloudResult<&[f32]>;

    /// Distance between two points of the cloud.
    fn distance(&self, i: PointIndex, j: PointIndex) -> PointCloudResult<f32> {
        Ok(self.metric().dense(self.point(i)?, self.point(j)?))
    }

    /// Checks that an outside point can be compared against this cloud: same width, all finite.
    fn check_point(&self, point: &[f32]) -> PointCloudResult<()> {
        if point.len() != self.dim() {
            return Err(PointCloudError::width(self.dim(), point.len()));
        }
        match point.iter().position(|v| !v.is_finite()) {
            Some(column) => Err(PointCloudError::NonFiniteValue { row: 0, column }),
            None => Ok(()),
        }
    }

    /// The distances from one of our points to a list of others. This paralizes if there are enough points.
    fn distances_to_point_index(
        &self,
        i: PointIndex,
        indexes: &[PointIndex],
    ) -> PointCloudResult<Vec<f32>> {
        self.distances_to_point(self.point(i)?, indexes)
    }

    /// The main distance function. This paralizes if there are enough points.
    fn distances_to_point(
        &self,
        point: &[f32],
        indexes: &[PointIndex],
    ) -> PointCloudResult<Vec<f32>> {
        let chunk = chunk(self.dim());
        let metric = self.metric();
        if indexes.len() > chunk * 3 {
            indexes
                .par_chunks(chunk)
                .map(|chunk_indexes| {
                    chunk_indexes
                        .iter()
                        .map(|i| self.point(*i).map(|y| metric.dense(point, y)))
                        .collect::<PointCloudResult<Vec<f32>>>()
                })
                .collect::<PointCloudResult<Vec<Vec<f32>>>>()
                .map(|chunks| chunks.concat())
        } else {
            indexes
                .iter()
                .map(|i| self.point(*i).map(|y| metric.dense(point, y)))
                .collect()
        }
    }
}
