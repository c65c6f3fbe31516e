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

//! Ram allocated data.

use crate::base_traits::*;
use crate::metrics::*;
use crate::pc_errors::{PointCloudError, PointCloudResult};
use crate::PointIndex;
use log::debug;
use ndarray::ArrayView2;

/// The data stored in ram, row major.
#[derive(Debug, Clone)]
pub struct DataRam<M = L2> {
    name: String,
    data: Vec<f32>,
    dim: usize,
    metric: M,
}

impl<M: Metric> DataRam<M> {
    /// Consumes your row major buffer and dimension and gives a dimensioned cloud.
    ///
    /// Fails if there are no points (or no columns), if the buffer isn't a whole number of
    /// rows, or if anything in it is NaN or infinite.
    pub fn new(data: Vec<f32>, dim: usize, metric: M) -> PointCloudResult<DataRam<M>> {
        if data.is_empty() || dim == 0 {
            return Err(PointCloudError::EmptyDataset);
        }
        if data.len() % dim != 0 {
            return Err(PointCloudError::row_width(
                dim,
                data.len() % dim,
                data.len() / dim,
            ));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(PointCloudError::NonFiniteValue {
                row: pos / dim,
                column: pos % dim,
            });
        }
        debug!("Loaded {} points of dimension {}", data.len() / dim, dim);
        Ok(DataRam {
            name: "RAM".to_string(),
            data,
            dim,
            metric,
        })
    }

    /// Builds a cloud out of a list of rows. The first row sets the dimension.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R], metric: M) -> PointCloudResult<DataRam<M>> {
        let dim = match rows.first() {
            Some(row) => row.as_ref().len(),
            None => return Err(PointCloudError::EmptyDataset),
        };
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(PointCloudError::row_width(dim, row.len(), i));
            }
            data.extend_from_slice(row);
        }
        DataRam::new(data, dim, metric)
    }

    /// Copies an `N x M` matrix into ram, whatever its memory layout.
    pub fn from_array(matrix: ArrayView2<f32>, metric: M) -> PointCloudResult<DataRam<M>> {
        let (count, dim) = matrix.dim();
        if count == 0 || dim == 0 {
            return Err(PointCloudError::EmptyDataset);
        }
        DataRam::new(matrix.iter().cloned().collect(), dim, metric)
    }

    /// Names the cloud, this shows up in access errors.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// The raw row major buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..]
    }
}

impl<M: Metric> PointCloud for DataRam<M> {
    type Metric = M;

    #[inline]
    fn dim(&self) -> usize {
        self.dim
    }
    #[inline]
    fn len(&self) -> usize {
        self.data.len() / self.dim
    }
    #[inline]
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    #[inline]
    fn metric(&self) -> &M {
        &self.metric
    }
    #[inline]
    fn reference_indexes(&self) -> Vec<PointIndex> {
        (0..self.len()).collect()
    }
    #[inline]
    fn point(&self, i: PointIndex) -> PointCloudResult<&[f32]> {
        match self.data.get(self.dim * i..(self.dim * i + self.dim)) {
            None => Err(PointCloudError::data_access(i, self.name.clone())),
            Some(x) => Ok(x),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use ndarray::Array2;
    use std::iter;

    pub fn build_ram_random_test(count: usize, data_dim: usize) -> DataRam<L2> {
        DataRam::new(
            (0..count * data_dim)
                .map(|_i| rand::random::<f32>())
                .collect(),
            data_dim,
            L2 {},
        )
        .unwrap()
    }

    pub fn build_ram_fixed_test(count: usize, data_dim: usize) -> DataRam<L2> {
        DataRam::new(
            (0..count)
                .flat_map(|i| iter::repeat(i as f32).take(data_dim))
                .collect(),
            data_dim,
            L2 {},
        )
        .unwrap()
    }

    #[test]
    fn point_correct() {
        let pc = build_ram_fixed_test(5, 5).with_name("fixed");

        let point = pc.point(1).unwrap();
        for d in point.iter() {
            assert_approx_eq!(1.0, *d);
        }
        assert_eq!(
            pc.point(5).unwrap_err(),
            PointCloudError::data_access(5, "fixed".to_string())
        );
    }

    #[test]
    fn distance_correct() {
        let pc = build_ram_fixed_test(5, 4);
        let indexes = [1, 2, 3, 4];
        let dists = pc.distances_to_point_index(0, &indexes).unwrap();
        for (i, d) in indexes.iter().zip(dists) {
            assert_approx_eq!(*i as f32 * 2.0, d);
        }
        assert_approx_eq!(pc.distance(4, 2).unwrap(), 4.0);
    }

    #[test]
    fn parallel_distances_match_serial() {
        let pc = build_ram_random_test(500, 3);
        let indexes = pc.reference_indexes();
        let point = pc.point(17).unwrap();
        let dists = pc.distances_to_point(point, &indexes).unwrap();
        assert_eq!(dists.len(), 500);
        for (i, d) in indexes.iter().zip(dists) {
            assert_eq!(d, pc.distance(17, *i).unwrap());
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            DataRam::new(vec![], 3, L2 {}).unwrap_err(),
            PointCloudError::EmptyDataset
        );
        assert_eq!(
            DataRam::from_rows(&[vec![0.0, 1.0], vec![2.0]], L2 {}).unwrap_err(),
            PointCloudError::row_width(2, 1, 1)
        );
        assert_eq!(
            DataRam::new(vec![0.0, 1.0, f32::NAN, 3.0], 2, L2 {}).unwrap_err(),
            PointCloudError::NonFiniteValue { row: 1, column: 0 }
        );
        let empty: Vec<Vec<f32>> = Vec::new();
        assert_eq!(
            DataRam::from_rows(&empty, L2 {}).unwrap_err(),
            PointCloudError::EmptyDataset
        );
    }

    #[test]
    fn array_layout_does_not_matter() {
        let matrix = Array2::from_shape_vec((3, 2), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let transposed = matrix.t().to_owned();
        let pc = DataRam::from_array(transposed.t(), L2 {}).unwrap();
        assert_eq!(pc.len(), 3);
        assert_eq!(pc.point(2).unwrap(), &[4.0, 5.0]);
    }

    #[test]
    fn query_checks() {
        let pc = build_ram_fixed_test(3, 2);
        assert!(pc.check_point(&[0.0, 1.0]).is_ok());
        assert_eq!(
            pc.check_point(&[0.0]).unwrap_err(),
            PointCloudError::width(2, 1)
        );
        assert!(pc.check_point(&[0.0, f32::INFINITY]).is_err());
    }
}
