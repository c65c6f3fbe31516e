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

//! The errors that can occur when a point cloud is built or read from.
use std::error::Error;
use std::fmt;

///
pub type PointCloudResult<T> = Result<T, PointCloudError>;

/// Error type for the Point cloud
#[derive(Debug, Clone, PartialEq)]
pub enum PointCloudError {
    /// Unable to retrieve some data point (given by index) from a data source (slice name)
    DataAccessError {
        /// Index of access error
        index: usize,
        /// Data source that had the access error
        slice_name: String,
    },
    /// There are no points to build on
    EmptyDataset,
    /// A row or query has a different width than the cloud
    DimensionMismatch {
        /// The dimension the cloud was built with
        expected: usize,
        /// The width that was handed in
        found: usize,
        /// The offending row, if we know it
        row: Option<usize>,
    },
    /// A NaN or an infinity snuck into the data
    NonFiniteValue {
        /// Row of the bad value
        row: usize,
        /// Column of the bad value
        column: usize,
    },
    /// The metric parameters don't describe a metric
    InvalidMetric {
        /// What was wrong with it
        message: String,
    },
}

impl fmt::Display for PointCloudError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PointCloudError::DataAccessError { index, slice_name } => write!(
                f,
                "there was an issue grabbing point {} from {}",
                index, slice_name
            ),
            PointCloudError::EmptyDataset => write!(f, "the dataset has no points"),
            PointCloudError::DimensionMismatch {
                expected,
                found,
                row: Some(row),
            } => write!(
                f,
                "row {} has {} columns, but the cloud has dimension {}",
                row, found, expected
            ),
            PointCloudError::DimensionMismatch {
                expected,
                found,
                row: None,
            } => write!(
                f,
                "got width {}, but the cloud has dimension {}",
                found, expected
            ),
            PointCloudError::NonFiniteValue { row, column } => write!(
                f,
                "non-finite value at row {}, column {}",
                row, column
            ),
            PointCloudError::InvalidMetric { message } => write!(f, "invalid metric: {}", message),
        }
    }
}

impl Error for PointCloudError {}

impl PointCloudError {
    /// If we can't get an element from a loaded data source, gives the i and source name
    pub fn data_access(index: usize, slice_name: String) -> PointCloudError {
        PointCloudError::DataAccessError { index, slice_name }
    }

    /// A query (not tied to a row of the cloud) had the wrong width
    pub fn width(expected: usize, found: usize) -> PointCloudError {
        PointCloudError::DimensionMismatch {
            expected,
            found,
            row: None,
        }
    }

    /// A row of the input had the wrong width
    pub fn row_width(expected: usize, found: usize, row: usize) -> PointCloudError {
        PointCloudError::DimensionMismatch {
            expected,
            found,
            row: Some(row),
        }
    }
}
