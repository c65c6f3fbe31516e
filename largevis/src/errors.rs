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

//! The errors that can occor when an index is configured, built or queried.
//! Most data errors are floated up from `PointCloud` as that's where the input gets checked.

use pointcloud::pc_errors::PointCloudError;
use std::error::Error;
use std::fmt;
use std::io;
use yaml_rust::ScanError;

/// Helper type for a call that could go wrong.
pub type LargeVisResult<T> = Result<T, LargeVisError>;

/// Error type for the neighbor indexes. Mostly this is a wrapper around `PointCloudError`, as the
/// data i/o is where most errors happen.
#[derive(Debug)]
pub enum LargeVisError {
    /// Empty data, ragged rows, non-finite values and bad metrics all come from here.
    PointCloudError(PointCloudError),
    /// The number of neighbors asked for is 0, or more than there are points.
    InvalidK {
        /// The requested k
        k: usize,
        /// Number of points available
        len: usize,
    },
    /// A construction parameter is out of range
    InvalidParameter {
        /// Which parameter
        name: &'static str,
        /// What's wrong with it
        message: String,
    },
    /// IO error when opening parameter files
    IoError(io::Error),
    /// Parsing error when reading a parameter file
    ParsingError(ParsingError),
}

impl fmt::Display for LargeVisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LargeVisError::PointCloudError(ref e) => write!(f, "{}", e),
            LargeVisError::InvalidK { k, len } => write!(
                f,
                "asked for {} neighbors, need at least 1 and at most the {} points available",
                k, len
            ),
            LargeVisError::InvalidParameter { name, ref message } => {
                write!(f, "invalid {}: {}", name, message)
            }
            LargeVisError::IoError(ref e) => write!(f, "{}", e),
            LargeVisError::ParsingError(ref e) => write!(f, "{}", e),
        }
    }
}

impl Error for LargeVisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            LargeVisError::PointCloudError(ref e) => Some(e),
            LargeVisError::IoError(ref e) => Some(e),
            LargeVisError::ParsingError(ref e) => Some(e),
            LargeVisError::InvalidK { .. } => None,
            LargeVisError::InvalidParameter { .. } => None,
        }
    }
}

impl From<PointCloudError> for LargeVisError {
    fn from(err: PointCloudError) -> Self {
        LargeVisError::PointCloudError(err)
    }
}

impl From<io::Error> for LargeVisError {
    fn from(err: io::Error) -> Self {
        LargeVisError::IoError(err)
    }
}

impl From<ScanError> for LargeVisError {
    fn from(err: ScanError) -> Self {
        LargeVisError::ParsingError(ParsingError::YamlScanError(err))
    }
}

impl From<LargeVisError> for io::Error {
    fn from(err: LargeVisError) -> Self {
        match err {
            LargeVisError::IoError(e) => e,
            e => io::Error::new(io::ErrorKind::Other, Box::new(e)),
        }
    }
}

impl LargeVisError {
    pub(crate) fn invalid_parameter<S: Into<String>>(name: &'static str, message: S) -> Self {
        LargeVisError::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Checks `1 <= k <= len`.
    pub(crate) fn check_k(k: usize, len: usize) -> LargeVisResult<()> {
        if k == 0 || k > len {
            Err(LargeVisError::InvalidK { k, len })
        } else {
            Ok(())
        }
    }
}

/// A parsing error occored while reading a parameter file
#[derive(Debug)]
pub enum ParsingError {
    /// Yaml was messed up
    MalformedYamlError {
        /// The file that was messed up
        file_name: String,
        /// The value that was messed up
        field: String,
    },
    /// The yaml scanner gave up
    YamlScanError(ScanError),
    /// The file had no yaml document in it
    RegularParsingError(&'static str),
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParsingError::MalformedYamlError {
                ref file_name,
                ref field,
            } => write!(f, "there is a error reading {} in {}", field, file_name),
            ParsingError::YamlScanError(ref e) => write!(f, "{}", e),
            ParsingError::RegularParsingError(e) => write!(f, "Error parsing a string: {}", e),
        }
    }
}

impl Error for ParsingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ParsingError::YamlScanError(ref e) => Some(e),
            _ => None,
        }
    }
}
