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

//! The full option surface of both engines, loadable from a yaml file.

use crate::errors::*;
use crate::refine::TerminationPolicy;
use pointcloud::MetricSpec;

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

/// Every knob of the two engines. The builders take the parts they need with their
/// `from_parameters` constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeVisParameters {
    /// The `k` of k-NN
    pub num_neighbors: usize,
    /// How distances are measured
    pub metric: MetricSpec,
    /// Maximum points per tree leaf, for both tree kinds
    pub leaf_capacity: usize,
    /// Trees in the random projection forest
    pub num_trees: usize,
    /// Refinement passes over the candidate graph
    pub iterations: usize,
    /// Cap on the forest candidates per point, unbounded if missing
    pub max_candidates: Option<usize>,
    /// When the refinement stops
    pub termination: TerminationPolicy,
    /// If a point is reported as its own nearest neighbor
    pub include_self: bool,
    /// Seed for the forest, entropy if missing. Also read from `seed`.
    #[serde(alias = "seed")]
    pub rng_seed: Option<u64>,
    /// Above 1 the builders draw progress bars
    pub verbosity: u32,
}

impl Default for LargeVisParameters {
    fn default() -> LargeVisParameters {
        LargeVisParameters {
            num_neighbors: 10,
            metric: MetricSpec::Euclidean,
            leaf_capacity: 16,
            num_trees: 10,
            iterations: 3,
            max_candidates: None,
            termination: TerminationPolicy::Fixed,
            include_self: true,
            rng_seed: None,
            verbosity: 0,
        }
    }
}

fn malformed(file_name: &str, field: &str) -> LargeVisError {
    LargeVisError::ParsingError(ParsingError::MalformedYamlError {
        file_name: file_name.to_string(),
        field: field.to_string(),
    })
}

/// `None` if the key is missing or null
fn read_count(params: &Yaml, field: &str, file_name: &str) -> LargeVisResult<Option<usize>> {
    match &params[field] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(i) if *i >= 0 => Ok(Some(*i as usize)),
        _ => Err(malformed(file_name, field)),
    }
}

impl LargeVisParameters {
    /// Reads the parameters from a yaml file. Missing keys keep their defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> LargeVisResult<LargeVisParameters> {
        let config = read_to_string(&path)?;
        LargeVisParameters::parse_yaml(&config, &path.as_ref().to_string_lossy())
    }

    /// Reads the parameters from a yaml string. Missing keys keep their defaults.
    pub fn from_yaml_str(config: &str) -> LargeVisResult<LargeVisParameters> {
        LargeVisParameters::parse_yaml(config, "<string>")
    }

    fn parse_yaml(config: &str, file_name: &str) -> LargeVisResult<LargeVisParameters> {
        let params_files = YamlLoader::load_from_str(config)?;
        let params = params_files.first().ok_or(LargeVisError::ParsingError(
            ParsingError::RegularParsingError("there is no yaml document"),
        ))?;
        let mut parameters = LargeVisParameters::default();

        if let Some(x) = read_count(params, "num_neighbors", file_name)? {
            parameters.num_neighbors = x;
        }
        if let Some(x) = read_count(params, "leaf_capacity", file_name)? {
            parameters.leaf_capacity = x;
        }
        if let Some(x) = read_count(params, "num_trees", file_name)? {
            parameters.num_trees = x;
        }
        if let Some(x) = read_count(params, "iterations", file_name)? {
            parameters.iterations = x;
        }
        parameters.max_candidates = read_count(params, "max_candidates", file_name)?;
        if let Some(x) = read_count(params, "verbosity", file_name)? {
            parameters.verbosity = x as u32;
        }
        parameters.rng_seed = match read_count(params, "rng_seed", file_name)? {
            Some(x) => Some(x as u64),
            None => read_count(params, "seed", file_name)?.map(|x| x as u64),
        };

        let p = match &params["p"] {
            Yaml::BadValue | Yaml::Null => None,
            Yaml::Real(_) => params["p"].as_f64().map(|p| p as f32),
            Yaml::Integer(i) => Some(*i as f32),
            _ => return Err(malformed(file_name, "p")),
        };
        match &params["metric"] {
            Yaml::BadValue | Yaml::Null => {
                if let Some(p) = p {
                    parameters.metric = MetricSpec::minkowski(p)?;
                }
            }
            Yaml::String(name) => parameters.metric = MetricSpec::from_name(name, p)?,
            _ => return Err(malformed(file_name, "metric")),
        }
        match &params["termination"] {
            Yaml::BadValue | Yaml::Null => {}
            Yaml::String(name) => {
                parameters.termination = TerminationPolicy::from_name(name)
                    .ok_or_else(|| malformed(file_name, "termination"))?
            }
            _ => return Err(malformed(file_name, "termination")),
        }
        match &params["include_self"] {
            Yaml::BadValue | Yaml::Null => {}
            Yaml::Boolean(b) => parameters.include_self = *b,
            _ => return Err(malformed(file_name, "include_self")),
        }
        Ok(parameters)
    }

    /// Checks every value is in range, this is what the fit functions run first.
    pub fn validate(&self) -> LargeVisResult<()> {
        if self.num_neighbors == 0 {
            return Err(LargeVisError::invalid_parameter(
                "num_neighbors",
                "needs to be at least 1",
            ));
        }
        if self.leaf_capacity == 0 {
            return Err(LargeVisError::invalid_parameter(
                "leaf_capacity",
                "a leaf has to hold at least one point",
            ));
        }
        if self.num_trees == 0 {
            return Err(LargeVisError::invalid_parameter(
                "num_trees",
                "the forest needs at least one tree",
            ));
        }
        if let Some(max_candidates) = self.max_candidates {
            if max_candidates < self.num_neighbors {
                return Err(LargeVisError::invalid_parameter(
                    "max_candidates",
                    format!(
                        "{} is fewer than the {} neighbors asked for",
                        max_candidates, self.num_neighbors
                    ),
                ));
            }
        }
        self.metric.validate()?;
        Ok(())
    }
}
