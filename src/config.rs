//! Run parameters.
//!
//! A run is described by a TOML file whose keys mirror [`RunParameters`]. Parsing is
//! strict: an unknown `similarity_measure`, `processing_method` or `method` value is a
//! [`ConsensusError::Config`] raised before any input is read, so a misconfigured run
//! never creates an exchange directory.
//!
//! ```toml
//! method = "cc_similarity"
//! spreadsheet_name_full_path = "data/expression.tsv"
//! signature_name_full_path = "data/signatures.tsv"
//! similarity_measure = "spearman"
//! processing_method = "parallel"
//! number_of_bootstraps = 20
//! rows_sampling_fraction = 0.8
//! cols_sampling_fraction = 1.0
//! run_directory = "run"
//! results_directory = "results"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{ConsensusError, Result};

/// Column-to-column similarity used by every pipeline.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMeasure {
    #[default]
    Cosine,
    /// Absolute Spearman rank correlation.
    Spearman,
}

impl SimilarityMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMeasure::Cosine => "cosine",
            SimilarityMeasure::Spearman => "spearman",
        }
    }
}

impl fmt::Display for SimilarityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMeasure {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(SimilarityMeasure::Cosine),
            "spearman" => Ok(SimilarityMeasure::Spearman),
            other => Err(ConsensusError::Config(format!(
                "similarity_measure must be one of cosine, spearman; got {:?}",
                other
            ))),
        }
    }
}

/// How bootstrap iterations are dispatched.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMethod {
    #[default]
    Serial,
    Parallel,
    /// Parallel dispatch with the exchange directory on `cluster_shared_volume`.
    Distribute,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::Serial => "serial",
            ProcessingMethod::Parallel => "parallel",
            ProcessingMethod::Distribute => "distribute",
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMethod {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "serial" => Ok(ProcessingMethod::Serial),
            "parallel" => Ok(ProcessingMethod::Parallel),
            "distribute" => Ok(ProcessingMethod::Distribute),
            other => Err(ConsensusError::Config(format!(
                "processing_method must be one of serial, parallel, distribute; got {:?}",
                other
            ))),
        }
    }
}

/// Which pipeline a run file selects.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Similarity,
    CcSimilarity,
    NetSimilarity,
    CcNetSimilarity,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Similarity => "similarity",
            Method::CcSimilarity => "cc_similarity",
            Method::NetSimilarity => "net_similarity",
            Method::CcNetSimilarity => "cc_net_similarity",
        }
    }

    /// Bootstrap consensus methods.
    pub fn is_bootstrap(&self) -> bool {
        matches!(self, Method::CcSimilarity | Method::CcNetSimilarity)
    }

    /// Methods that smooth both inputs over a gene network first.
    pub fn uses_network(&self) -> bool {
        matches!(self, Method::NetSimilarity | Method::CcNetSimilarity)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "similarity" => Ok(Method::Similarity),
            "cc_similarity" => Ok(Method::CcSimilarity),
            "net_similarity" => Ok(Method::NetSimilarity),
            "cc_net_similarity" => Ok(Method::CcNetSimilarity),
            other => Err(ConsensusError::Config(format!("unknown method {:?}", other))),
        }
    }
}

fn default_bootstraps() -> usize {
    1
}

fn default_fraction() -> f64 {
    1.0
}

fn default_run_directory() -> PathBuf {
    PathBuf::from("run")
}

fn default_results_directory() -> PathBuf {
    PathBuf::from("results")
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunParameters {
    #[serde(default)]
    pub method: Method,
    pub spreadsheet_name_full_path: PathBuf,
    pub signature_name_full_path: PathBuf,
    #[serde(default)]
    pub gg_network_name_full_path: Option<PathBuf>,
    #[serde(default)]
    pub similarity_measure: SimilarityMeasure,
    #[serde(default)]
    pub processing_method: ProcessingMethod,
    #[serde(default = "default_bootstraps")]
    pub number_of_bootstraps: usize,
    #[serde(default = "default_fraction")]
    pub rows_sampling_fraction: f64,
    #[serde(default = "default_fraction")]
    pub cols_sampling_fraction: f64,
    /// Upper bound on concurrent workers; defaults to the available cores.
    #[serde(default)]
    pub parallelism: Option<usize>,
    #[serde(default)]
    pub cluster_shared_volume: Option<PathBuf>,
    #[serde(default = "default_run_directory")]
    pub run_directory: PathBuf,
    #[serde(default = "default_results_directory")]
    pub results_directory: PathBuf,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            method: Method::default(),
            spreadsheet_name_full_path: PathBuf::new(),
            signature_name_full_path: PathBuf::new(),
            gg_network_name_full_path: None,
            similarity_measure: SimilarityMeasure::default(),
            processing_method: ProcessingMethod::default(),
            number_of_bootstraps: default_bootstraps(),
            rows_sampling_fraction: default_fraction(),
            cols_sampling_fraction: default_fraction(),
            parallelism: None,
            cluster_shared_volume: None,
            run_directory: default_run_directory(),
            results_directory: default_results_directory(),
        }
    }
}

impl RunParameters {
    /// Parse and validate a TOML run description.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let params: RunParameters =
            toml::from_str(s).map_err(|e| ConsensusError::Config(e.to_string()))?;
        params.validate()?;
        debug!("Parsed run parameters: {:?}", params);
        Ok(params)
    }

    /// Read a run file; relative paths in it stay relative to the working directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading run parameters from {:?}", path);
        let text = fs::read_to_string(path).map_err(|e| ConsensusError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_of_bootstraps == 0 {
            return Err(ConsensusError::Config(
                "number_of_bootstraps must be a positive integer".to_string(),
            ));
        }
        check_fraction("rows_sampling_fraction", self.rows_sampling_fraction)?;
        check_fraction("cols_sampling_fraction", self.cols_sampling_fraction)?;
        if self.parallelism == Some(0) {
            return Err(ConsensusError::Config(
                "parallelism must be at least 1 when set".to_string(),
            ));
        }
        if self.processing_method == ProcessingMethod::Distribute
            && self.cluster_shared_volume.is_none()
        {
            return Err(ConsensusError::Config(
                "processing_method = distribute requires cluster_shared_volume".to_string(),
            ));
        }
        if self.method.uses_network() && self.gg_network_name_full_path.is_none() {
            return Err(ConsensusError::Config(format!(
                "method {} requires gg_network_name_full_path",
                self.method
            )));
        }
        Ok(())
    }
}

pub(crate) fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConsensusError::Config(format!(
            "{} must lie in (0, 1]; got {}",
            name, value
        )))
    }
}
