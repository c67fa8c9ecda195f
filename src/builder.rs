use std::path::PathBuf;

use crate::config::{Method, ProcessingMethod, RunParameters, SimilarityMeasure};
use crate::consensus::Consensus;
use crate::errors::Result;
use crate::exchange::ExchangeStore;
use crate::matrix::LabeledMatrix;
use crate::pipeline::{bootstrap_consensus, consensus_with_store};

// Add logging
use log::{debug, info};

/// Fluent construction of [`RunParameters`] for library callers that hold their
/// matrices in memory instead of describing a run in a TOML file.
pub struct ConsensusBuilder {
    params: RunParameters,
}

impl Default for ConsensusBuilder {
    fn default() -> Self {
        debug!("Creating ConsensusBuilder with default parameters");
        Self {
            params: RunParameters {
                method: Method::CcSimilarity,
                ..RunParameters::default()
            },
        }
    }
}

impl ConsensusBuilder {
    pub fn new() -> Self {
        info!("Initializing new ConsensusBuilder");
        Self::default()
    }

    pub fn with_measure(mut self, measure: SimilarityMeasure) -> Self {
        info!("Setting similarity measure: {}", measure);
        self.params.similarity_measure = measure;
        self
    }

    pub fn with_processing(mut self, method: ProcessingMethod) -> Self {
        info!("Setting processing method: {}", method);
        self.params.processing_method = method;
        self
    }

    pub fn with_bootstraps(mut self, n: usize) -> Self {
        info!("Setting number of bootstraps: {}", n);
        self.params.number_of_bootstraps = n;
        self
    }

    /// Fractions of feature rows kept and of columns left unmasked per sample.
    pub fn with_sampling(mut self, rows_fraction: f64, cols_fraction: f64) -> Self {
        info!(
            "Setting sampling fractions: rows={}, cols={}",
            rows_fraction, cols_fraction
        );
        self.params.rows_sampling_fraction = rows_fraction;
        self.params.cols_sampling_fraction = cols_fraction;
        self
    }

    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.params.parallelism = Some(workers);
        self
    }

    /// Parent of the local exchange directory.
    pub fn with_run_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.params.run_directory = dir.into();
        self
    }

    /// Parent of the exchange directory for `ProcessingMethod::Distribute`.
    pub fn with_shared_volume(mut self, dir: impl Into<PathBuf>) -> Self {
        self.params.cluster_shared_volume = Some(dir.into());
        self
    }

    pub fn with_results_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.params.results_directory = dir.into();
        self
    }

    /// Validated parameters.
    pub fn build(self) -> Result<RunParameters> {
        self.params.validate()?;
        debug!("Built run parameters: {:?}", self.params);
        Ok(self.params)
    }

    /// Consensus through a temporary exchange directory under the run directory.
    pub fn run(self, query: &LabeledMatrix, reference: &LabeledMatrix) -> Result<Consensus> {
        let params = self.build()?;
        bootstrap_consensus(query, reference, &params)
    }

    /// Consensus through a caller-provided store.
    pub fn run_with_store(
        self,
        query: &LabeledMatrix,
        reference: &LabeledMatrix,
        store: &dyn ExchangeStore,
    ) -> Result<Consensus> {
        let params = self.build()?;
        consensus_with_store(query, reference, &params, store)
    }
}
