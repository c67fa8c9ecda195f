mod test_consensus;
mod test_scheduler;
mod test_worker;

use crate::config::{ProcessingMethod, RunParameters, SimilarityMeasure};

/// Serial cosine consensus with the given bootstrap count and row fraction.
pub fn bootstrap_params(n_bootstraps: usize, rows_fraction: f64) -> RunParameters {
    RunParameters {
        similarity_measure: SimilarityMeasure::Cosine,
        processing_method: ProcessingMethod::Serial,
        number_of_bootstraps: n_bootstraps,
        rows_sampling_fraction: rows_fraction,
        cols_sampling_fraction: 1.0,
        ..RunParameters::default()
    }
}
