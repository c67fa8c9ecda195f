//! One bootstrap iteration: resample both matrices and persist the samples.

use log::debug;

use crate::config::RunParameters;
use crate::errors::Result;
use crate::exchange::{ExchangeStore, Role};
use crate::matrix::LabeledMatrix;
use crate::sampling::{BootstrapSampler, SeededSampler};

/// Draw the query and reference samples of `iteration` and hand them to `store`.
///
/// The generator is seeded with the iteration index alone, so the same iteration
/// always produces the same samples wherever and whenever it runs. The query sample
/// is drawn first, the reference second, from that one generator.
pub fn run_iteration(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    params: &RunParameters,
    iteration: usize,
    store: &dyn ExchangeStore,
) -> Result<()> {
    let mut sampler = SeededSampler::new(iteration as u64);
    let rows_fraction = params.rows_sampling_fraction;
    let cols_fraction = params.cols_sampling_fraction;

    let query_sample = sampler.sample(query, rows_fraction, cols_fraction)?;
    let reference_sample = sampler.sample(reference, rows_fraction, cols_fraction)?;

    // the query artifact marks the iteration complete, so it goes last
    store.put(iteration, Role::Reference, &reference_sample)?;
    store.put(iteration, Role::Query, &query_sample)?;

    debug!(
        "Bootstrap iteration {} persisted: query {:?}, reference {:?}",
        iteration,
        query_sample.shape(),
        reference_sample.shape()
    );
    Ok(())
}
