//! End-to-end runs selected by [`Method`].
//!
//! | method | steps |
//! |--------|-------|
//! | `similarity` | load, similarity, binarize, write |
//! | `cc_similarity` | load, bootstrap dispatch, consensus, write |
//! | `net_similarity` | load, network smoothing, similarity, binarize, write |
//! | `cc_net_similarity` | load, network smoothing, bootstrap dispatch, consensus, write |
//!
//! Single-pass methods write the one-hot assignment as `result_*` and the raw
//! similarity as `similarity_*`. Consensus methods write the assignment as `result_*`
//! and the attenuated mean similarity as `consensus_*`.

use std::path::PathBuf;

use log::{info, warn};

use crate::binarize::{binarize, Axis};
use crate::config::{Method, RunParameters, SimilarityMeasure};
use crate::consensus::{aggregate, Consensus};
use crate::errors::{ConsensusError, Result};
use crate::exchange::ExchangeStore;
use crate::io::{output_file_name, read_network, read_spreadsheet, save_result, write_matrix};
use crate::matrix::LabeledMatrix;
use crate::network::{GeneNetwork, NetworkSmoother};
use crate::scheduler::{prepare_exchange, run_all};
use crate::similarity::compute_similarity;

/// Similarity and its one-hot assignment, without resampling.
pub fn similarity_assignment(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    measure: SimilarityMeasure,
) -> Result<(LabeledMatrix, LabeledMatrix)> {
    let similarity = compute_similarity(query, reference, measure)?;
    let assignment = binarize(&similarity, Axis::Rows)?;
    Ok((similarity, assignment))
}

/// Dispatch every bootstrap iteration into `store`, then aggregate it.
pub fn consensus_with_store(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    params: &RunParameters,
    store: &dyn ExchangeStore,
) -> Result<Consensus> {
    params.validate()?;
    if query.common_row_labels(reference).is_empty() {
        return Err(ConsensusError::EmptyCommonAxis {
            query_rows: query.nrows(),
            reference_rows: reference.nrows(),
        });
    }
    let report = run_all(query, reference, params, store)?;
    if !report.is_complete() {
        warn!(
            "{} bootstrap iterations failed and are left out of the consensus",
            report.failed.len()
        );
    }
    aggregate(query, reference, params, store)
}

/// Bootstrap consensus through a run-unique exchange directory, removed afterwards.
/// A failed removal is logged and does not replace the consensus.
pub fn bootstrap_consensus(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    params: &RunParameters,
) -> Result<Consensus> {
    params.validate()?;
    let store = prepare_exchange(params)?;
    let outcome = consensus_with_store(query, reference, params, &store);
    let exchange_path = store.path().to_path_buf();
    if let Err(e) = store.remove() {
        warn!("Could not remove exchange directory {:?}: {}", exchange_path, e);
    }
    outcome
}

/// Reindex both spreadsheets onto the network and smooth them.
pub fn smooth_inputs(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    network: &GeneNetwork,
    smoother: &dyn NetworkSmoother,
) -> Result<(LabeledMatrix, LabeledMatrix)> {
    let normalized = network.normalized();
    let query = smoother.smooth(&normalized.align(query)?, &normalized)?;
    let reference = smoother.smooth(&normalized.align(reference)?, &normalized)?;
    Ok((query, reference))
}

fn load_inputs(params: &RunParameters) -> Result<(LabeledMatrix, LabeledMatrix)> {
    let query = read_spreadsheet(&params.spreadsheet_name_full_path)?;
    let reference = read_spreadsheet(&params.signature_name_full_path)?;
    Ok((query, reference))
}

fn load_smoothed_inputs(
    params: &RunParameters,
    smoother: &dyn NetworkSmoother,
) -> Result<(LabeledMatrix, LabeledMatrix)> {
    let network_path = params.gg_network_name_full_path.as_ref().ok_or_else(|| {
        ConsensusError::Config(format!(
            "method {} requires gg_network_name_full_path",
            params.method
        ))
    })?;
    let (query, reference) = load_inputs(params)?;
    let network = read_network(network_path)?;
    smooth_inputs(&query, &reference, &network, smoother)
}

fn write_single_pass(
    similarity: &LabeledMatrix,
    assignment: &LabeledMatrix,
    params: &RunParameters,
) -> Result<Vec<PathBuf>> {
    let result = save_result(assignment, params)?;
    let raw = output_file_name(params, "similarity", "viz", "tsv");
    write_matrix(similarity, &raw)?;
    Ok(vec![result, raw])
}

fn write_consensus(consensus: &Consensus, params: &RunParameters) -> Result<Vec<PathBuf>> {
    let result = save_result(&consensus.assignment, params)?;
    let mean = output_file_name(params, "consensus", "viz", "tsv");
    write_matrix(&consensus.mean_similarity, &mean)?;
    Ok(vec![result, mean])
}

pub fn run_similarity(params: &RunParameters) -> Result<Vec<PathBuf>> {
    let (query, reference) = load_inputs(params)?;
    let (similarity, assignment) =
        similarity_assignment(&query, &reference, params.similarity_measure)?;
    write_single_pass(&similarity, &assignment, params)
}

pub fn run_cc_similarity(params: &RunParameters) -> Result<Vec<PathBuf>> {
    let (query, reference) = load_inputs(params)?;
    let consensus = bootstrap_consensus(&query, &reference, params)?;
    write_consensus(&consensus, params)
}

pub fn run_net_similarity(
    params: &RunParameters,
    smoother: &dyn NetworkSmoother,
) -> Result<Vec<PathBuf>> {
    let (query, reference) = load_smoothed_inputs(params, smoother)?;
    let (similarity, assignment) =
        similarity_assignment(&query, &reference, params.similarity_measure)?;
    write_single_pass(&similarity, &assignment, params)
}

pub fn run_cc_net_similarity(
    params: &RunParameters,
    smoother: &dyn NetworkSmoother,
) -> Result<Vec<PathBuf>> {
    let (query, reference) = load_smoothed_inputs(params, smoother)?;
    let consensus = bootstrap_consensus(&query, &reference, params)?;
    write_consensus(&consensus, params)
}

/// Run the pipeline named by `params.method`. Network methods need a smoother.
pub fn run(
    params: &RunParameters,
    smoother: Option<&dyn NetworkSmoother>,
) -> Result<Vec<PathBuf>> {
    params.validate()?;
    info!(
        "Running {} with {} similarity ({} processing)",
        params.method, params.similarity_measure, params.processing_method
    );
    match (params.method, smoother) {
        (Method::Similarity, _) => run_similarity(params),
        (Method::CcSimilarity, _) => run_cc_similarity(params),
        (Method::NetSimilarity, Some(s)) => run_net_similarity(params, s),
        (Method::CcNetSimilarity, Some(s)) => run_cc_net_similarity(params, s),
        (method, None) => Err(ConsensusError::Config(format!(
            "method {} needs a network smoother",
            method
        ))),
    }
}
