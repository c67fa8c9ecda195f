//! Consensus over persisted bootstrap iterations.
//!
//! Every completed iteration in the exchange store is realigned to the original
//! feature labels, scored with the configured measure and summed. The sum is divided
//! by the *configured* number of bootstraps, not by the number found: a run in which
//! iterations failed yields proportionally smaller mean similarities, and a warning is
//! logged. The mean is then binarized along [`Axis::Rows`].
//!
//! Iterations are scored in parallel and summed in ascending iteration order, so the
//! floating-point result does not depend on scheduling.

use log::{debug, info, warn};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2, MutArray};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::binarize::{binarize, Axis};
use crate::config::{RunParameters, SimilarityMeasure};
use crate::errors::{ConsensusError, Result};
use crate::exchange::{ExchangeStore, Role};
use crate::matrix::LabeledMatrix;
use crate::similarity::compute_similarity;

/// Running element-wise sum of per-iteration similarity matrices.
#[derive(Clone, Debug)]
pub struct ConsensusAccumulator {
    sum: DenseMatrix<f64>,
    observed: usize,
}

impl ConsensusAccumulator {
    pub fn new(n_query_cols: usize, n_reference_cols: usize) -> Self {
        Self {
            sum: DenseMatrix::zeros(n_query_cols, n_reference_cols),
            observed: 0,
        }
    }

    pub fn add(&mut self, similarity: &LabeledMatrix) -> Result<()> {
        let (n_rows, n_cols) = self.sum.shape();
        if similarity.shape() != (n_rows, n_cols) {
            return Err(ConsensusError::Shape(format!(
                "accumulator is {}x{}, similarity is {:?}",
                n_rows,
                n_cols,
                similarity.shape()
            )));
        }
        for i in 0..n_rows {
            for j in 0..n_cols {
                let v = *self.sum.get((i, j)) + similarity.get(i, j);
                self.sum.set((i, j), v);
            }
        }
        self.observed += 1;
        Ok(())
    }

    /// Iterations added so far.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn sum(&self) -> &DenseMatrix<f64> {
        &self.sum
    }

    /// Sum divided by `denominator`.
    pub fn normalized(&self, denominator: usize) -> DenseMatrix<f64> {
        let (n_rows, n_cols) = self.sum.shape();
        let d = denominator.max(1) as f64;
        DenseMatrix::from_iterator(
            (0..n_rows)
                .flat_map(|i| (0..n_cols).map(move |j| (i, j)))
                .map(|(i, j)| *self.sum.get((i, j)) / d),
            n_rows,
            n_cols,
            0,
        )
    }
}

/// Result of a consensus run.
#[derive(Clone, Debug)]
pub struct Consensus {
    /// One-hot consensus, query columns x reference columns.
    pub assignment: LabeledMatrix,
    /// Accumulated similarity over the configured bootstrap count.
    pub mean_similarity: LabeledMatrix,
    /// Completed iterations found in the store.
    pub discovered_iterations: usize,
    /// Discovered iterations that contributed to the sum.
    pub used_iterations: usize,
    /// Discovered iterations left out because their samples shared no feature.
    pub skipped_iterations: Vec<usize>,
}

/// Similarity of one persisted iteration, in the original column order.
/// `Ok(None)` when the two feature samples share no label.
pub fn iteration_similarity(
    original_query: &LabeledMatrix,
    original_reference: &LabeledMatrix,
    measure: SimilarityMeasure,
    iteration: usize,
    store: &dyn ExchangeStore,
) -> Result<Option<LabeledMatrix>> {
    let query = store.get(iteration, Role::Query)?.realign(original_query)?;
    let reference = store.get(iteration, Role::Reference)?.realign(original_reference)?;
    match compute_similarity(&query, &reference, measure) {
        Ok(similarity) => Ok(Some(similarity)),
        Err(ConsensusError::EmptyCommonAxis { .. }) => {
            warn!(
                "Bootstrap iteration {} has no common features between its samples; skipped",
                iteration
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Aggregate all completed iterations in `store` into the consensus assignment.
pub fn aggregate(
    original_query: &LabeledMatrix,
    original_reference: &LabeledMatrix,
    params: &RunParameters,
    store: &dyn ExchangeStore,
) -> Result<Consensus> {
    let completed = store.list_completed()?;
    let configured = params.number_of_bootstraps;
    info!(
        "Aggregating {} completed bootstrap iterations ({} configured)",
        completed.len(),
        configured
    );
    if completed.len() < configured {
        warn!(
            "Only {} of {} bootstrap iterations completed; consensus values are attenuated",
            completed.len(),
            configured
        );
    }

    let similarities: Vec<(usize, Option<LabeledMatrix>)> = completed
        .par_iter()
        .map(|&i| {
            iteration_similarity(
                original_query,
                original_reference,
                params.similarity_measure,
                i,
                store,
            )
            .map(|s| (i, s))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut accumulator =
        ConsensusAccumulator::new(original_query.ncols(), original_reference.ncols());
    let mut skipped_iterations = Vec::new();
    for (i, similarity) in similarities {
        match similarity {
            Some(similarity) => {
                debug!("Adding bootstrap iteration {} to consensus", i);
                accumulator.add(&similarity)?;
            }
            None => skipped_iterations.push(i),
        }
    }

    let mean_similarity = LabeledMatrix::new(
        accumulator.normalized(configured),
        original_query.col_labels().to_vec(),
        original_reference.col_labels().to_vec(),
    )?;
    let assignment = binarize(&mean_similarity, Axis::Rows)?;

    Ok(Consensus {
        assignment,
        mean_similarity,
        discovered_iterations: completed.len(),
        used_iterations: accumulator.observed(),
        skipped_iterations,
    })
}
