//! Bootstrap resampling along the feature axis.
//!
//! A sample keeps `row_fraction * rows` feature rows (rounded half to even), chosen as
//! the prefix of a random permutation, and every column. Of those columns,
//! `col_fraction * cols` (same rounding) keep their values and the rest are zeroed.
//! The retained row positions are returned in permutation order so a reduced matrix
//! can be realigned to the original labels.
//!
//! Counts are clamped to at least one so tiny inputs never produce an empty sample.
//!
//! `rows_sampling_fraction` always applies to the feature (gene) axis here. KnowEnG run
//! files sampled a transposed matrix, so there the gene count came from
//! `cols_sampling_fraction`; swap the two values when reusing such a run file.
//!
//! **DETERMINISTIC**: a [`SeededSampler`] built from the same seed draws the same
//! samples, in any thread and in any order relative to other samplers.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::check_fraction;
use crate::errors::{ConsensusError, Result};
use crate::matrix::LabeledMatrix;

/// A feature-reduced copy of a matrix and the original rows it kept.
#[derive(Clone, Debug)]
pub struct BootstrapSample {
    pub values: DenseMatrix<f64>,
    pub retained_rows: Vec<usize>,
}

impl BootstrapSample {
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Relabel against the matrix the sample was drawn from: rows take the original
    /// labels at the retained positions, columns keep the original labels.
    pub fn realign(&self, original: &LabeledMatrix) -> Result<LabeledMatrix> {
        let (n_rows, n_cols) = self.values.shape();
        if n_rows != self.retained_rows.len() || n_cols != original.ncols() {
            return Err(ConsensusError::Shape(format!(
                "sample is {}x{} with {} retained rows; original has {} columns",
                n_rows,
                n_cols,
                self.retained_rows.len(),
                original.ncols()
            )));
        }
        let labels = self
            .retained_rows
            .iter()
            .map(|&i| {
                original.row_labels().get(i).cloned().ok_or_else(|| {
                    ConsensusError::Shape(format!(
                        "retained row {} out of range for {} original rows",
                        i,
                        original.nrows()
                    ))
                })
            })
            .collect::<Result<Vec<String>>>()?;
        LabeledMatrix::new(self.values.clone(), labels, original.col_labels().to_vec())
    }

    pub(crate) fn to_persisted(&self) -> (PersistedValues, Vec<u64>) {
        let (nrows, ncols) = self.values.shape();
        let values = (0..nrows)
            .flat_map(|i| (0..ncols).map(move |j| (i, j)))
            .map(|(i, j)| *self.values.get((i, j)))
            .collect();
        let retained = self.retained_rows.iter().map(|&i| i as u64).collect();
        (
            PersistedValues {
                nrows,
                ncols,
                values,
            },
            retained,
        )
    }

    pub(crate) fn from_persisted(values: PersistedValues, retained: Vec<u64>) -> Result<Self> {
        if values.nrows * values.ncols != values.values.len() || values.nrows == 0 || values.ncols == 0 {
            return Err(ConsensusError::Shape(format!(
                "persisted matrix claims {}x{} but holds {} values",
                values.nrows,
                values.ncols,
                values.values.len()
            )));
        }
        Ok(Self {
            values: DenseMatrix::from_iterator(values.values.into_iter(), values.nrows, values.ncols, 0),
            retained_rows: retained.into_iter().map(|i| i as usize).collect(),
        })
    }
}

/// Row-major dump of a reduced matrix.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct PersistedValues {
    pub nrows: usize,
    pub ncols: usize,
    pub values: Vec<f64>,
}

/// Draws bootstrap samples from a matrix.
pub trait BootstrapSampler {
    fn sample(
        &mut self,
        matrix: &LabeledMatrix,
        row_fraction: f64,
        col_fraction: f64,
    ) -> Result<BootstrapSample>;
}

/// Sampler owning its generator; one per bootstrap iteration.
pub struct SeededSampler {
    rng: ChaCha8Rng,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        trace!("Seeding sampler with {}", seed);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl BootstrapSampler for SeededSampler {
    fn sample(
        &mut self,
        matrix: &LabeledMatrix,
        row_fraction: f64,
        col_fraction: f64,
    ) -> Result<BootstrapSample> {
        sample_feature_rows(matrix, row_fraction, col_fraction, &mut self.rng)
    }
}

/// `fraction * total` rounded half to even, at least 1 and at most `total`.
pub fn retained_count(total: usize, fraction: f64) -> usize {
    ((fraction * total as f64).round_ties_even() as usize).clamp(1, total.max(1))
}

/// Resample the feature rows of `matrix` and mask unselected columns.
pub fn sample_feature_rows<R: Rng + ?Sized>(
    matrix: &LabeledMatrix,
    row_fraction: f64,
    col_fraction: f64,
    rng: &mut R,
) -> Result<BootstrapSample> {
    check_fraction("rows_sampling_fraction", row_fraction)?;
    check_fraction("cols_sampling_fraction", col_fraction)?;
    let (n_rows, n_cols) = matrix.shape();

    let mut row_permutation: Vec<usize> = (0..n_rows).collect();
    row_permutation.shuffle(rng);
    row_permutation.truncate(retained_count(n_rows, row_fraction));

    let mut col_permutation: Vec<usize> = (0..n_cols).collect();
    col_permutation.shuffle(rng);
    let mut kept_cols = vec![false; n_cols];
    for &j in &col_permutation[..retained_count(n_cols, col_fraction)] {
        kept_cols[j] = true;
    }

    debug!(
        "Sampled {} of {} feature rows, {} of {} columns unmasked",
        row_permutation.len(),
        n_rows,
        kept_cols.iter().filter(|&&k| k).count(),
        n_cols
    );

    let values = DenseMatrix::from_iterator(
        row_permutation
            .iter()
            .flat_map(|&i| (0..n_cols).map(move |j| (i, j)))
            .map(|(i, j)| if kept_cols[j] { matrix.get(i, j) } else { 0.0 }),
        row_permutation.len(),
        n_cols,
        0,
    );

    Ok(BootstrapSample {
        values,
        retained_rows: row_permutation,
    })
}
