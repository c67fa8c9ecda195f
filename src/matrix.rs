//! `LabeledMatrix`: a dense `f64` matrix with ordered row and column labels.
//!
//! Rows are the feature axis (gene identifiers), columns the sample or signature axis.
//! Two matrices are only comparable after both are restricted to their common row
//! labels; [`LabeledMatrix::common_row_labels`] computes that intersection in the row
//! order of `self`, each label once.
//!
//! Row labels may repeat inside one matrix (spreadsheets merged from several sources).
//! Every lookup by label resolves to the first row carrying it.
//!
//! # Panics
//!
//! - `get` panics on out-of-bounds indices, as `DenseMatrix::get` does.

use std::collections::{HashMap, HashSet};

use log::trace;
use smartcore::linalg::basic::arrays::{Array, Array2, MutArray};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{ConsensusError, Result};

#[derive(Clone, Debug)]
pub struct LabeledMatrix {
    data: DenseMatrix<f64>,
    row_labels: Vec<String>,
    col_labels: Vec<String>,
}

impl LabeledMatrix {
    pub fn new(
        data: DenseMatrix<f64>,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
    ) -> Result<Self> {
        let (n_rows, n_cols) = data.shape();
        if n_rows != row_labels.len() || n_cols != col_labels.len() {
            return Err(ConsensusError::Shape(format!(
                "data is {}x{} but {} row labels and {} column labels were given",
                n_rows,
                n_cols,
                row_labels.len(),
                col_labels.len()
            )));
        }
        Ok(Self {
            data,
            row_labels,
            col_labels,
        })
    }

    /// Build from row-major values.
    pub fn from_rows(
        rows: &[Vec<f64>],
        row_labels: Vec<String>,
        col_labels: Vec<String>,
    ) -> Result<Self> {
        check_non_empty(row_labels.len(), col_labels.len())?;
        if rows.len() != row_labels.len() {
            return Err(ConsensusError::Shape(format!(
                "{} rows of values for {} row labels",
                rows.len(),
                row_labels.len()
            )));
        }
        if let Some((i, r)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != col_labels.len())
        {
            return Err(ConsensusError::Shape(format!(
                "row {} has {} values, expected {}",
                i,
                r.len(),
                col_labels.len()
            )));
        }
        let data = DenseMatrix::from_iterator(
            rows.iter().flatten().copied(),
            row_labels.len(),
            col_labels.len(),
            0,
        );
        Self::new(data, row_labels, col_labels)
    }

    /// Build by evaluating `f(row, col)` for every cell.
    pub fn from_fn<F>(row_labels: Vec<String>, col_labels: Vec<String>, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        check_non_empty(row_labels.len(), col_labels.len())?;
        let (n_rows, n_cols) = (row_labels.len(), col_labels.len());
        let data = DenseMatrix::from_iterator(
            (0..n_rows).flat_map(|i| (0..n_cols).map(move |j| (i, j))).map(|(i, j)| f(i, j)),
            n_rows,
            n_cols,
            0,
        );
        Self::new(data, row_labels, col_labels)
    }

    pub fn zeros(row_labels: Vec<String>, col_labels: Vec<String>) -> Result<Self> {
        check_non_empty(row_labels.len(), col_labels.len())?;
        let data = DenseMatrix::zeros(row_labels.len(), col_labels.len());
        Self::new(data, row_labels, col_labels)
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn nrows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn ncols(&self) -> usize {
        self.col_labels.len()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        *self.data.get((row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data.set((row, col), value);
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols()).map(|j| self.get(row, j)).collect()
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.nrows()).map(|i| self.get(i, col)).collect()
    }

    /// All columns as owned vectors over the row axis.
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.ncols()).map(|j| self.column(j)).collect()
    }

    /// Sum of every cell.
    pub fn total(&self) -> f64 {
        (0..self.nrows())
            .map(|i| (0..self.ncols()).map(|j| self.get(i, j)).sum::<f64>())
            .sum()
    }

    /// First position of every row label.
    pub fn row_positions(&self) -> HashMap<&str, usize> {
        let mut positions = HashMap::with_capacity(self.row_labels.len());
        for (i, label) in self.row_labels.iter().enumerate() {
            positions.entry(label.as_str()).or_insert(i);
        }
        positions
    }

    /// Rows at `indices`, in that order; labels follow their rows.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.nrows()) {
            return Err(ConsensusError::Shape(format!(
                "row index {} out of range for {} rows",
                bad,
                self.nrows()
            )));
        }
        let labels = indices.iter().map(|&i| self.row_labels[i].clone()).collect();
        Self::from_fn(labels, self.col_labels.clone(), |i, j| {
            self.get(indices[i], j)
        })
    }

    /// Row labels present in both matrices, in the row order of `self`, deduplicated.
    pub fn common_row_labels(&self, other: &LabeledMatrix) -> Vec<String> {
        let other_labels: HashSet<&str> = other.row_labels.iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        self.row_labels
            .iter()
            .filter(|label| other_labels.contains(label.as_str()) && seen.insert(label.as_str()))
            .cloned()
            .collect()
    }

    /// Restrict to `labels`, in that order. Every label must be present.
    pub fn restrict_rows(&self, labels: &[String]) -> Result<Self> {
        let positions = self.row_positions();
        let indices = labels
            .iter()
            .map(|label| {
                positions.get(label.as_str()).copied().ok_or_else(|| {
                    ConsensusError::Shape(format!("row label {:?} not present", label))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        trace!("Restricting {} rows to {}", self.nrows(), indices.len());
        self.select_rows(&indices)
    }

    /// Reorder rows to `labels`; labels absent from `self` become all-zero rows.
    pub fn reindex_rows(&self, labels: &[String]) -> Result<Self> {
        let positions = self.row_positions();
        let sources: Vec<Option<usize>> = labels
            .iter()
            .map(|label| positions.get(label.as_str()).copied())
            .collect();
        Self::from_fn(labels.to_vec(), self.col_labels.clone(), |i, j| {
            sources[i].map_or(0.0, |src| self.get(src, j))
        })
    }
}

// Cell-wise comparison; NaN cells never compare equal.
impl PartialEq for LabeledMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.row_labels == other.row_labels
            && self.col_labels == other.col_labels
            && self.shape() == other.shape()
            && (0..self.nrows()).all(|i| (0..self.ncols()).all(|j| self.get(i, j) == other.get(i, j)))
    }
}

fn check_non_empty(n_rows: usize, n_cols: usize) -> Result<()> {
    if n_rows == 0 || n_cols == 0 {
        return Err(ConsensusError::Shape(format!(
            "matrix must have at least one row and one column, got {}x{}",
            n_rows, n_cols
        )));
    }
    Ok(())
}
