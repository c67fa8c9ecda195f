//! Hard one-hot assignment from a similarity matrix.
//!
//! Only the position of the best score survives; the margin to the runner-up is
//! dropped. Ties go to the first index attaining the maximum so identical inputs
//! always give identical assignments. NaN never wins a comparison.

use log::debug;

use crate::errors::Result;
use crate::matrix::LabeledMatrix;

/// Direction along which the maximum is searched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    /// Axis 0: one 1 per column, at the best row.
    #[default]
    Rows,
    /// Axis 1: one 1 per row, at the best column.
    Columns,
}

/// Index of the first maximum; 0 when no value is comparable.
pub fn first_argmax<I>(values: I) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}

/// One-hot matrix of the same shape and labels as `similarity`.
pub fn binarize(similarity: &LabeledMatrix, axis: Axis) -> Result<LabeledMatrix> {
    let (n_rows, n_cols) = similarity.shape();
    debug!("Binarizing {}x{} similarity along {:?}", n_rows, n_cols, axis);

    let winners: Vec<usize> = match axis {
        Axis::Rows => (0..n_cols)
            .map(|j| first_argmax((0..n_rows).map(|i| similarity.get(i, j))))
            .collect(),
        Axis::Columns => (0..n_rows)
            .map(|i| first_argmax((0..n_cols).map(|j| similarity.get(i, j))))
            .collect(),
    };

    LabeledMatrix::from_fn(
        similarity.row_labels().to_vec(),
        similarity.col_labels().to_vec(),
        |i, j| {
            let hit = match axis {
                Axis::Rows => winners[j] == i,
                Axis::Columns => winners[i] == j,
            };
            if hit {
                1.0
            } else {
                0.0
            }
        },
    )
}
