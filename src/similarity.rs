//! Column-to-column similarity between a query matrix and a reference matrix.
//!
//! Both inputs are first restricted to their common feature labels (order of the query
//! matrix). The result has one row per query column and one column per reference
//! column, labelled accordingly, whatever the number of common features.
//!
//! - `Cosine`: `a·b / (|a||b|)`; a zero-norm column scores 0 against everything.
//! - `Spearman`: Pearson correlation of average ranks, absolute value. Only the strength
//!   of the monotonic association is kept, its sign is dropped. A constant column has
//!   no defined correlation and scores 0.

use std::cmp::Ordering;

use log::{debug, trace};
use rayon::prelude::*;

use crate::config::SimilarityMeasure;
use crate::errors::{ConsensusError, Result};
use crate::matrix::LabeledMatrix;

/// Similarity of every query column against every reference column.
pub fn compute_similarity(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    measure: SimilarityMeasure,
) -> Result<LabeledMatrix> {
    let common = query.common_row_labels(reference);
    if common.is_empty() {
        return Err(ConsensusError::EmptyCommonAxis {
            query_rows: query.nrows(),
            reference_rows: reference.nrows(),
        });
    }
    debug!(
        "Computing {} similarity over {} common features ({}x{} pairs)",
        measure,
        common.len(),
        query.ncols(),
        reference.ncols()
    );

    let query_cols = query.restrict_rows(&common)?.columns();
    let reference_cols = reference.restrict_rows(&common)?.columns();

    let scores = match measure {
        SimilarityMeasure::Cosine => cross_scores(&query_cols, &reference_cols, cosine_similarity),
        SimilarityMeasure::Spearman => {
            let query_ranks: Vec<Vec<f64>> = query_cols.par_iter().map(|c| average_ranks(c)).collect();
            let reference_ranks: Vec<Vec<f64>> =
                reference_cols.par_iter().map(|c| average_ranks(c)).collect();
            cross_scores(&query_ranks, &reference_ranks, |a, b| {
                pearson_correlation(a, b).abs()
            })
        }
    };

    LabeledMatrix::from_fn(
        query.col_labels().to_vec(),
        reference.col_labels().to_vec(),
        |i, j| scores[i][j],
    )
}

/// Score every left vector against every right vector, left vectors in parallel.
fn cross_scores<F>(left: &[Vec<f64>], right: &[Vec<f64>], score: F) -> Vec<Vec<f64>>
where
    F: Fn(&[f64], &[f64]) -> f64 + Sync,
{
    left.par_iter()
        .map(|a| right.iter().map(|b| score(a, b)).collect())
        .collect()
}

/// Computes the Euclidean norm (L2) without allocating.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    a.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        trace!("zero-norm column in cosine similarity");
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (na * nb)
}

/// Pearson correlation; 0 when either side has no variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if a.is_empty() {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (da, db) = (x - mean_a, y - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Order used for ranking: NaN sorts after every number and ties with other NaN.
fn rank_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// 1-based ranks; tied values share the mean of the ranks they span. NaN values take
/// the highest ranks, tied among themselves, so the ranks of the numbers do not depend
/// on where the NaN sit.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| rank_order(values[a], values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len()
            && rank_order(values[order[end]], values[order[start]]) == Ordering::Equal
        {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
