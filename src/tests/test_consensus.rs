use approx::assert_relative_eq;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::{RunParameters, SimilarityMeasure};
use crate::consensus::{aggregate, iteration_similarity, ConsensusAccumulator};
use crate::exchange::{ExchangeStore, MemoryStore, Role};
use crate::matrix::LabeledMatrix;
use crate::sampling::BootstrapSample;
use crate::scheduler::run_all;
use crate::similarity::compute_similarity;
use crate::tests::bootstrap_params;
use crate::tests::test_data::{column_sums, expression_and_signatures, labels, planted_pair};
use crate::worker::run_iteration;

#[test]
fn test_accumulator_add_and_normalize() {
    let mut acc = ConsensusAccumulator::new(2, 2);
    let a = LabeledMatrix::from_rows(
        &[vec![1.0, 0.5], vec![0.25, 0.0]],
        labels("q", 2),
        labels("r", 2),
    )
    .unwrap();
    acc.add(&a).unwrap();
    acc.add(&a).unwrap();
    assert_eq!(acc.observed(), 2);
    assert_eq!(*acc.sum().get((0, 1)), 1.0);

    let mean = acc.normalized(4);
    assert_eq!(*mean.get((0, 0)), 0.5);
    assert_eq!(*mean.get((1, 0)), 0.125);
}

#[test]
fn test_accumulator_rejects_wrong_shape() {
    let mut acc = ConsensusAccumulator::new(3, 2);
    let wrong = LabeledMatrix::zeros(labels("q", 2), labels("r", 2)).unwrap();
    assert!(acc.add(&wrong).is_err());
    assert_eq!(acc.observed(), 0);
}

#[test]
fn test_divides_by_configured_not_discovered() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(10, 0.7);
    let store = MemoryStore::new();
    // only 7 of the 10 configured iterations made it to the store
    for i in 0..7 {
        run_iteration(&query, &reference, &params, i, &store).unwrap();
    }

    let consensus = aggregate(&query, &reference, &params, &store).unwrap();
    assert_eq!(consensus.discovered_iterations, 7);
    assert_eq!(consensus.used_iterations, 7);
    assert!(consensus.skipped_iterations.is_empty());

    let mut expected = ConsensusAccumulator::new(3, 2);
    for i in 0..7 {
        let sim = iteration_similarity(&query, &reference, SimilarityMeasure::Cosine, i, &store)
            .unwrap()
            .unwrap();
        expected.add(&sim).unwrap();
    }
    for r in 0..3 {
        for c in 0..2 {
            let sum = *expected.sum().get((r, c));
            assert_relative_eq!(
                consensus.mean_similarity.get(r, c),
                sum / 10.0,
                epsilon = 1e-12
            );
            assert!(consensus.mean_similarity.get(r, c) < sum / 7.0);
        }
    }
}

#[test]
fn test_accumulator_bounded_by_discovered() {
    let (query, reference) = expression_and_signatures();
    for measure in [SimilarityMeasure::Cosine, SimilarityMeasure::Spearman] {
        let params = RunParameters {
            similarity_measure: measure,
            ..bootstrap_params(6, 0.5)
        };
        let store = MemoryStore::new();
        run_all(&query, &reference, &params, &store).unwrap();

        let mut acc = ConsensusAccumulator::new(3, 2);
        for i in store.list_completed().unwrap() {
            if let Some(sim) = iteration_similarity(&query, &reference, measure, i, &store).unwrap() {
                acc.add(&sim).unwrap();
            }
        }
        let discovered = acc.observed() as f64;
        for r in 0..3 {
            for c in 0..2 {
                let v = *acc.sum().get((r, c));
                assert!(v >= 0.0 && v <= discovered + 1e-9, "{} outside [0, {}]", v, discovered);
            }
        }
    }
}

#[test]
fn test_assignment_one_per_column() {
    let (query, reference) = expression_and_signatures();
    let params = RunParameters {
        similarity_measure: SimilarityMeasure::Spearman,
        ..bootstrap_params(5, 0.8)
    };
    let store = MemoryStore::new();
    run_all(&query, &reference, &params, &store).unwrap();
    let consensus = aggregate(&query, &reference, &params, &store).unwrap();

    assert_eq!(consensus.assignment.shape(), (3, 2));
    assert_eq!(consensus.assignment.row_labels(), query.col_labels());
    assert_eq!(consensus.assignment.col_labels(), reference.col_labels());
    assert!(column_sums(&consensus.assignment).iter().all(|&s| s == 1.0));
}

#[test]
fn test_full_fraction_matches_single_pass() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(4, 1.0);
    let store = MemoryStore::new();
    run_all(&query, &reference, &params, &store).unwrap();
    let consensus = aggregate(&query, &reference, &params, &store).unwrap();

    let direct = compute_similarity(&query, &reference, SimilarityMeasure::Cosine).unwrap();
    for r in 0..3 {
        for c in 0..2 {
            assert_relative_eq!(
                consensus.mean_similarity.get(r, c),
                direct.get(r, c),
                epsilon = 1e-9
            );
        }
    }
}

#[test]
fn test_planted_consensus() {
    let (query, reference) = planted_pair();
    let params = bootstrap_params(12, 0.67);
    let store = MemoryStore::new();
    run_all(&query, &reference, &params, &store).unwrap();
    let consensus = aggregate(&query, &reference, &params, &store).unwrap();
    assert_eq!(consensus.assignment.column(0), vec![1.0, 0.0, 0.0]);
    assert_eq!(consensus.assignment.column(1), vec![0.0, 1.0, 0.0]);
}

#[test]
fn test_empty_store_gives_zero_consensus() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(3, 0.5);
    let consensus = aggregate(&query, &reference, &params, &MemoryStore::new()).unwrap();
    assert_eq!(consensus.discovered_iterations, 0);
    assert_eq!(consensus.mean_similarity.total(), 0.0);
    assert!(column_sums(&consensus.assignment).iter().all(|&s| s == 1.0));
}

#[test]
fn test_disjoint_iteration_skipped() {
    let genes = labels("g", 2);
    let query = LabeledMatrix::from_rows(&[vec![1.0], vec![2.0]], genes.clone(), labels("s", 1))
        .unwrap();
    let reference =
        LabeledMatrix::from_rows(&[vec![3.0], vec![4.0]], genes, labels("t", 1)).unwrap();

    let store = MemoryStore::new();
    let one_row = |value: f64, row: usize| BootstrapSample {
        values: DenseMatrix::from_iterator(std::iter::once(value), 1, 1, 0),
        retained_rows: vec![row],
    };
    store.put(0, Role::Reference, &one_row(4.0, 1)).unwrap();
    store.put(0, Role::Query, &one_row(1.0, 0)).unwrap();

    let params = bootstrap_params(1, 0.5);
    let consensus = aggregate(&query, &reference, &params, &store).unwrap();
    assert_eq!(consensus.discovered_iterations, 1);
    assert_eq!(consensus.used_iterations, 0);
    assert_eq!(consensus.skipped_iterations, vec![0]);
    assert_eq!(consensus.mean_similarity.get(0, 0), 0.0);
}

#[test]
fn test_missing_reference_half_is_error() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(1, 0.5);
    let full = MemoryStore::new();
    run_iteration(&query, &reference, &params, 0, &full).unwrap();

    let half = MemoryStore::new();
    half.put(0, Role::Query, &full.get(0, Role::Query).unwrap())
        .unwrap();
    assert!(aggregate(&query, &reference, &params, &half).is_err());
}

#[test]
fn test_skipped_iterations_listed_beside_used() {
    let genes = labels("g", 2);
    let query = LabeledMatrix::from_rows(&[vec![1.0], vec![2.0]], genes.clone(), labels("s", 1))
        .unwrap();
    let reference =
        LabeledMatrix::from_rows(&[vec![3.0], vec![4.0]], genes, labels("t", 1)).unwrap();

    let store = MemoryStore::new();
    let one_row = |value: f64, row: usize| BootstrapSample {
        values: DenseMatrix::from_iterator(std::iter::once(value), 1, 1, 0),
        retained_rows: vec![row],
    };
    // iteration 0 shares g0, iteration 1 keeps g0 against g1
    store.put(0, Role::Reference, &one_row(3.0, 0)).unwrap();
    store.put(0, Role::Query, &one_row(1.0, 0)).unwrap();
    store.put(1, Role::Reference, &one_row(4.0, 1)).unwrap();
    store.put(1, Role::Query, &one_row(1.0, 0)).unwrap();

    let consensus = aggregate(&query, &reference, &bootstrap_params(2, 0.5), &store).unwrap();
    assert_eq!(consensus.discovered_iterations, 2);
    assert_eq!(consensus.used_iterations, 1);
    assert_eq!(consensus.skipped_iterations, vec![1]);
    assert_relative_eq!(consensus.mean_similarity.get(0, 0), 0.5, epsilon = 1e-12);
}
