use std::fs;

use tempfile::tempdir;

use crate::errors::{ConsensusError, Result};
use crate::exchange::{DirectoryStore, ExchangeStore, MemoryStore, Role};
use crate::sampling::BootstrapSample;
use crate::tests::bootstrap_params;
use crate::tests::test_data::expression_and_signatures;
use crate::worker::run_iteration;

/// Rejects every write.
struct ReadOnlyStore;

impl ExchangeStore for ReadOnlyStore {
    fn put(&self, _iteration: usize, _role: Role, _sample: &BootstrapSample) -> Result<()> {
        Err(ConsensusError::io(
            "/read-only",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        ))
    }

    fn list_completed(&self) -> Result<Vec<usize>> {
        Ok(vec![])
    }

    fn get(&self, iteration: usize, role: Role) -> Result<BootstrapSample> {
        Err(ConsensusError::MissingArtifact { iteration, role })
    }
}

#[test]
fn test_iteration_is_byte_identical_across_runs() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(1, 0.7);

    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let a = DirectoryStore::create(dir_a.path()).unwrap();
    let b = DirectoryStore::create(dir_b.path()).unwrap();
    run_iteration(&query, &reference, &params, 3, &a).unwrap();
    run_iteration(&query, &reference, &params, 3, &b).unwrap();

    for name in ["tmp_h_e_3", "tmp_p_e_3", "tmp_h_s_3", "tmp_p_s_3"] {
        let bytes_a = fs::read(dir_a.path().join(name)).unwrap();
        let bytes_b = fs::read(dir_b.path().join(name)).unwrap();
        assert_eq!(bytes_a, bytes_b, "{} differs", name);
    }
}

#[test]
fn test_iteration_independent_of_order() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(5, 0.5);

    let forward = MemoryStore::new();
    for i in 0..5 {
        run_iteration(&query, &reference, &params, i, &forward).unwrap();
    }
    let backward = MemoryStore::new();
    for i in (0..5).rev() {
        run_iteration(&query, &reference, &params, i, &backward).unwrap();
    }

    for i in 0..5 {
        for role in [Role::Query, Role::Reference] {
            let a = forward.get(i, role).unwrap();
            let b = backward.get(i, role).unwrap();
            assert_eq!(a.to_persisted(), b.to_persisted());
        }
    }
}

#[test]
fn test_iterations_draw_different_samples() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(2, 0.5);
    let store = MemoryStore::new();
    run_iteration(&query, &reference, &params, 0, &store).unwrap();
    run_iteration(&query, &reference, &params, 1, &store).unwrap();
    assert_ne!(
        store.get(0, Role::Query).unwrap().retained_rows,
        store.get(1, Role::Query).unwrap().retained_rows
    );
}

#[test]
fn test_query_and_reference_sampled_independently() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(1, 0.5);
    let store = MemoryStore::new();
    run_iteration(&query, &reference, &params, 0, &store).unwrap();

    let q = store.get(0, Role::Query).unwrap();
    let r = store.get(0, Role::Reference).unwrap();
    assert_eq!(q.shape(), (50, 3));
    assert_eq!(r.shape(), (50, 2));
    assert_ne!(q.retained_rows, r.retained_rows);
}

#[test]
fn test_persistence_failure_propagates() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(1, 0.5);
    let err = run_iteration(&query, &reference, &params, 0, &ReadOnlyStore).unwrap_err();
    assert!(matches!(err, ConsensusError::Io { .. }));
}
