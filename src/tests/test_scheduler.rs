use std::path::PathBuf;

use tempfile::tempdir;

use crate::config::{ProcessingMethod, RunParameters};
use crate::errors::{ConsensusError, Result};
use crate::exchange::{ExchangeStore, MemoryStore, Role};
use crate::sampling::BootstrapSample;
use crate::scheduler::{
    determine_parallelism, exchange_parent, prepare_exchange, run_all, EXCHANGE_DIR_PREFIX,
};
use crate::tests::bootstrap_params;
use crate::tests::test_data::expression_and_signatures;

/// Fails every odd iteration, stores the rest in memory.
struct OddFailingStore {
    inner: MemoryStore,
}

impl ExchangeStore for OddFailingStore {
    fn put(&self, iteration: usize, role: Role, sample: &BootstrapSample) -> Result<()> {
        if iteration % 2 == 1 {
            return Err(ConsensusError::Serialization("disk full".to_string()));
        }
        self.inner.put(iteration, role, sample)
    }

    fn list_completed(&self) -> Result<Vec<usize>> {
        self.inner.list_completed()
    }

    fn get(&self, iteration: usize, role: Role) -> Result<BootstrapSample> {
        self.inner.get(iteration, role)
    }
}

#[test]
fn test_determine_parallelism() {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    assert_eq!(determine_parallelism(1, Some(8)), 1);
    assert_eq!(determine_parallelism(10, Some(1)), 1);
    assert_eq!(determine_parallelism(0, None), 1);
    assert_eq!(determine_parallelism(1000, None), cores.min(1000));
    assert_eq!(determine_parallelism(3, Some(2)), 2usize.min(cores));
}

#[test]
fn test_requested_parallelism_capped_by_cores() {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let workers = determine_parallelism(10_000, Some(cores * 8));
    assert_eq!(workers, cores);
}

#[test]
fn test_serial_runs_every_iteration() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(6, 0.8);
    let store = MemoryStore::new();

    let report = run_all(&query, &reference, &params, &store).unwrap();
    assert_eq!(report.attempted, 6);
    assert!(report.is_complete());
    assert_eq!(store.list_completed().unwrap(), (0..6).collect::<Vec<_>>());
}

#[test]
fn test_parallel_matches_serial() {
    let (query, reference) = expression_and_signatures();
    let serial_params = bootstrap_params(8, 0.6);
    let parallel_params = RunParameters {
        processing_method: ProcessingMethod::Parallel,
        parallelism: Some(4),
        ..serial_params.clone()
    };

    let serial = MemoryStore::new();
    let parallel = MemoryStore::new();
    run_all(&query, &reference, &serial_params, &serial).unwrap();
    run_all(&query, &reference, &parallel_params, &parallel).unwrap();

    assert_eq!(
        serial.list_completed().unwrap(),
        parallel.list_completed().unwrap()
    );
    for i in 0..8 {
        for role in [Role::Query, Role::Reference] {
            assert_eq!(
                serial.get(i, role).unwrap().to_persisted(),
                parallel.get(i, role).unwrap().to_persisted()
            );
        }
    }
}

#[test]
fn test_failed_iterations_reported_not_fatal() {
    let (query, reference) = expression_and_signatures();
    for method in [ProcessingMethod::Serial, ProcessingMethod::Parallel] {
        let params = RunParameters {
            processing_method: method,
            ..bootstrap_params(5, 0.8)
        };
        let store = OddFailingStore {
            inner: MemoryStore::new(),
        };
        let report = run_all(&query, &reference, &params, &store).unwrap();
        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded(), 3);
        let mut failed: Vec<usize> = report.failed.iter().map(|(i, _)| *i).collect();
        failed.sort_unstable();
        assert_eq!(failed, vec![1, 3]);
        assert_eq!(store.list_completed().unwrap(), vec![0, 2, 4]);
    }
}

#[test]
fn test_invalid_params_rejected_before_dispatch() {
    let (query, reference) = expression_and_signatures();
    let params = bootstrap_params(0, 0.8);
    let store = MemoryStore::new();
    let err = run_all(&query, &reference, &params, &store).unwrap_err();
    assert!(err.is_config());
    assert!(store.is_empty());
}

#[test]
fn test_exchange_parent_by_locality() {
    let local = RunParameters {
        run_directory: PathBuf::from("/runs/local"),
        ..RunParameters::default()
    };
    assert_eq!(exchange_parent(&local).unwrap(), PathBuf::from("/runs/local"));

    let distributed = RunParameters {
        processing_method: ProcessingMethod::Distribute,
        cluster_shared_volume: Some(PathBuf::from("/mnt/shared")),
        ..local.clone()
    };
    assert_eq!(
        exchange_parent(&distributed).unwrap(),
        PathBuf::from("/mnt/shared")
    );
}

#[test]
fn test_prepare_exchange_creates_unique_directories() {
    let dir = tempdir().unwrap();
    let params = RunParameters {
        run_directory: dir.path().to_path_buf(),
        ..RunParameters::default()
    };
    let a = prepare_exchange(&params).unwrap();
    let b = prepare_exchange(&params).unwrap();

    assert!(a.path().is_dir());
    assert_ne!(a.path(), b.path());
    assert!(a.path().starts_with(dir.path()));
    let name = a.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with(EXCHANGE_DIR_PREFIX));
}

#[test]
fn test_unknown_processing_method_creates_nothing() {
    let dir = tempdir().unwrap();
    let run_dir = dir.path().join("run");
    let text = format!(
        r#"
method = "cc_similarity"
spreadsheet_name_full_path = "q.tsv"
signature_name_full_path = "r.tsv"
processing_method = "cluster"
number_of_bootstraps = 3
run_directory = "{}"
"#,
        run_dir.display()
    );
    let err = RunParameters::from_toml_str(&text).unwrap_err();
    assert!(err.is_config());
    assert!(!run_dir.exists());
}
