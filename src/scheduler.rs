//! Dispatch of bootstrap iterations.
//!
//! `Serial` runs iterations `0..n` in order on the calling thread. `Parallel` and
//! `Distribute` run them on a dedicated rayon pool sized by [`determine_parallelism`];
//! completion order is unspecified. Workers share nothing but the exchange store.
//!
//! A failing iteration does not stop the others. Dispatch returns once every
//! iteration has been attempted and reports which ones failed; the aggregator later
//! sees only the iterations that completed.
//!
//! There is no timeout: a stalled iteration blocks the dispatch call.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info};
use rayon::prelude::*;

use crate::config::{ProcessingMethod, RunParameters};
use crate::errors::{ConsensusError, Result};
use crate::exchange::{DirectoryStore, ExchangeStore};
use crate::matrix::LabeledMatrix;
use crate::worker::run_iteration;

/// Name prefix of every exchange directory.
pub const EXCHANGE_DIR_PREFIX: &str = "tmp_cc_similarity";

static EXCHANGE_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Outcome of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempted: usize,
    pub failed: Vec<(usize, ConsensusError)>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Number of workers for `jobs` iterations: the available cores, lowered to the
/// requested cap when one is set, never more than the jobs and never less than one.
pub fn determine_parallelism(jobs: usize, requested: Option<usize>) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested
        .map_or(available, |r| r.min(available))
        .min(jobs)
        .max(1)
}

/// Parent directory for this run's exchange: the shared volume when iterations may
/// run on other hosts, the run directory otherwise.
pub fn exchange_parent(params: &RunParameters) -> Result<PathBuf> {
    match params.processing_method {
        ProcessingMethod::Distribute => params.cluster_shared_volume.clone().ok_or_else(|| {
            ConsensusError::Config(
                "processing_method = distribute requires cluster_shared_volume".to_string(),
            )
        }),
        ProcessingMethod::Serial | ProcessingMethod::Parallel => Ok(params.run_directory.clone()),
    }
}

/// Create a fresh, run-unique exchange directory. The caller removes it after
/// aggregation.
pub fn prepare_exchange(params: &RunParameters) -> Result<DirectoryStore> {
    params.validate()?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = format!(
        "{}_{}_{}_{}",
        EXCHANGE_DIR_PREFIX,
        std::process::id(),
        stamp,
        EXCHANGE_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    let root = exchange_parent(params)?.join(name);
    info!("Preparing exchange directory {:?}", root);
    DirectoryStore::create(root)
}

/// Run `params.number_of_bootstraps` iterations into `store`.
pub fn run_all(
    query: &LabeledMatrix,
    reference: &LabeledMatrix,
    params: &RunParameters,
    store: &dyn ExchangeStore,
) -> Result<DispatchReport> {
    params.validate()?;
    let n = params.number_of_bootstraps;

    let outcomes: Vec<(usize, Result<()>)> = match params.processing_method {
        ProcessingMethod::Serial => {
            info!("Running {} bootstrap iterations serially", n);
            (0..n)
                .map(|i| (i, run_iteration(query, reference, params, i, store)))
                .collect()
        }
        ProcessingMethod::Parallel | ProcessingMethod::Distribute => {
            let workers = determine_parallelism(n, params.parallelism);
            info!(
                "Running {} bootstrap iterations on {} workers ({})",
                n, workers, params.processing_method
            );
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| ConsensusError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                (0..n)
                    .into_par_iter()
                    .map(|i| (i, run_iteration(query, reference, params, i, store)))
                    .collect()
            })
        }
    };

    let mut report = DispatchReport {
        attempted: n,
        failed: Vec::new(),
    };
    for (i, outcome) in outcomes {
        if let Err(e) = outcome {
            error!("Bootstrap iteration {} failed: {}", i, e);
            report.failed.push((i, e));
        }
    }
    info!(
        "Dispatch finished: {} of {} iterations persisted",
        report.succeeded(),
        report.attempted
    );
    Ok(report)
}
