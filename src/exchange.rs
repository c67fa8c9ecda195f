//! Exchange of per-iteration bootstrap state between workers and the aggregator.
//!
//! Each iteration persists two samples, one per [`Role`], as four artifacts:
//!
//! | artifact | file |
//! |----------|------|
//! | query values | `tmp_h_e_{i}` |
//! | query retained rows | `tmp_p_e_{i}` |
//! | reference values | `tmp_h_s_{i}` |
//! | reference retained rows | `tmp_p_s_{i}` |
//!
//! An iteration counts as completed once its query retained-rows artifact exists.
//! Workers write the reference sample first and the query sample last, and every file
//! is written under a temporary name then renamed, so a failed write never surfaces as
//! a completed iteration.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::errors::{ConsensusError, Result};
use crate::sampling::{BootstrapSample, PersistedValues};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Query,
    Reference,
}

impl Role {
    /// Single-letter tag used in artifact names (expression / signature).
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Query => "e",
            Role::Reference => "s",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Query => f.write_str("query"),
            Role::Reference => f.write_str("reference"),
        }
    }
}

/// Storage seam between bootstrap workers and the consensus aggregator.
pub trait ExchangeStore: Send + Sync {
    fn put(&self, iteration: usize, role: Role, sample: &BootstrapSample) -> Result<()>;

    /// Completed iterations, ascending.
    fn list_completed(&self) -> Result<Vec<usize>>;

    fn get(&self, iteration: usize, role: Role) -> Result<BootstrapSample>;
}

const VALUES_PREFIX: &str = "tmp_h_";
const RETAINED_PREFIX: &str = "tmp_p_";

fn values_name(iteration: usize, role: Role) -> String {
    format!("{}{}_{}", VALUES_PREFIX, role.tag(), iteration)
}

fn retained_name(iteration: usize, role: Role) -> String {
    format!("{}{}_{}", RETAINED_PREFIX, role.tag(), iteration)
}

/// Parse the iteration out of a query retained-rows artifact name.
fn completed_iteration(file_name: &str) -> Option<usize> {
    let prefix = format!("{}{}_", RETAINED_PREFIX, Role::Query.tag());
    file_name.strip_prefix(prefix.as_str())?.parse().ok()
}

/// Artifacts as files in one directory, local or on a shared volume.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create `root` (and parents) if missing.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ConsensusError::io(&root, e))?;
        debug!("Exchange directory ready at {:?}", root);
        Ok(Self { root })
    }

    /// Attach to an existing directory, e.g. from a worker on another host.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConsensusError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "exchange directory missing"),
            ));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Delete the directory and everything in it.
    pub fn remove(self) -> Result<()> {
        debug!("Removing exchange directory {:?}", self.root);
        fs::remove_dir_all(&self.root).map_err(|e| ConsensusError::io(&self.root, e))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.root.join(name);
        let partial = self.root.join(format!(".{}.part", name));
        fs::write(&partial, bytes).map_err(|e| ConsensusError::io(&partial, e))?;
        fs::rename(&partial, &target).map_err(|e| ConsensusError::io(&target, e))?;
        trace!("Wrote {} bytes to {:?}", bytes.len(), target);
        Ok(())
    }

    fn read(&self, name: &str, iteration: usize, role: Role) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConsensusError::MissingArtifact { iteration, role },
            _ => ConsensusError::io(&path, e),
        })
    }
}

impl ExchangeStore for DirectoryStore {
    fn put(&self, iteration: usize, role: Role, sample: &BootstrapSample) -> Result<()> {
        let (values, retained) = sample.to_persisted();
        self.write_atomic(&values_name(iteration, role), &bincode::serialize(&values)?)?;
        self.write_atomic(&retained_name(iteration, role), &bincode::serialize(&retained)?)?;
        Ok(())
    }

    fn list_completed(&self) -> Result<Vec<usize>> {
        let entries = fs::read_dir(&self.root).map_err(|e| ConsensusError::io(&self.root, e))?;
        let mut completed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConsensusError::io(&self.root, e))?;
            if let Some(i) = entry.file_name().to_str().and_then(completed_iteration) {
                completed.push(i);
            }
        }
        completed.sort_unstable();
        Ok(completed)
    }

    fn get(&self, iteration: usize, role: Role) -> Result<BootstrapSample> {
        let values: PersistedValues =
            bincode::deserialize(&self.read(&values_name(iteration, role), iteration, role)?)?;
        let retained: Vec<u64> =
            bincode::deserialize(&self.read(&retained_name(iteration, role), iteration, role)?)?;
        BootstrapSample::from_persisted(values, retained)
    }
}

/// In-process store; same contract, no filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(usize, Role), BootstrapSample>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop one iteration, as if its worker never finished.
    pub fn forget(&self, iteration: usize) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(&(iteration, Role::Query));
        entries.remove(&(iteration, Role::Reference));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExchangeStore for MemoryStore {
    fn put(&self, iteration: usize, role: Role, sample: &BootstrapSample) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert((iteration, role), sample.clone());
        Ok(())
    }

    fn list_completed(&self) -> Result<Vec<usize>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .filter(|(_, role)| *role == Role::Query)
            .map(|(i, _)| *i)
            .collect())
    }

    fn get(&self, iteration: usize, role: Role) -> Result<BootstrapSample> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(iteration, role))
            .cloned()
            .ok_or(ConsensusError::MissingArtifact { iteration, role })
    }
}
