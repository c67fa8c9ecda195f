//! Error type shared by every stage of a run.
//!
//! Configuration problems (`Config`) are raised while parameters are loaded, before any
//! matrix is touched. Data problems (`EmptyCommonAxis`, `Shape`, `Parse`) mean the inputs
//! are unusable. Exchange problems (`Io`, `Serialization`, `MissingArtifact`) are scoped
//! to a single bootstrap iteration unless they happen while loading the inputs.

use std::path::PathBuf;

use thiserror::Error;

use crate::exchange::Role;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(
        "no common feature labels between query ({query_rows} rows) and reference ({reference_rows} rows)"
    )]
    EmptyCommonAxis {
        query_rows: usize,
        reference_rows: usize,
    },

    #[error("shape error: {0}")]
    Shape(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("parse error in {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("missing {role} artifact for bootstrap iteration {iteration}")]
    MissingArtifact { iteration: usize, role: Role },

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl ConsensusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConsensusError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ConsensusError::Config(_))
    }
}

impl From<bincode::Error> for ConsensusError {
    fn from(e: bincode::Error) -> Self {
        ConsensusError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
