//! Gene-gene network for the smoothed pipelines.
//!
//! - `GeneNetwork::from_edges`: symmetric sparse adjacency (CSR) over the sorted set of
//!   node labels; self loops dropped, repeated pairs keep their first weight.
//! - `GeneNetwork::normalized`: `D^-1/2 A D^-1/2` with `D` the degree diagonal;
//!   isolated nodes keep all-zero rows.
//! - `NetworkSmoother`: seam for the smoothing step itself, applied to spreadsheets
//!   first reindexed onto the network labels.

use std::collections::HashMap;

use log::{debug, info};
use sprs::{CsMat, TriMat};

use crate::errors::{ConsensusError, Result};
use crate::matrix::LabeledMatrix;

#[derive(Clone, Debug)]
pub struct GeneNetwork {
    adjacency: CsMat<f64>,
    labels: Vec<String>,
}

impl GeneNetwork {
    pub fn from_edges(edges: &[(String, String, f64)]) -> Result<Self> {
        let mut labels: Vec<String> = edges
            .iter()
            .flat_map(|(a, b, _)| [a.clone(), b.clone()])
            .collect();
        labels.sort();
        labels.dedup();
        if labels.is_empty() {
            return Err(ConsensusError::Shape("network has no edges".to_string()));
        }
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let mut weights: HashMap<(usize, usize), f64> = HashMap::new();
        for (a, b, w) in edges {
            let (i, j) = (index[a.as_str()], index[b.as_str()]);
            if i == j {
                continue;
            }
            weights.entry((i.min(j), i.max(j))).or_insert(*w);
        }

        let n = labels.len();
        let mut tri = TriMat::new((n, n));
        for (&(i, j), &w) in &weights {
            tri.add_triplet(i, j, w);
            tri.add_triplet(j, i, w);
        }
        info!(
            "Gene network with {} nodes and {} undirected edges",
            n,
            weights.len()
        );
        Ok(Self {
            adjacency: tri.to_csr(),
            labels,
        })
    }

    pub fn adjacency(&self) -> &CsMat<f64> {
        &self.adjacency
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_nodes(&self) -> usize {
        self.labels.len()
    }

    pub fn degrees(&self) -> Vec<f64> {
        self.adjacency
            .outer_iterator()
            .map(|row| row.iter().map(|(_, &v)| v).sum())
            .collect()
    }

    /// Symmetric degree normalization `D^-1/2 A D^-1/2`.
    pub fn normalized(&self) -> GeneNetwork {
        let scale: Vec<f64> = self
            .degrees()
            .into_iter()
            .map(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        let n = self.n_nodes();
        let mut tri = TriMat::new((n, n));
        for (i, row) in self.adjacency.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                tri.add_triplet(i, j, v * scale[i] * scale[j]);
            }
        }
        debug!("Normalized network adjacency by degree ({} nodes)", n);
        GeneNetwork {
            adjacency: tri.to_csr(),
            labels: self.labels.clone(),
        }
    }

    /// Reindex `matrix` onto the network nodes; genes outside the network are dropped
    /// and network genes missing from the matrix get zero rows.
    pub fn align(&self, matrix: &LabeledMatrix) -> Result<LabeledMatrix> {
        matrix.reindex_rows(&self.labels)
    }
}

/// Smooths a network-aligned spreadsheet over a normalized network.
pub trait NetworkSmoother: Sync {
    fn smooth(&self, matrix: &LabeledMatrix, network: &GeneNetwork) -> Result<LabeledMatrix>;
}
