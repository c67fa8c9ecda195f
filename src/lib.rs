//! # signature-consensus
//!
//! Maps the columns of a query spreadsheet (genes x samples) onto the columns of a
//! reference spreadsheet (genes x signatures) by similarity over their common genes,
//! either in one pass or as a bootstrap consensus:
//!
//! 1. each iteration `i` resamples the gene rows of both matrices with a generator
//!    seeded by `i` ([`sampling`], [`worker`]);
//! 2. iterations run serially or on a worker pool ([`scheduler`]) and persist their
//!    samples to an [`exchange::ExchangeStore`];
//! 3. the aggregator realigns every persisted sample to the original gene labels,
//!    sums the per-iteration similarities, divides by the configured iteration count
//!    and keeps the best row per column ([`consensus`], [`binarize`]).
//!
//! ```ignore
//! use signature_consensus::builder::ConsensusBuilder;
//! use signature_consensus::config::{ProcessingMethod, SimilarityMeasure};
//!
//! let consensus = ConsensusBuilder::new()
//!     .with_measure(SimilarityMeasure::Spearman)
//!     .with_processing(ProcessingMethod::Parallel)
//!     .with_bootstraps(20)
//!     .with_sampling(0.8, 1.0)
//!     .run(&query, &reference)?;
//! println!("{:?}", consensus.assignment.shape());
//! ```

pub mod binarize;
pub mod builder;
pub mod config;
pub mod consensus;
pub mod errors;
pub mod exchange;
pub mod io;
pub mod matrix;
pub mod network;
pub mod pipeline;
pub mod sampling;
pub mod scheduler;
pub mod similarity;
pub mod worker;

#[cfg(test)]
mod tests;
