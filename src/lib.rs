//! # smallvar
//!
//! Decision core of a germline small-variant caller. Per-read evidence goes in,
//! phased, scored and filtered site and indel records come out.
//!
//! ## Stages
//!
//! 1. **Evidence accumulation** ([`evidence`]): per-indel, per-sample read
//!    evidence sets, inserted-sequence consensus, read path scores and
//!    per-position base calls.
//! 2. **Genotyping** ([`stats`], [`locus`]): diploid site and indel genotype
//!    calls, repeat context and homopolymer length.
//! 3. **Codon phasing** ([`phasing`]): runs of nearby heterozygous SNVs whose
//!    reads agree on two haplotypes become one multi-base record.
//! 4. **Scoring** ([`scoring`]): empirical models where loaded and usable,
//!    threshold filters otherwise.
//!
//! [`pipeline::ContigPipeline`] strings the stages together for one contig.
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smallvar::{CallerConfig, ContigPipeline, ScoringModels, VecSink};
//!
//! # fn main() -> Result<(), smallvar::CallerError> {
//! let config = CallerConfig::default().with_phasing(true);
//! let models = ScoringModels::load(&config.scoring)?;
//! let reference: Arc<[u8]> = Arc::from(&b"ACGTACGTACGT"[..]);
//! let mut pipeline = ContigPipeline::new("chr1", reference, 0, 1, &config, None, models, VecSink::new())?;
//! pipeline.add_read(0, 0, b"ACGTGCTTACGT", 30, true)?;
//! let sink = pipeline.finish()?;
//! println!("{} sites", sink.sites.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod config; // Caller configuration and derived per-contig options
pub mod evidence; // Read evidence accumulation
pub mod locus; // Genotyped site and indel records
pub mod phasing; // Codon phasing state machine
pub mod pipeline; // Per-contig driver
pub mod scoring; // Empirical models and default filters
pub mod stats; // Fisher test, phred conversions, genotype models

pub use config::{CallerConfig, ChromDepthTable, ConfigError, DerivedOptions};
pub use evidence::{EvidenceError, IndelBuffer, IndelData, IndelKey, IndelObservation};
pub use locus::{FilterSet, GermlineFilter, IndelLocus, SiteLocus};
pub use phasing::{CodonPhaser, RunOutcome};
pub use pipeline::{ContigPipeline, SinkError, VariantSink, VecSink};
pub use scoring::{ModelError, ScoringModelManager, ScoringModels};
pub use stats::{fisher_exact_test, Alternative};

use thiserror::Error;

/// Errors aborting the current unit of work.
#[derive(Debug, Error)]
pub enum CallerError {
    /// Invalid configuration or missing contig depth.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scoring model could not be loaded.
    #[error("scoring model error: {0}")]
    Model(#[from] ModelError),

    /// Evidence violated its data contract.
    #[error("evidence error: {0}")]
    Evidence(#[from] EvidenceError),

    /// Downstream consumer failed.
    #[error("variant sink error: {0}")]
    Sink(#[from] SinkError),

    /// Evidence arrived for a position already finalised.
    #[error("evidence at position {pos} arrived after processing reached {next_pos}")]
    StalePosition {
        /// Position of the evidence.
        pos: u32,
        /// First position not yet processed.
        next_pos: u32,
    },
}
