//! Evidence accumulation: per-read indel observations, inserted-sequence
//! consensus, read path scores and per-position base calls.
//!
//! Everything in this module is owned by a single contig worker; nothing is
//! shared across threads.

mod basecall;
mod indel_buffer;
mod indel_data;
mod indel_key;
mod insert_seq;
mod observation;
mod read_path;

pub use basecall::{
    base_index, BaseCall, BaseCallBuffer, PositionSummary, BASES, NUM_BASES,
};
pub use indel_buffer::IndelBuffer;
pub use indel_data::{EvidenceSet, EvidenceTier, IndelData, IndelSampleData};
pub use indel_key::{IndelKey, IndelType};
pub use insert_seq::InsertSequenceManager;
pub use observation::{AlignTier, IndelObservation};
pub use read_path::{ReadPathScores, Score, MAX_ALT_INDELS};

use thiserror::Error;

/// Read identifier assigned by the evidence extractor.
pub type ReadId = u32;

/// Violations of the evidence data contract.
///
/// These indicate an upstream bug and abort processing of the current unit.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Inserted sequence length disagrees with the indel's declared length.
    #[error("indel observation insert length '{observed}' does not match expected length {expected} for indel: {key}")]
    InsertLengthMismatch {
        /// Indel the observation was offered to.
        key: IndelKey,
        /// Length of the observed inserted sequence.
        observed: usize,
        /// Insert length declared by the key.
        expected: usize,
    },

    /// Raw alignment tier code not recognised.
    #[error("unknown indel alignment type code {0}")]
    UnknownAlignTier(u8),

    /// Read already recorded as evidence for this indel.
    #[error("read {read_id} already recorded as {tier} evidence")]
    DuplicateObservation {
        /// Duplicated read.
        read_id: ReadId,
        /// Evidence set already holding the read.
        tier: &'static str,
    },

    /// Consensus queried after a mutation without re-finalizing.
    #[error("insert sequence consensus read before finalize")]
    StaleConsensus,

    /// Sample index outside the tracked samples.
    #[error("sample index {sample_index} out of range ({sample_count} samples)")]
    SampleOutOfRange {
        /// Requested index.
        sample_index: usize,
        /// Number of samples tracked.
        sample_count: usize,
    },
}
