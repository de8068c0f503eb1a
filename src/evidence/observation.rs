use std::fmt;

use crate::evidence::{EvidenceError, ReadId};

/// Confidence class of the read alignment that produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignTier {
    /// Alignment passing the strict (tier 1) mapping criteria.
    Tier1,
    /// Alignment passing only the relaxed (tier 2) mapping criteria.
    Tier2,
    /// Alignment below the mapping threshold ("submapped").
    Submap,
}

impl AlignTier {
    /// Label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            AlignTier::Tier1 => "genome_tier1",
            AlignTier::Tier2 => "genome_tier2",
            AlignTier::Submap => "genome_submap",
        }
    }
}

impl TryFrom<u8> for AlignTier {
    type Error = EvidenceError;

    /// Decode the raw tier code emitted by evidence extractors.
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AlignTier::Tier1),
            1 => Ok(AlignTier::Tier2),
            2 => Ok(AlignTier::Submap),
            other => Err(EvidenceError::UnknownAlignTier(other)),
        }
    }
}

/// One read's evidence for one indel.
///
/// Observations are consumed immediately by [`IndelData`](crate::evidence::IndelData)
/// and never retained individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelObservation {
    /// Identifier of the supporting read.
    pub read_id: ReadId,
    /// Alignment tier of the read.
    pub tier: AlignTier,
    /// Evidence judged to be alignment noise.
    pub is_noise: bool,
    /// Candidate supplied externally rather than observed in a read.
    pub is_external_candidate: bool,
    /// Candidate that must be reported regardless of evidence.
    pub is_forced_output: bool,
    /// Inserted bases carried by the read, empty when none.
    pub insert_seq: String,
}

impl IndelObservation {
    /// Plain read observation with the given tier.
    pub fn read(read_id: ReadId, tier: AlignTier) -> Self {
        Self {
            read_id,
            tier,
            is_noise: false,
            is_external_candidate: false,
            is_forced_output: false,
            insert_seq: String::new(),
        }
    }

    /// Observation standing for an externally supplied candidate.
    pub fn external_candidate() -> Self {
        Self {
            is_external_candidate: true,
            ..Self::read(0, AlignTier::Tier1)
        }
    }

    /// Observation standing for a forced-output candidate.
    pub fn forced_output() -> Self {
        Self {
            is_forced_output: true,
            ..Self::read(0, AlignTier::Tier1)
        }
    }

    /// Attach inserted sequence to the observation.
    pub fn with_insert_seq(mut self, seq: impl Into<String>) -> Self {
        self.insert_seq = seq.into();
        self
    }

    /// Mark the observation as noise.
    pub fn with_noise(mut self, is_noise: bool) -> Self {
        self.is_noise = is_noise;
        self
    }

    /// Abstract observations carry flags only and no read evidence.
    pub fn is_abstract(&self) -> bool {
        self.is_external_candidate || self.is_forced_output
    }
}

impl fmt::Display for IndelObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read={} type={} noise={} external={} forced={} insert_seq='{}'",
            self.read_id,
            self.tier.label(),
            self.is_noise,
            self.is_external_candidate,
            self.is_forced_output,
            self.insert_seq
        )
    }
}
