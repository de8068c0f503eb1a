use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use crate::evidence::{
    AlignTier, EvidenceError, IndelKey, IndelObservation, InsertSequenceManager, ReadId,
    ReadPathScores,
};

/// Ordered set of read identifiers.
pub type EvidenceSet = BTreeSet<ReadId>;

/// Evidence-tier set a read was routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceTier {
    /// Tier 1 supporting read.
    Tier1,
    /// Tier 2 supporting read.
    Tier2,
    /// Submapped supporting read.
    Submap,
    /// Read whose support was judged noise.
    Noise,
}

impl EvidenceTier {
    fn for_observation(obs: &IndelObservation) -> Self {
        if obs.is_noise {
            return EvidenceTier::Noise;
        }
        match obs.tier {
            AlignTier::Tier1 => EvidenceTier::Tier1,
            AlignTier::Tier2 => EvidenceTier::Tier2,
            AlignTier::Submap => EvidenceTier::Submap,
        }
    }

    /// Label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            EvidenceTier::Tier1 => "tier1_map_read",
            EvidenceTier::Tier2 => "tier2_map_read",
            EvidenceTier::Submap => "submap_read",
            EvidenceTier::Noise => "noise_read",
        }
    }
}

/// Read evidence for one indel in one sample.
#[derive(Debug, Clone, Default)]
pub struct IndelSampleData {
    tier1_map_read_ids: EvidenceSet,
    tier2_map_read_ids: EvidenceSet,
    submap_read_ids: EvidenceSet,
    noise_read_ids: EvidenceSet,
    suboverlap_tier1_read_ids: EvidenceSet,
    suboverlap_tier2_read_ids: EvidenceSet,
    read_path_lnp: BTreeMap<ReadId, ReadPathScores>,
}

impl IndelSampleData {
    /// Tier 1 supporting reads.
    pub fn tier1_reads(&self) -> &EvidenceSet {
        &self.tier1_map_read_ids
    }

    /// Tier 2 supporting reads.
    pub fn tier2_reads(&self) -> &EvidenceSet {
        &self.tier2_map_read_ids
    }

    /// Submapped supporting reads.
    pub fn submap_reads(&self) -> &EvidenceSet {
        &self.submap_read_ids
    }

    /// Reads whose support was judged noise.
    pub fn noise_reads(&self) -> &EvidenceSet {
        &self.noise_read_ids
    }

    /// Tier 1 reads overlapping but not supporting the indel.
    pub fn suboverlap_tier1_reads(&self) -> &EvidenceSet {
        &self.suboverlap_tier1_read_ids
    }

    /// Tier 2 reads overlapping but not supporting the indel.
    pub fn suboverlap_tier2_reads(&self) -> &EvidenceSet {
        &self.suboverlap_tier2_read_ids
    }

    /// Read path scores keyed by read id.
    pub fn read_path_scores(&self) -> &BTreeMap<ReadId, ReadPathScores> {
        &self.read_path_lnp
    }

    /// Evidence-tier set currently holding `read_id`, if any.
    pub fn tier_of(&self, read_id: ReadId) -> Option<EvidenceTier> {
        [
            EvidenceTier::Tier1,
            EvidenceTier::Tier2,
            EvidenceTier::Submap,
            EvidenceTier::Noise,
        ]
        .into_iter()
        .find(|&tier| self.set(tier).contains(&read_id))
    }

    fn set(&self, tier: EvidenceTier) -> &EvidenceSet {
        match tier {
            EvidenceTier::Tier1 => &self.tier1_map_read_ids,
            EvidenceTier::Tier2 => &self.tier2_map_read_ids,
            EvidenceTier::Submap => &self.submap_read_ids,
            EvidenceTier::Noise => &self.noise_read_ids,
        }
    }

    fn set_mut(&mut self, tier: EvidenceTier) -> &mut EvidenceSet {
        match tier {
            EvidenceTier::Tier1 => &mut self.tier1_map_read_ids,
            EvidenceTier::Tier2 => &mut self.tier2_map_read_ids,
            EvidenceTier::Submap => &mut self.submap_read_ids,
            EvidenceTier::Noise => &mut self.noise_read_ids,
        }
    }

    /// Check that `obs` can be routed without violating set disjointness.
    fn check_observation(&self, obs: &IndelObservation) -> Result<(), EvidenceError> {
        if obs.is_abstract() {
            return Ok(());
        }
        match self.tier_of(obs.read_id) {
            Some(existing) => Err(EvidenceError::DuplicateObservation {
                read_id: obs.read_id,
                tier: existing.label(),
            }),
            None => Ok(()),
        }
    }

    /// Route a read observation into its evidence-tier set.
    ///
    /// Abstract observations carry no read evidence and are ignored.
    pub fn add_observation(&mut self, obs: &IndelObservation) -> Result<(), EvidenceError> {
        self.check_observation(obs)?;
        if !obs.is_abstract() {
            let tier = EvidenceTier::for_observation(obs);
            self.set_mut(tier).insert(obs.read_id);
        }
        Ok(())
    }

    /// Record a read overlapping the indel without supporting it.
    pub fn add_suboverlap_read(&mut self, read_id: ReadId, tier: AlignTier) {
        match tier {
            AlignTier::Tier1 => self.suboverlap_tier1_read_ids.insert(read_id),
            _ => self.suboverlap_tier2_read_ids.insert(read_id),
        };
    }

    /// Store (or replace) the path scores for `read_id`.
    pub fn set_read_path_scores(&mut self, read_id: ReadId, scores: ReadPathScores) {
        self.read_path_lnp.insert(read_id, scores);
    }

    /// Mutable path scores for `read_id`, used to offer alternate indels.
    pub fn read_path_scores_mut(&mut self, read_id: ReadId) -> Option<&mut ReadPathScores> {
        self.read_path_lnp.get_mut(&read_id)
    }

    /// Count of tier 1 reads supporting or overlapping the indel.
    pub fn tier1_depth(&self) -> u32 {
        (self.tier1_map_read_ids.len() + self.suboverlap_tier1_read_ids.len()) as u32
    }
}

impl fmt::Display for IndelSampleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tier in [
            EvidenceTier::Tier1,
            EvidenceTier::Tier2,
            EvidenceTier::Submap,
            EvidenceTier::Noise,
        ] {
            for (n, id) in self.set(tier).iter().enumerate() {
                writeln!(f, "{} no: {} id: {}", tier.label(), n + 1, id)?;
            }
        }
        for (n, (id, scores)) in self.read_path_lnp.iter().enumerate() {
            writeln!(f, "read_path_lnp no: {} id: {} {}", n + 1, id, scores)?;
        }
        for (label, set) in [
            ("suboverlap_tier1_read", &self.suboverlap_tier1_read_ids),
            ("suboverlap_tier2_read", &self.suboverlap_tier2_read_ids),
        ] {
            for (n, id) in set.iter().enumerate() {
                writeln!(f, "{} no: {} id: {}", label, n + 1, id)?;
            }
        }
        Ok(())
    }
}

/// Cross-sample evidence for one indel.
#[derive(Debug, Clone)]
pub struct IndelData {
    key: IndelKey,
    samples: Vec<IndelSampleData>,
    is_external_candidate: bool,
    is_forced_output: bool,
    insert_seq: InsertSequenceManager,
}

impl IndelData {
    /// Create empty evidence for `key` across `sample_count` samples.
    pub fn new(key: IndelKey, sample_count: usize) -> Self {
        Self {
            key,
            samples: vec![IndelSampleData::default(); sample_count],
            is_external_candidate: false,
            is_forced_output: false,
            insert_seq: InsertSequenceManager::new(),
        }
    }

    /// Key of the indel this evidence belongs to.
    pub fn key(&self) -> &IndelKey {
        &self.key
    }

    /// Number of samples tracked.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Whether any observation marked the indel as an external candidate.
    pub fn is_external_candidate(&self) -> bool {
        self.is_external_candidate
    }

    /// Whether any observation marked the indel for forced output.
    pub fn is_forced_output(&self) -> bool {
        self.is_forced_output
    }

    /// Evidence of one sample.
    pub fn sample(&self, sample_index: usize) -> Result<&IndelSampleData, EvidenceError> {
        let sample_count = self.samples.len();
        self.samples
            .get(sample_index)
            .ok_or(EvidenceError::SampleOutOfRange {
                sample_index,
                sample_count,
            })
    }

    /// Mutable evidence of one sample.
    pub fn sample_mut(&mut self, sample_index: usize) -> Result<&mut IndelSampleData, EvidenceError> {
        let sample_count = self.samples.len();
        self.samples
            .get_mut(sample_index)
            .ok_or(EvidenceError::SampleOutOfRange {
                sample_index,
                sample_count,
            })
    }

    /// Add one read observation for `sample_index`.
    ///
    /// The observation is fully validated before anything is mutated: an
    /// inserted sequence of the wrong length, a duplicate read or a bad sample
    /// index leaves this indel untouched.
    pub fn add_observation(
        &mut self,
        sample_index: usize,
        obs: &IndelObservation,
    ) -> Result<(), EvidenceError> {
        trace!(indel = %self.key, obs = %obs, "adding indel observation");

        if !obs.insert_seq.is_empty()
            && !self.key.is_breakpoint()
            && obs.insert_seq.len() != self.key.insert_length() as usize
        {
            return Err(EvidenceError::InsertLengthMismatch {
                key: self.key,
                observed: obs.insert_seq.len(),
                expected: self.key.insert_length() as usize,
            });
        }

        let sample_count = self.samples.len();
        let sample = self
            .samples
            .get_mut(sample_index)
            .ok_or(EvidenceError::SampleOutOfRange {
                sample_index,
                sample_count,
            })?;
        sample.add_observation(obs)?;

        self.is_external_candidate |= obs.is_external_candidate;
        self.is_forced_output |= obs.is_forced_output;

        if !obs.insert_seq.is_empty() {
            self.insert_seq.add_observation(&obs.insert_seq);
        }
        Ok(())
    }

    /// Consensus inserted sequence, finalized lazily.
    ///
    /// A consensus whose length disagrees with the key's insert length is a
    /// logic error.
    pub fn insert_seq(&mut self) -> Result<&str, EvidenceError> {
        let key = self.key;
        let consensus = self.insert_seq.consensus();
        if !key.is_breakpoint()
            && !consensus.is_empty()
            && consensus.len() != key.insert_length() as usize
        {
            return Err(EvidenceError::InsertLengthMismatch {
                key,
                observed: consensus.len(),
                expected: key.insert_length() as usize,
            });
        }
        Ok(consensus)
    }

    /// Inserted-sequence manager (read-only).
    pub fn insert_seq_manager(&self) -> &InsertSequenceManager {
        &self.insert_seq
    }
}

impl fmt::Display for IndelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IndelKey: {}", self.key)?;
        writeln!(f, "is_external_candidate: {}", self.is_external_candidate)?;
        writeln!(f, "is_forced_output: {}", self.is_forced_output)?;
        match self.insert_seq.try_consensus() {
            Ok(seq) => writeln!(f, "seq: {}", seq)?,
            Err(_) => writeln!(f, "seq: <pending>")?,
        }
        for (index, sample) in self.samples.iter().enumerate() {
            writeln!(f, "BEGIN sample: {}", index)?;
            write!(f, "{}", sample)?;
            writeln!(f, "END sample: {}", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_route_by_noise_then_tier() {
        let mut data = IndelData::new(IndelKey::deletion(100, 2), 1);
        data.add_observation(0, &IndelObservation::read(1, AlignTier::Tier1))
            .unwrap();
        data.add_observation(0, &IndelObservation::read(2, AlignTier::Tier2))
            .unwrap();
        data.add_observation(0, &IndelObservation::read(3, AlignTier::Submap))
            .unwrap();
        data.add_observation(
            0,
            &IndelObservation::read(4, AlignTier::Tier1).with_noise(true),
        )
        .unwrap();

        let sample = data.sample(0).unwrap();
        assert_eq!(sample.tier_of(1), Some(EvidenceTier::Tier1));
        assert_eq!(sample.tier_of(2), Some(EvidenceTier::Tier2));
        assert_eq!(sample.tier_of(3), Some(EvidenceTier::Submap));
        assert_eq!(sample.tier_of(4), Some(EvidenceTier::Noise));
        assert_eq!(sample.tier1_reads().len(), 1);
    }

    #[test]
    fn duplicate_read_is_rejected() {
        let mut data = IndelData::new(IndelKey::deletion(100, 2), 1);
        data.add_observation(0, &IndelObservation::read(9, AlignTier::Tier1))
            .unwrap();
        let err = data
            .add_observation(0, &IndelObservation::read(9, AlignTier::Tier2))
            .unwrap_err();
        assert!(matches!(err, EvidenceError::DuplicateObservation { read_id: 9, .. }));
        assert!(data.sample(0).unwrap().tier2_reads().is_empty());
    }

    #[test]
    fn insert_length_mismatch_leaves_state_untouched() {
        let mut data = IndelData::new(IndelKey::insertion(50, 3), 1);
        let bad = IndelObservation::read(1, AlignTier::Tier1).with_insert_seq("ACGT");
        let bad = IndelObservation {
            is_forced_output: true,
            ..bad
        };
        assert!(matches!(
            data.add_observation(0, &bad),
            Err(EvidenceError::InsertLengthMismatch { observed: 4, expected: 3, .. })
        ));
        assert!(!data.is_forced_output());
        assert_eq!(data.insert_seq_manager().pending_variants(), 0);
    }

    #[test]
    fn breakpoints_accept_any_insert_length() {
        let key = IndelKey::new(50, crate::evidence::IndelType::BreakpointRight, 0);
        let mut data = IndelData::new(key, 1);
        data.add_observation(
            0,
            &IndelObservation::read(1, AlignTier::Tier1).with_insert_seq("ACGTACGT"),
        )
        .unwrap();
        assert_eq!(data.insert_seq().unwrap(), "ACGTACGT");
    }

    #[test]
    fn sticky_flags_never_reset() {
        let mut data = IndelData::new(IndelKey::insertion(50, 1), 2);
        data.add_observation(1, &IndelObservation::external_candidate())
            .unwrap();
        data.add_observation(0, &IndelObservation::read(5, AlignTier::Tier1))
            .unwrap();
        assert!(data.is_external_candidate());
        assert!(!data.is_forced_output());
        // abstract observations do not populate evidence sets
        assert!(data.sample(1).unwrap().tier_of(0).is_none());
    }

    #[test]
    fn sample_index_is_checked() {
        let mut data = IndelData::new(IndelKey::insertion(50, 1), 1);
        assert!(matches!(
            data.add_observation(3, &IndelObservation::read(1, AlignTier::Tier1)),
            Err(EvidenceError::SampleOutOfRange { sample_index: 3, sample_count: 1 })
        ));
    }
}
