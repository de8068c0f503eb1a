use std::collections::BTreeMap;

use tracing::warn;

use crate::evidence::{
    AlignTier, EvidenceError, IndelData, IndelKey, IndelObservation, ReadId, ReadPathScores,
};

/// Per-contig store of indel evidence, ordered by [`IndelKey`].
#[derive(Debug, Clone)]
pub struct IndelBuffer {
    sample_count: usize,
    indels: BTreeMap<IndelKey, IndelData>,
}

impl IndelBuffer {
    /// Create an empty buffer tracking `sample_count` samples per indel.
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            indels: BTreeMap::new(),
        }
    }

    /// Number of indels currently buffered.
    pub fn len(&self) -> usize {
        self.indels.len()
    }

    /// Whether no indel is buffered.
    pub fn is_empty(&self) -> bool {
        self.indels.is_empty()
    }

    fn check_sample(&self, sample_index: usize) -> Result<(), EvidenceError> {
        if sample_index < self.sample_count {
            Ok(())
        } else {
            Err(EvidenceError::SampleOutOfRange {
                sample_index,
                sample_count: self.sample_count,
            })
        }
    }

    fn entry(&mut self, key: IndelKey) -> &mut IndelData {
        let sample_count = self.sample_count;
        self.indels
            .entry(key)
            .or_insert_with(|| IndelData::new(key, sample_count))
    }

    /// Add one observation for `key`, creating the indel on first sight.
    pub fn add_observation(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        obs: &IndelObservation,
    ) -> Result<(), EvidenceError> {
        let is_new = !self.indels.contains_key(&key);
        let result = self.entry(key).add_observation(sample_index, obs);
        if let Err(err) = &result {
            warn!(indel = %key, error = %err, "rejected indel observation");
            if is_new {
                self.indels.remove(&key);
            }
        }
        result
    }

    /// Store path scores of `read_id` for `key`.
    pub fn set_read_path_scores(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        read_id: ReadId,
        scores: ReadPathScores,
    ) -> Result<(), EvidenceError> {
        self.check_sample(sample_index)?;
        self.entry(key)
            .sample_mut(sample_index)?
            .set_read_path_scores(read_id, scores);
        Ok(())
    }

    /// Record a read overlapping `key` without supporting it.
    pub fn add_suboverlap_read(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        read_id: ReadId,
        tier: AlignTier,
    ) -> Result<(), EvidenceError> {
        self.check_sample(sample_index)?;
        self.entry(key)
            .sample_mut(sample_index)?
            .add_suboverlap_read(read_id, tier);
        Ok(())
    }

    /// Evidence for `key`, if any.
    pub fn get(&self, key: &IndelKey) -> Option<&IndelData> {
        self.indels.get(key)
    }

    /// Mutable evidence for `key`, if any.
    pub fn get_mut(&mut self, key: &IndelKey) -> Option<&mut IndelData> {
        self.indels.get_mut(key)
    }

    /// Iterate buffered indels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IndelKey, &IndelData)> {
        self.indels.iter()
    }

    /// Remove and return every indel positioned at or before `pos`, in key order.
    pub fn drain_through(&mut self, pos: u32) -> Vec<IndelData> {
        let rest = match pos.checked_add(1) {
            Some(next) => self
                .indels
                .split_off(&IndelKey::new(next, crate::evidence::IndelType::Insert, 0)),
            None => BTreeMap::new(),
        };
        let done = std::mem::replace(&mut self.indels, rest);
        done.into_values().collect()
    }
}
