use std::collections::HashMap;

use crate::evidence::EvidenceError;

/// Accumulates inserted-sequence observations and derives a consensus.
///
/// Observations are buffered until [`finalize`](Self::finalize) runs; the
/// consensus is the longest observed sequence, with length ties going to the
/// strictly higher count (first seen wins an exact tie). The previous
/// consensus competes in the next round with a count of zero.
#[derive(Debug, Clone, Default)]
pub struct InsertSequenceManager {
    obs: Vec<(String, u32)>,
    index: HashMap<String, usize>,
    consensus: String,
    is_consensus: bool,
}

impl InsertSequenceManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `seq`. Invalidates any computed consensus.
    pub fn add_observation(&mut self, seq: &str) {
        self.is_consensus = false;
        match self.index.get(seq) {
            Some(&slot) => self.obs[slot].1 += 1,
            None => {
                self.index.insert(seq.to_string(), self.obs.len());
                self.obs.push((seq.to_string(), 1));
            }
        }
    }

    /// Whether the consensus reflects every observation so far.
    pub fn is_consensus(&self) -> bool {
        self.is_consensus
    }

    /// Number of distinct sequences waiting for the next finalize.
    pub fn pending_variants(&self) -> usize {
        self.obs.len()
    }

    /// Select the consensus from buffered observations and clear the buffer.
    pub fn finalize(&mut self) {
        let mut candidate = std::mem::take(&mut self.consensus);
        let mut count = 0u32;

        for (seq, seq_count) in self.obs.drain(..) {
            if seq.len() < candidate.len() {
                continue;
            }
            if seq.len() == candidate.len() && seq_count <= count {
                continue;
            }
            candidate = seq;
            count = seq_count;
        }

        self.index.clear();
        self.consensus = candidate;
        self.is_consensus = true;
    }

    /// Consensus sequence, finalizing first when observations are pending.
    pub fn consensus(&mut self) -> &str {
        if !self.is_consensus {
            self.finalize();
        }
        &self.consensus
    }

    /// Consensus sequence without finalizing.
    ///
    /// Reading after a mutation without re-finalizing is a caller error.
    pub fn try_consensus(&self) -> Result<&str, EvidenceError> {
        if self.is_consensus {
            Ok(&self.consensus)
        } else {
            Err(EvidenceError::StaleConsensus)
        }
    }
}
