use std::collections::BTreeMap;

use crate::evidence::ReadId;

/// Number of called nucleotides (A, C, G, T).
pub const NUM_BASES: usize = 4;

/// Nucleotides in index order.
pub const BASES: [u8; NUM_BASES] = [b'A', b'C', b'G', b'T'];

/// Index of a nucleotide in [`BASES`], `None` for ambiguous bases.
pub fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// One read's base call at one reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCall {
    /// Read the call came from.
    pub read_id: ReadId,
    /// Called base as uppercase ASCII.
    pub base: u8,
    /// Phred base quality.
    pub qscore: u8,
    /// Whether the read aligned to the forward strand.
    pub is_forward_strand: bool,
    /// Call excluded from genotyping (low quality, ambiguous base, ...).
    pub is_filtered: bool,
}

impl BaseCall {
    /// Unfiltered call.
    pub fn new(read_id: ReadId, base: u8, qscore: u8, is_forward_strand: bool) -> Self {
        let base = base.to_ascii_uppercase();
        Self {
            read_id,
            base,
            qscore,
            is_forward_strand,
            is_filtered: base_index(base).is_none(),
        }
    }

    /// Mark the call as filtered.
    pub fn filtered(mut self) -> Self {
        self.is_filtered = true;
        self
    }
}

/// Aggregated base-call statistics for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSummary {
    /// Genomic coordinate (0-based).
    pub position: u32,
    /// Unfiltered call counts per base [A, C, G, T].
    pub base_counts: [u32; NUM_BASES],
    /// Unfiltered forward-strand counts per base.
    pub fwd_counts: [u32; NUM_BASES],
    /// Sum of base error probabilities per base.
    pub error_sums: [f64; NUM_BASES],
    /// Calls used for genotyping.
    pub n_used_calls: u32,
    /// Calls filtered out of genotyping.
    pub n_unused_calls: u32,
}

impl PositionSummary {
    /// Empty summary for `position`.
    pub fn new(position: u32) -> Self {
        Self {
            position,
            base_counts: [0; NUM_BASES],
            fwd_counts: [0; NUM_BASES],
            error_sums: [0.0; NUM_BASES],
            n_used_calls: 0,
            n_unused_calls: 0,
        }
    }

    /// Fold one call into the summary.
    pub fn observe(&mut self, call: &BaseCall) {
        match base_index(call.base) {
            Some(idx) if !call.is_filtered => {
                self.base_counts[idx] += 1;
                if call.is_forward_strand {
                    self.fwd_counts[idx] += 1;
                }
                self.error_sums[idx] += crate::stats::qphred_to_error_prob(call.qscore);
                self.n_used_calls += 1;
            }
            _ => self.n_unused_calls += 1,
        }
    }

    /// Total calls, used or not.
    pub fn total_calls(&self) -> u32 {
        self.n_used_calls + self.n_unused_calls
    }

    /// Reverse-strand count of base index `idx`.
    pub fn rev_count(&self, idx: usize) -> u32 {
        self.base_counts[idx] - self.fwd_counts[idx]
    }
}

/// Per-position buffer of read base calls for one contig.
#[derive(Debug, Clone, Default)]
pub struct BaseCallBuffer {
    positions: BTreeMap<u32, Vec<BaseCall>>,
}

impl BaseCallBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call at `pos`.
    pub fn insert_call(&mut self, pos: u32, call: BaseCall) {
        self.positions.entry(pos).or_default().push(call);
    }

    /// Record every base of a contiguously aligned read starting at `start`.
    pub fn insert_read(
        &mut self,
        read_id: ReadId,
        start: u32,
        sequence: &[u8],
        qscore: u8,
        is_forward_strand: bool,
    ) {
        for (offset, &base) in sequence.iter().enumerate() {
            self.insert_call(
                start + offset as u32,
                BaseCall::new(read_id, base, qscore, is_forward_strand),
            );
        }
    }

    /// Calls at `pos` in insertion order.
    pub fn calls_at(&self, pos: u32) -> &[BaseCall] {
        self.positions.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Aggregated statistics at `pos`.
    pub fn summary_at(&self, pos: u32) -> PositionSummary {
        let mut summary = PositionSummary::new(pos);
        for call in self.calls_at(pos) {
            summary.observe(call);
        }
        summary
    }

    /// Positions holding at least one call, ascending.
    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.positions.keys().copied()
    }

    /// Release every position at or before `pos`.
    pub fn clear_through(&mut self, pos: u32) {
        self.positions = match pos.checked_add(1) {
            Some(next) => self.positions.split_off(&next),
            None => BTreeMap::new(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_aggregates_counts() {
        let mut buffer = BaseCallBuffer::new();
        buffer.insert_read(1, 100, b"ACGT", 30, true);
        buffer.insert_read(2, 101, b"CGNA", 25, false);

        let first = buffer.summary_at(100);
        assert_eq!(first.position, 100);
        assert_eq!(first.n_used_calls, 1);

        let third = buffer.summary_at(103);
        assert_eq!(third.n_used_calls, 1);
        assert_eq!(third.n_unused_calls, 1);
        assert_eq!(third.base_counts[3], 1);

        let second = buffer.summary_at(101);
        assert_eq!(second.base_counts[1], 2);
        assert_eq!(second.fwd_counts[1], 1);
        assert_eq!(second.rev_count(1), 1);
    }

    #[test]
    fn clear_through_releases_prefix() {
        let mut buffer = BaseCallBuffer::new();
        buffer.insert_read(1, 10, b"ACGTA", 30, true);
        buffer.clear_through(12);
        assert!(buffer.calls_at(12).is_empty());
        assert_eq!(buffer.calls_at(13).len(), 1);
        assert_eq!(buffer.positions().next(), Some(13));
    }
}
