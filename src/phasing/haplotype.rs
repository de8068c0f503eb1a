use std::collections::HashMap;

use crate::evidence::{BaseCall, ReadId};

/// Read haplotype fragments over a run of consecutive positions.
///
/// Fragments are tallied in the order their first supporting read was seen.
#[derive(Debug, Clone, Default)]
pub(crate) struct FragmentTally {
    counts: Vec<(String, u32)>,
    index: HashMap<String, usize>,
    /// Reads with a usable call at every position of the run.
    pub(crate) spanning_reads: u32,
    /// Reads covering only part of the run.
    pub(crate) partial_reads: u32,
}

impl FragmentTally {
    /// Build the tally from per-position calls, one slice per run position.
    pub(crate) fn from_calls(span: &[&[BaseCall]]) -> Self {
        let mut read_order: Vec<ReadId> = Vec::new();
        let mut read_bases: HashMap<ReadId, Vec<Option<u8>>> = HashMap::new();
        for (offset, calls) in span.iter().enumerate() {
            for call in calls.iter().filter(|call| !call.is_filtered) {
                let bases = read_bases.entry(call.read_id).or_insert_with(|| {
                    read_order.push(call.read_id);
                    vec![None; span.len()]
                });
                bases[offset] = Some(call.base);
            }
        }

        let mut tally = Self::default();
        for read_id in read_order {
            let Some(bases) = read_bases.get(&read_id) else {
                continue;
            };
            match bases.iter().copied().collect::<Option<Vec<u8>>>() {
                Some(fragment) => {
                    tally.spanning_reads += 1;
                    tally.add(String::from_utf8_lossy(&fragment).into_owned());
                }
                None => tally.partial_reads += 1,
            }
        }
        tally
    }

    fn add(&mut self, fragment: String) {
        match self.index.get(&fragment) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(fragment.clone(), self.counts.len());
                self.counts.push((fragment, 1));
            }
        }
    }

    /// Number of distinct fragments.
    pub(crate) fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Fragment and read count by first-seen slot.
    pub(crate) fn get(&self, slot: usize) -> &(String, u32) {
        &self.counts[slot]
    }

    /// Slots ordered by decreasing read count, first-seen first among equals.
    pub(crate) fn ranked(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = (0..self.counts.len()).collect();
        slots.sort_by(|&a, &b| self.counts[b].1.cmp(&self.counts[a].1));
        slots
    }
}
