use std::fmt;

use bitvec::prelude::*;

/// Named germline filters that classification may set on a record or sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GermlineFilter {
    /// Genotype quality (or empirical score) below threshold.
    LowGQX,
    /// Depth above the contig-derived maximum.
    HighDepth,
    /// Too large a fraction of basecalls filtered out.
    HighBaseFilt,
    /// SNV strand bias above threshold.
    HighSNVSB,
    /// SNV inside an overly long homopolymer.
    HighSNVHPOL,
    /// Indel in an overly long short tandem repeat.
    HighRefRep,
    /// Adjacent heterozygous sites could not be consistently phased.
    PhasingConflict,
}

impl GermlineFilter {
    /// Number of filters.
    pub const COUNT: usize = 7;

    /// Every filter in bit order.
    pub const ALL: [GermlineFilter; Self::COUNT] = [
        GermlineFilter::LowGQX,
        GermlineFilter::HighDepth,
        GermlineFilter::HighBaseFilt,
        GermlineFilter::HighSNVSB,
        GermlineFilter::HighSNVHPOL,
        GermlineFilter::HighRefRep,
        GermlineFilter::PhasingConflict,
    ];

    /// VCF FILTER label.
    pub fn label(self) -> &'static str {
        match self {
            GermlineFilter::LowGQX => "LowGQX",
            GermlineFilter::HighDepth => "HighDepth",
            GermlineFilter::HighBaseFilt => "HighDPFRatio",
            GermlineFilter::HighSNVSB => "HighSNVSB",
            GermlineFilter::HighSNVHPOL => "HighSNVHPOL",
            GermlineFilter::HighRefRep => "HighREFREP",
            GermlineFilter::PhasingConflict => "PhasingConflict",
        }
    }

    fn bit(self) -> usize {
        self as usize
    }
}

/// Compact set of [`GermlineFilter`]s.
///
/// Filters are only ever added; nothing in the crate clears a bit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FilterSet {
    bits: BitArr!(for GermlineFilter::COUNT, in u16, Lsb0),
}

impl FilterSet {
    /// Empty (passing) set.
    pub fn new() -> Self {
        Self {
            bits: BitArray::ZERO,
        }
    }

    /// Add `filter`.
    pub fn set(&mut self, filter: GermlineFilter) {
        self.bits.set(filter.bit(), true);
    }

    /// Whether `filter` is present.
    pub fn test(&self, filter: GermlineFilter) -> bool {
        self.bits[filter.bit()]
    }

    /// Whether any filter is present.
    pub fn any(&self) -> bool {
        self.bits.any()
    }

    /// Add every filter of `other`.
    pub fn merge(&mut self, other: &FilterSet) {
        for filter in other.iter() {
            self.set(filter);
        }
    }

    /// Present filters in bit order.
    pub fn iter(&self) -> impl Iterator<Item = GermlineFilter> + '_ {
        GermlineFilter::ALL
            .into_iter()
            .filter(move |filter| self.test(*filter))
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.any() {
            return write!(f, "PASS");
        }
        let labels: Vec<&str> = self.iter().map(GermlineFilter::label).collect();
        write!(f, "{}", labels.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_passes() {
        let filters = FilterSet::new();
        assert!(!filters.any());
        assert_eq!(filters.to_string(), "PASS");
    }

    #[test]
    fn set_and_merge_accumulate() {
        let mut filters = FilterSet::new();
        filters.set(GermlineFilter::HighDepth);
        filters.set(GermlineFilter::HighDepth);

        let mut other = FilterSet::new();
        other.set(GermlineFilter::LowGQX);
        filters.merge(&other);

        assert!(filters.test(GermlineFilter::LowGQX));
        assert!(filters.test(GermlineFilter::HighDepth));
        assert!(!filters.test(GermlineFilter::PhasingConflict));
        assert_eq!(filters.to_string(), "LowGQX;HighDepth");
    }
}
