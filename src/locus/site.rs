use std::fmt;

use crate::evidence::{base_index, BaseCall, PositionSummary, BASES};
use crate::locus::FilterSet;
use crate::stats::{call_site_genotype, strand_bias_score, DiploidGenotype, GenotypeParams, SiteGenotypeCall};

/// Per-sample genotype qualities and filters of a locus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocusSampleInfo {
    /// Depth supporting the call (used basecalls for sites, tier 1 reads for
    /// indels).
    pub depth: u32,
    /// Genotype quality.
    pub gq: i32,
    /// Genotype quality refined against the flat-prior call.
    pub gqx: i32,
    /// Filters specific to this sample.
    pub filters: FilterSet,
}

/// Multi-base allele produced by merging a run of phased heterozygous SNVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasedAllele {
    /// Reference sequence over the run span.
    pub phased_ref: String,
    /// Non-reference haplotype fragments, comma-joined.
    pub phased_alt: String,
    /// Read support of the two leading fragments, strongest first.
    pub allele_depths: Vec<(String, u32)>,
}

impl PhasedAllele {
    /// Number of reference bases covered.
    pub fn span(&self) -> u32 {
        self.phased_ref.len() as u32
    }
}

/// Genotyped single-base site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteLocus {
    /// Contig position (0-based).
    pub pos: u32,
    /// Reference base, uppercase ASCII.
    pub ref_base: u8,
    /// Diploid genotype call.
    pub call: SiteGenotypeCall,
    /// Base counts at the site.
    pub summary: PositionSummary,
    /// Homopolymer length around the site.
    pub hpol: u32,
    /// Per-sample values.
    pub samples: Vec<LocusSampleInfo>,
    /// Record-level filters.
    pub filters: FilterSet,
    /// Empirical feature vector, computed on first use.
    pub features: Option<Vec<f64>>,
    /// Empirical variant score (phred).
    pub empirical_score: Option<i32>,
    /// Merged allele when this record stands for a phased run.
    pub phased: Option<PhasedAllele>,
}

impl SiteLocus {
    /// Site with a single sample carrying `call`.
    pub fn new(pos: u32, ref_base: u8, call: SiteGenotypeCall, summary: PositionSummary) -> Self {
        let sample = LocusSampleInfo {
            depth: summary.n_used_calls,
            gq: call.max_gt_poly_qphred,
            gqx: call.max_gt_poly_qphred,
            filters: FilterSet::new(),
        };
        Self {
            pos,
            ref_base: ref_base.to_ascii_uppercase(),
            call,
            summary,
            hpol: 0,
            samples: vec![sample],
            filters: FilterSet::new(),
            features: None,
            empirical_score: None,
            phased: None,
        }
    }

    /// Genotype the calls at `pos`; `None` when nothing usable covers the site.
    pub fn from_calls(pos: u32, ref_base: u8, calls: &[BaseCall], params: &GenotypeParams) -> Option<Self> {
        let call = call_site_genotype(calls, ref_base, params)?;
        let mut summary = PositionSummary::new(pos);
        for base_call in calls {
            summary.observe(base_call);
        }
        Some(Self::new(pos, ref_base, call, summary))
    }

    /// Set the homopolymer length.
    pub fn with_hpol(mut self, hpol: u32) -> Self {
        self.hpol = hpol;
        self
    }

    /// Reported genotype.
    pub fn genotype(&self) -> DiploidGenotype {
        self.call.max_gt_poly
    }

    /// Index of the reference base, `None` when ambiguous.
    pub fn ref_allele(&self) -> Option<usize> {
        base_index(self.ref_base)
    }

    /// Whether the reported genotype differs from the reference.
    pub fn is_snp(&self) -> bool {
        self.ref_allele()
            .is_some_and(|ref_allele| self.genotype().is_variant(ref_allele))
    }

    /// Heterozygous SNV, including het-alt.
    pub fn is_het(&self) -> bool {
        self.is_snp() && self.genotype().is_het()
    }

    /// Heterozygous with no reference allele.
    pub fn is_hetalt(&self) -> bool {
        self.ref_allele()
            .is_some_and(|ref_allele| self.genotype().is_hetalt(ref_allele))
    }

    /// Whether this record is a merged phased run.
    pub fn is_phased_region(&self) -> bool {
        self.phased.is_some()
    }

    /// Simple substitution eligible for the SNV model.
    pub fn is_simple_snv(&self) -> bool {
        self.is_snp() && !self.is_phased_region()
    }

    /// Genotype alleles as ASCII bases.
    pub fn genotype_bases(&self) -> (u8, u8) {
        let (a1, a2) = self.genotype().alleles();
        (BASES[a1], BASES[a2])
    }

    /// Non-reference alleles of the genotype, ascending.
    pub fn alt_alleles(&self) -> Vec<usize> {
        let (a1, a2) = self.genotype().alleles();
        let mut alts: Vec<usize> = [a1, a2]
            .into_iter()
            .filter(|&allele| Some(allele) != self.ref_allele())
            .collect();
        alts.dedup();
        alts
    }

    /// Variant quality.
    pub fn qual(&self) -> i32 {
        self.call.snp_qphred
    }

    /// All basecalls at the site, used or filtered.
    pub fn total_depth(&self) -> u32 {
        self.summary.total_calls()
    }

    /// Fraction of basecalls filtered out of genotyping.
    pub fn unused_fraction(&self) -> f64 {
        let total = self.total_depth();
        if total == 0 {
            return 0.0;
        }
        self.summary.n_unused_calls as f64 / total as f64
    }

    /// Used basecalls supporting allele index `allele`.
    pub fn allele_depth(&self, allele: usize) -> u32 {
        self.summary.base_counts.get(allele).copied().unwrap_or(0)
    }

    /// Phred strand-bias score between the reference and the first alternate
    /// allele, 0 when either is missing.
    pub fn strand_bias(&self) -> f64 {
        let (Some(ref_allele), Some(&alt)) = (self.ref_allele(), self.alt_alleles().first()) else {
            return 0.0;
        };
        let summary = &self.summary;
        strand_bias_score(
            summary.fwd_counts[ref_allele],
            summary.rev_count(ref_allele),
            summary.fwd_counts[alt],
            summary.rev_count(alt),
        )
    }
}

impl fmt::Display for SiteLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phased {
            Some(phased) => write!(
                f,
                "{}\t{}\t{}\t{}",
                self.pos, phased.phased_ref, phased.phased_alt, self.filters
            ),
            None => write!(
                f,
                "{}\t{}\t{}\t{}",
                self.pos,
                self.ref_base as char,
                self.genotype(),
                self.filters
            ),
        }
    }
}
