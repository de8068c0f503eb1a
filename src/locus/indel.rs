use std::fmt;

use crate::evidence::{EvidenceError, IndelData, IndelKey};
use crate::locus::{FilterSet, IndelReportInfo, LocusSampleInfo, ReferenceWindow};
use crate::stats::{call_indel_genotype, GenotypeParams, IndelGenotypeCall};

/// One alternate allele of an indel locus.
#[derive(Debug, Clone, PartialEq)]
pub struct IndelAllele {
    /// Indel identity.
    pub key: IndelKey,
    /// Consensus inserted sequence (empty for pure deletions).
    pub insert_seq: String,
    /// Repeat context.
    pub report: IndelReportInfo,
    /// Genotype call of the allele.
    pub call: IndelGenotypeCall,
}

/// Genotyped indel locus with one or more alternate alleles.
#[derive(Debug, Clone, PartialEq)]
pub struct IndelLocus {
    /// Contig position of the first allele.
    pub pos: u32,
    /// Alternate alleles, first one drives classification.
    pub alleles: Vec<IndelAllele>,
    /// Per-sample values.
    pub samples: Vec<LocusSampleInfo>,
    /// Record-level filters.
    pub filters: FilterSet,
    /// Empirical feature vector, computed on first use.
    pub features: Option<Vec<f64>>,
    /// Empirical variant score (phred).
    pub empirical_score: Option<i32>,
}

impl IndelLocus {
    /// Locus from explicit alleles and per-sample tier 1 depths.
    pub fn new(alleles: Vec<IndelAllele>, tier1_depths: &[u32]) -> Self {
        let pos = alleles.first().map_or(0, |allele| allele.key.pos);
        let samples = tier1_depths
            .iter()
            .map(|&depth| LocusSampleInfo {
                depth,
                ..LocusSampleInfo::default()
            })
            .collect();
        Self {
            pos,
            alleles,
            samples,
            filters: FilterSet::new(),
            features: None,
            empirical_score: None,
        }
    }

    /// Genotype a finished indel from its accumulated evidence.
    ///
    /// The genotype is called from the first sample's read path scores; every
    /// sample reports its own tier 1 depth.
    pub fn from_evidence(
        data: &mut IndelData,
        reference: &ReferenceWindow<'_>,
        params: &GenotypeParams,
    ) -> Result<Self, EvidenceError> {
        let key = *data.key();
        let insert_seq = data.insert_seq()?.to_string();
        let report = IndelReportInfo::from_reference(&key, &insert_seq, reference);
        let call = call_indel_genotype(data.sample(0)?.read_path_scores().values(), params);
        let depths = (0..data.sample_count())
            .map(|index| data.sample(index).map(|sample| sample.tier1_depth()))
            .collect::<Result<Vec<u32>, EvidenceError>>()?;
        let allele = IndelAllele {
            key,
            insert_seq,
            report,
            call,
        };
        Ok(Self::new(vec![allele], &depths))
    }

    /// Allele driving classification.
    pub fn first_allele(&self) -> Option<&IndelAllele> {
        self.alleles.first()
    }

    /// Variant quality of the first allele.
    pub fn qual(&self) -> i32 {
        self.first_allele().map_or(0, |allele| allele.call.indel_qphred)
    }

    /// Tier 1 depth of the first sample.
    pub fn first_sample_depth(&self) -> u32 {
        self.samples.first().map_or(0, |sample| sample.depth)
    }
}

impl fmt::Display for IndelLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.alleles.iter().map(|allele| allele.key.to_string()).collect();
        write!(f, "{}\t{}\t{}", self.pos, keys.join(","), self.filters)
    }
}
