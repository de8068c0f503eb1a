use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::{base_index, BaseCall, BASES, NUM_BASES};
use crate::stats::{error_prob_to_qphred, ln_sum, normalize_ln_probs, qphred_to_error_prob};

/// Unordered pair of nucleotide indices forming a diploid genotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiploidGenotype {
    allele1: u8,
    allele2: u8,
}

impl DiploidGenotype {
    /// Genotype from two nucleotide indices (order irrelevant).
    pub fn new(allele1: usize, allele2: usize) -> Self {
        let (lo, hi) = if allele1 <= allele2 {
            (allele1, allele2)
        } else {
            (allele2, allele1)
        };
        Self {
            allele1: lo as u8,
            allele2: hi as u8,
        }
    }

    /// Genotype from two ASCII bases, `None` if either is ambiguous.
    pub fn from_bases(base1: u8, base2: u8) -> Option<Self> {
        Some(Self::new(base_index(base1)?, base_index(base2)?))
    }

    /// Homozygous genotype of `allele`.
    pub fn hom(allele: usize) -> Self {
        Self::new(allele, allele)
    }

    /// All ten diploid genotypes over A, C, G, T.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_BASES).flat_map(|a| (a..NUM_BASES).map(move |b| Self::new(a, b)))
    }

    /// Nucleotide indices `(low, high)`.
    pub fn alleles(&self) -> (usize, usize) {
        (self.allele1 as usize, self.allele2 as usize)
    }

    /// Whether the two alleles differ.
    pub fn is_het(&self) -> bool {
        self.allele1 != self.allele2
    }

    /// Whether the genotype carries nucleotide index `allele`.
    pub fn contains(&self, allele: usize) -> bool {
        self.allele1 as usize == allele || self.allele2 as usize == allele
    }

    /// Heterozygous with neither allele matching the reference.
    pub fn is_hetalt(&self, ref_allele: usize) -> bool {
        self.is_het() && !self.contains(ref_allele)
    }

    /// Any allele differs from the reference.
    pub fn is_variant(&self, ref_allele: usize) -> bool {
        self.allele1 as usize != ref_allele || self.allele2 as usize != ref_allele
    }
}

impl fmt::Display for DiploidGenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            BASES[self.allele1 as usize] as char,
            BASES[self.allele2 as usize] as char
        )
    }
}

/// Population priors of the genotype models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenotypeParams {
    /// Expected SNV heterozygosity of the population.
    pub snp_theta: f64,
    /// Expected indel heterozygosity of the population.
    pub indel_theta: f64,
}

impl Default for GenotypeParams {
    fn default() -> Self {
        Self {
            snp_theta: 0.001,
            indel_theta: 0.0001,
        }
    }
}

/// Result of diploid genotyping at one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteGenotypeCall {
    /// Most likely genotype under a flat prior.
    pub max_gt: DiploidGenotype,
    /// Phred confidence of `max_gt` under a flat prior.
    pub max_gt_qphred: i32,
    /// Most likely genotype under the population prior.
    pub max_gt_poly: DiploidGenotype,
    /// Phred confidence of `max_gt_poly` under the population prior.
    pub max_gt_poly_qphred: i32,
    /// Phred confidence that the site is not homozygous reference.
    pub snp_qphred: i32,
}

impl SiteGenotypeCall {
    /// Call asserting `genotype` with the same confidence for every quality.
    pub fn fixed(genotype: DiploidGenotype, qphred: i32) -> Self {
        Self {
            max_gt: genotype,
            max_gt_qphred: qphred,
            max_gt_poly: genotype,
            max_gt_poly_qphred: qphred,
            snp_qphred: qphred,
        }
    }
}

fn ln_site_prior(gt: DiploidGenotype, ref_allele: usize, theta: f64) -> f64 {
    let prior = if !gt.is_variant(ref_allele) {
        1.0 - theta * (1.5 + theta / 2.0)
    } else if gt.is_hetalt(ref_allele) {
        theta * theta / 6.0
    } else if gt.is_het() {
        theta / 3.0
    } else {
        theta / 6.0
    };
    prior.ln()
}

fn ln_call_likelihood(call: &BaseCall, gt: DiploidGenotype) -> f64 {
    let error = qphred_to_error_prob(call.qscore).min(0.75);
    let observed = base_index(call.base);
    let (a1, a2) = gt.alleles();
    let allele_prob = |allele: usize| {
        if observed == Some(allele) {
            1.0 - error
        } else {
            error / 3.0
        }
    };
    (0.5 * allele_prob(a1) + 0.5 * allele_prob(a2)).ln()
}

fn confidence(posteriors: &[f64], best: usize) -> i32 {
    let error: f64 = posteriors
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != best)
        .map(|(_, p)| p)
        .sum();
    error_prob_to_qphred(error)
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0
}

/// Diploid genotype likelihood caller over one position's base calls.
///
/// Filtered calls are ignored. Returns `None` when the reference base is
/// ambiguous or no usable call covers the site.
pub fn call_site_genotype(
    calls: &[BaseCall],
    ref_base: u8,
    params: &GenotypeParams,
) -> Option<SiteGenotypeCall> {
    let ref_allele = base_index(ref_base)?;
    let usable: Vec<&BaseCall> = calls
        .iter()
        .filter(|call| !call.is_filtered && base_index(call.base).is_some())
        .collect();
    if usable.is_empty() {
        return None;
    }

    let genotypes: Vec<DiploidGenotype> = DiploidGenotype::all().collect();
    let ln_likelihoods: Vec<f64> = genotypes
        .iter()
        .map(|&gt| usable.iter().map(|call| ln_call_likelihood(call, gt)).sum())
        .collect();
    let ln_posteriors: Vec<f64> = genotypes
        .iter()
        .zip(&ln_likelihoods)
        .map(|(&gt, &ll)| ll + ln_site_prior(gt, ref_allele, params.snp_theta))
        .collect();

    let flat = normalize_ln_probs(&ln_likelihoods);
    let poly = normalize_ln_probs(&ln_posteriors);
    let best_flat = argmax(&flat);
    let best_poly = argmax(&poly);
    let homref = genotypes
        .iter()
        .position(|gt| !gt.is_variant(ref_allele))
        .unwrap_or(0);

    Some(SiteGenotypeCall {
        max_gt: genotypes[best_flat],
        max_gt_qphred: confidence(&flat, best_flat),
        max_gt_poly: genotypes[best_poly],
        max_gt_poly_qphred: confidence(&poly, best_poly),
        snp_qphred: error_prob_to_qphred(poly[homref]),
    })
}

/// Diploid indel genotype states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndelGenotype {
    /// Homozygous reference.
    NoIndel,
    /// Heterozygous indel.
    Het,
    /// Homozygous indel.
    Hom,
}

impl IndelGenotype {
    const ALL: [IndelGenotype; 3] = [IndelGenotype::NoIndel, IndelGenotype::Het, IndelGenotype::Hom];

    /// Expected fraction of reads carrying the indel.
    pub fn indel_fraction(self) -> f64 {
        match self {
            IndelGenotype::NoIndel => 0.0,
            IndelGenotype::Het => 0.5,
            IndelGenotype::Hom => 1.0,
        }
    }

    /// VCF genotype string.
    pub fn label(self) -> &'static str {
        match self {
            IndelGenotype::NoIndel => "0/0",
            IndelGenotype::Het => "0/1",
            IndelGenotype::Hom => "1/1",
        }
    }

    fn ln_prior(self, theta: f64) -> f64 {
        match self {
            IndelGenotype::NoIndel => (1.0 - 1.5 * theta).ln(),
            IndelGenotype::Het => theta.ln(),
            IndelGenotype::Hom => (theta / 2.0).ln(),
        }
    }
}

/// Result of diploid genotyping of one indel allele in one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct IndelGenotypeCall {
    /// Most likely genotype under a flat prior.
    pub max_gt: IndelGenotype,
    /// Phred confidence of `max_gt` under a flat prior.
    pub max_gt_qphred: i32,
    /// Most likely genotype under the population prior.
    pub max_gt_poly: IndelGenotype,
    /// Phred confidence of `max_gt_poly` under the population prior.
    pub max_gt_poly_qphred: i32,
    /// Phred confidence that the indel is present.
    pub indel_qphred: i32,
}

impl IndelGenotypeCall {
    /// Call for a locus with no informative reads.
    pub fn uninformative() -> Self {
        Self {
            max_gt: IndelGenotype::NoIndel,
            max_gt_qphred: 0,
            max_gt_poly: IndelGenotype::NoIndel,
            max_gt_poly_qphred: 0,
            indel_qphred: 0,
        }
    }
}

/// Genotype one indel from tier 1 read path scores.
///
/// Each read contributes `ln((1-f) P(ref path) + f P(indel path))` where `f` is
/// the genotype's indel fraction and the reference path is the best of the
/// reference and alternate-indel alignments.
pub fn call_indel_genotype<'a, I>(read_scores: I, params: &GenotypeParams) -> IndelGenotypeCall
where
    I: IntoIterator<Item = &'a crate::evidence::ReadPathScores>,
{
    let mut ln_likelihoods = [0.0f64; 3];
    let mut informative = 0usize;
    for scores in read_scores.into_iter().filter(|s| s.is_tier1_read) {
        informative += 1;
        let ref_lnp = scores.best_non_indel_score();
        for (slot, gt) in IndelGenotype::ALL.iter().enumerate() {
            let f = gt.indel_fraction();
            ln_likelihoods[slot] += ln_sum((1.0 - f).ln() + ref_lnp, f.ln() + scores.indel_score);
        }
    }
    if informative == 0 {
        return IndelGenotypeCall::uninformative();
    }

    let ln_posteriors: Vec<f64> = IndelGenotype::ALL
        .iter()
        .zip(ln_likelihoods.iter())
        .map(|(gt, ll)| ll + gt.ln_prior(params.indel_theta))
        .collect();
    let flat = normalize_ln_probs(&ln_likelihoods);
    let poly = normalize_ln_probs(&ln_posteriors);
    let best_flat = argmax(&flat);
    let best_poly = argmax(&poly);

    IndelGenotypeCall {
        max_gt: IndelGenotype::ALL[best_flat],
        max_gt_qphred: confidence(&flat, best_flat),
        max_gt_poly: IndelGenotype::ALL[best_poly],
        max_gt_poly_qphred: confidence(&poly, best_poly),
        indel_qphred: error_prob_to_qphred(poly[0]),
    }
}
