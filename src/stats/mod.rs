//! Statistical utilities: the Fisher exact test, phred conversions and the
//! diploid site/indel genotype models.
//!
//! All functions are pure and hold no shared state.

mod fisher;
mod genotype;
mod phred;

pub use fisher::{fisher_exact_test, strand_bias_score, Alternative};
pub use genotype::{
    call_indel_genotype, call_site_genotype, DiploidGenotype, GenotypeParams, IndelGenotype,
    IndelGenotypeCall, SiteGenotypeCall,
};
pub use phred::{
    error_prob_to_phred, error_prob_to_qphred, ln_sum, normalize_ln_probs, qphred_to_error_prob,
    MAX_QPHRED,
};
