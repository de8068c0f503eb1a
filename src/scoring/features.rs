//! Empirical scoring feature vectors.

use crate::locus::{IndelLocus, SiteLocus};

/// SNV features in model order.
pub const SNV_FEATURES: &[&str] = &[
    "QUAL",
    "F_GQX",
    "F_GQ",
    "I_SNVSB",
    "I_SNVHPOL",
    "F_DP_NORM",
    "F_DPF_NORM",
    "AD_ALT_FRAC",
];

/// Indel features in model order.
pub const INDEL_FEATURES: &[&str] = &[
    "QUAL",
    "F_GQX",
    "F_GQ",
    "REFREP1",
    "IDREP1",
    "RULEN1",
    "F_DP_NORM",
];

fn normalized(depth: u32, norm_depth: Option<f64>) -> f64 {
    match norm_depth {
        Some(norm) if norm > 0.0 => depth as f64 / norm,
        _ => depth as f64,
    }
}

/// SNV feature vector matching [`SNV_FEATURES`].
///
/// Depths are divided by `norm_depth` when the contig's expected depth is
/// known.
pub fn site_features(site: &SiteLocus, norm_depth: Option<f64>) -> Vec<f64> {
    let sample = site.samples.first();
    let used = site.summary.n_used_calls;
    let alt_depth: u32 = site
        .alt_alleles()
        .into_iter()
        .map(|allele| site.allele_depth(allele))
        .sum();
    let alt_frac = if used == 0 {
        0.0
    } else {
        alt_depth as f64 / used as f64
    };
    vec![
        site.qual() as f64,
        sample.map_or(0.0, |s| s.gqx as f64),
        sample.map_or(0.0, |s| s.gq as f64),
        site.strand_bias(),
        site.hpol as f64,
        normalized(used, norm_depth),
        normalized(site.summary.n_unused_calls, norm_depth),
        alt_frac,
    ]
}

/// Indel feature vector matching [`INDEL_FEATURES`].
pub fn indel_features(locus: &IndelLocus, norm_depth: Option<f64>) -> Vec<f64> {
    let sample = locus.samples.first();
    let report = locus.first_allele().map(|allele| &allele.report);
    vec![
        locus.qual() as f64,
        sample.map_or(0.0, |s| s.gqx as f64),
        sample.map_or(0.0, |s| s.gq as f64),
        report.map_or(0.0, |r| r.ref_repeat_count as f64),
        report.map_or(0.0, |r| r.indel_repeat_count as f64),
        report.map_or(0.0, |r| r.repeat_unit.len() as f64),
        normalized(locus.first_sample_depth(), norm_depth),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::PositionSummary;
    use crate::stats::{DiploidGenotype, SiteGenotypeCall};

    #[test]
    fn site_vector_matches_names() {
        let mut summary = PositionSummary::new(4);
        summary.base_counts = [6, 0, 0, 4];
        summary.fwd_counts = [3, 0, 0, 2];
        summary.n_used_calls = 10;
        summary.n_unused_calls = 2;
        let gt = DiploidGenotype::from_bases(b'A', b'T').unwrap();
        let site = SiteLocus::new(4, b'A', SiteGenotypeCall::fixed(gt, 45), summary).with_hpol(3);

        let features = site_features(&site, Some(20.0));
        assert_eq!(features.len(), SNV_FEATURES.len());
        assert_eq!(features[0], 45.0);
        assert_eq!(features[4], 3.0);
        assert!((features[5] - 0.5).abs() < 1e-12);
        assert!((features[7] - 0.4).abs() < 1e-12);

        let raw = site_features(&site, None);
        assert_eq!(raw[5], 10.0);
    }

    #[test]
    fn empty_indel_locus_has_zero_features() {
        let locus = IndelLocus::new(Vec::new(), &[]);
        let features = indel_features(&locus, None);
        assert_eq!(features, vec![0.0; INDEL_FEATURES.len()]);
    }
}
