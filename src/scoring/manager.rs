use std::sync::Arc;

use tracing::trace;

use crate::config::{DerivedOptions, FilterOptions, ScoringOptions};
use crate::locus::{GermlineFilter, IndelLocus, LocusSampleInfo, SimplifiedIndelType, SiteLocus};
use crate::scoring::{
    default_classify_indel, default_classify_site, indel_features, site_features, ScoringModels,
    VariantScoringModel,
};
use crate::stats::{error_prob_to_qphred, IndelGenotype};

/// Cap on empirical variant scores.
pub const MAX_EMPIRICAL_SCORE: i32 = 60;

/// GQX from the flat-prior and population-prior calls.
///
/// Disagreement between the two calls means the record sits on the boundary
/// between variant and reference, so GQX is zero.
pub fn refined_gqx<G: PartialEq>(max_gt: G, max_gt_qphred: i32, max_gt_poly: G, max_gt_poly_qphred: i32) -> i32 {
    if max_gt != max_gt_poly {
        0
    } else {
        max_gt_poly_qphred.min(max_gt_qphred)
    }
}

/// Assigns qualities and filters to site and indel records, using empirical
/// models where available and threshold filters otherwise.
#[derive(Debug, Clone)]
pub struct ScoringModelManager {
    filters: FilterOptions,
    derived: DerivedOptions,
    scoring: ScoringOptions,
    models: Arc<ScoringModels>,
}

impl ScoringModelManager {
    /// Manager for one contig.
    pub fn new(
        filters: FilterOptions,
        scoring: ScoringOptions,
        derived: DerivedOptions,
        models: Arc<ScoringModels>,
    ) -> Self {
        Self {
            filters,
            derived,
            scoring,
            models,
        }
    }

    /// Whether an SNV model is loaded.
    pub fn is_evs_site_model(&self) -> bool {
        self.models.snv().is_some()
    }

    /// Whether an indel model is loaded.
    pub fn is_evs_indel_model(&self) -> bool {
        self.models.indel().is_some()
    }

    /// Refine GQX of every site sample from the genotype call.
    pub fn refine_site_sample_values(&self, site: &mut SiteLocus) {
        let call = &site.call;
        let gqx = refined_gqx(call.max_gt, call.max_gt_qphred, call.max_gt_poly, call.max_gt_poly_qphred);
        for sample in &mut site.samples {
            sample.gq = call.max_gt_poly_qphred;
            sample.gqx = gqx;
        }
    }

    /// Classify one site.
    pub fn classify_site(&self, site: &mut SiteLocus) {
        self.refine_site_sample_values(site);

        if site.is_snp() && self.scoring.report_evs_features {
            site.features = Some(site_features(site, self.derived.norm_depth));
        }

        match self.models.snv() {
            Some(model) if site.is_simple_snv() => {
                if site.features.is_none() {
                    site.features = Some(site_features(site, self.derived.norm_depth));
                }
                let score = empirical_score(model, site.features.as_deref().unwrap_or_default());
                site.empirical_score = Some(score);
                if score < self.scoring.snv_evs_threshold {
                    site.filters.set(GermlineFilter::LowGQX);
                }
                trace!(pos = site.pos, score, "scored site");
            }
            _ => default_classify_site(site, &self.filters, &self.derived),
        }
    }

    /// Whether the first allele of `locus` can be scored empirically.
    pub fn is_indel_usable_in_model(&self, locus: &IndelLocus) -> bool {
        locus.first_allele().is_some_and(|allele| {
            matches!(
                allele.report.kind,
                SimplifiedIndelType::Insert | SimplifiedIndelType::Delete | SimplifiedIndelType::Swap
            ) && allele.call.max_gt != IndelGenotype::NoIndel
        })
    }

    /// Classify one indel locus.
    pub fn classify_indel(&self, locus: &mut IndelLocus) {
        let usable = self.is_indel_usable_in_model(locus);
        self.classify_indel_impl(usable, locus);
    }

    /// Classify overlapping indel loci together.
    ///
    /// Empirical scoring applies to the cluster only when every member is
    /// usable; the first unusable member sends the whole cluster to the
    /// default filters.
    pub fn classify_indels(&self, loci: &mut [IndelLocus]) {
        let usable = loci.iter().all(|locus| self.is_indel_usable_in_model(locus));
        for locus in loci.iter_mut() {
            self.classify_indel_impl(usable, locus);
        }
    }

    fn refine_indel_sample_values(locus: &IndelLocus, sample: &mut LocusSampleInfo) {
        let Some(allele) = locus.first_allele() else {
            return;
        };
        let call = &allele.call;
        sample.gq = call.max_gt_poly_qphred;
        sample.gqx = refined_gqx(call.max_gt, call.max_gt_qphred, call.max_gt_poly, call.max_gt_poly_qphred);
    }

    fn classify_indel_impl(&self, usable: bool, locus: &mut IndelLocus) {
        let mut samples = std::mem::take(&mut locus.samples);
        for sample in &mut samples {
            Self::refine_indel_sample_values(locus, sample);
        }
        locus.samples = samples;

        if usable && self.scoring.report_evs_features {
            locus.features = Some(indel_features(locus, self.derived.norm_depth));
        }

        match self.models.indel() {
            Some(model) if usable => {
                if locus.features.is_none() {
                    locus.features = Some(indel_features(locus, self.derived.norm_depth));
                }
                let score = empirical_score(model, locus.features.as_deref().unwrap_or_default());
                locus.empirical_score = Some(score);
                if score < self.scoring.indel_evs_threshold {
                    locus.filters.set(GermlineFilter::LowGQX);
                }
                trace!(pos = locus.pos, score, "scored indel");
            }
            _ => default_classify_indel(locus, &self.filters, &self.derived),
        }
    }
}

fn empirical_score(model: &dyn VariantScoringModel, features: &[f64]) -> i32 {
    error_prob_to_qphred(model.score_variant(features)).min(MAX_EMPIRICAL_SCORE)
}
