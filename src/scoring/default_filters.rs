//! Threshold filters applied when no empirical model scores a record.

use crate::config::{DerivedOptions, FilterOptions};
use crate::locus::{GermlineFilter, IndelLocus, LocusSampleInfo, SiteLocus};

fn filter_min_gqx(samples: &mut [LocusSampleInfo], options: &FilterOptions) {
    let Some(min_gqx) = options.min_gqx else {
        return;
    };
    for sample in samples.iter_mut().filter(|sample| sample.gqx < min_gqx) {
        sample.filters.set(GermlineFilter::LowGQX);
    }
}

/// Default site filters: GQX, depth, filtered-basecall fraction and, for SNVs,
/// strand bias and homopolymer length.
pub fn default_classify_site(site: &mut SiteLocus, options: &FilterOptions, derived: &DerivedOptions) {
    filter_min_gqx(&mut site.samples, options);

    if let Some(max_depth) = derived.max_depth {
        if site.total_depth() as f64 > max_depth {
            site.filters.set(GermlineFilter::HighDepth);
        }
    }
    if let Some(max_base_filt) = options.max_base_filt {
        if site.total_depth() > 0 && site.unused_fraction() > max_base_filt {
            site.filters.set(GermlineFilter::HighBaseFilt);
        }
    }
    if site.is_snp() {
        if let Some(max_snv_sb) = options.max_snv_sb {
            if site.strand_bias() > max_snv_sb {
                site.filters.set(GermlineFilter::HighSNVSB);
            }
        }
        if let Some(max_snv_hpol) = options.max_snv_hpol {
            if site.hpol > max_snv_hpol {
                site.filters.set(GermlineFilter::HighSNVHPOL);
            }
        }
    }
}

/// Default indel filters: GQX, first-sample tier 1 depth and reference repeat
/// count.
///
/// `HighRefRep` is set on the whole locus when any allele sits in a repeat of
/// unit length at most 2 with too many reference copies.
pub fn default_classify_indel(locus: &mut IndelLocus, options: &FilterOptions, derived: &DerivedOptions) {
    filter_min_gqx(&mut locus.samples, options);

    if let Some(max_depth) = derived.max_depth {
        if locus.first_sample_depth() as f64 > max_depth {
            locus.filters.set(GermlineFilter::HighDepth);
        }
    }
    if let Some(max_ref_rep) = options.max_ref_rep {
        let over_repeat = locus.alleles.iter().any(|allele| {
            let report = &allele.report;
            report.is_repeat_unit() && report.repeat_unit.len() <= 2 && report.ref_repeat_count > max_ref_rep
        });
        if over_repeat {
            locus.filters.set(GermlineFilter::HighRefRep);
        }
    }
}
