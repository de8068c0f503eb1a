use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde_json::json;
use smallvar::config::{FilterOptions, ScoringOptions};
use smallvar::evidence::PositionSummary;
use smallvar::locus::PhasedAllele;
use smallvar::scoring::{VariantScoringModel, VariantType, INDEL_FEATURES, SNV_FEATURES};
use smallvar::stats::{DiploidGenotype, SiteGenotypeCall};
use smallvar::{
    CallerConfig, ChromDepthTable, ConfigError, DerivedOptions, GermlineFilter, ModelError,
    ScoringModelManager, ScoringModels, SiteLocus,
};
use tempfile::tempdir;

fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

/// Forest of one tree splitting on QUAL at 20.
fn qual_forest(variant_type: &str, features: &[&str]) -> serde_json::Value {
    json!({
        "model_type": "random_forest",
        "variant_type": variant_type,
        "features": features,
        "trees": [{
            "nodes": [
                {"node": "split", "feature": 0, "threshold": 20.0, "left": 1, "right": 2},
                {"node": "leaf", "error_prob": 0.5},
                {"node": "leaf", "error_prob": 0.00001}
            ]
        }]
    })
}

fn het_snv(qual: i32) -> SiteLocus {
    let mut summary = PositionSummary::new(7);
    summary.base_counts = [12, 12, 0, 0];
    summary.fwd_counts = [6, 6, 0, 0];
    summary.n_used_calls = 24;
    let gt = DiploidGenotype::from_bases(b'A', b'C').unwrap();
    SiteLocus::new(7, b'A', SiteGenotypeCall::fixed(gt, qual), summary)
}

fn manager_with(scoring: ScoringOptions) -> ScoringModelManager {
    let models = ScoringModels::load(&scoring).unwrap();
    ScoringModelManager::new(FilterOptions::default(), scoring, DerivedOptions::default(), models)
}

#[test]
fn forest_model_scores_sites_from_file() {
    let dir = tempdir().unwrap();
    let snv_model = write_json(dir.path(), "snv.json", qual_forest("snv", SNV_FEATURES));
    let mgr = manager_with(ScoringOptions {
        snv_model: Some(snv_model),
        ..ScoringOptions::default()
    });
    assert!(mgr.is_evs_site_model());
    assert!(!mgr.is_evs_indel_model());

    let mut confident = het_snv(45);
    mgr.classify_site(&mut confident);
    assert_eq!(confident.empirical_score, Some(50));
    assert!(!confident.filters.any());

    let mut weak = het_snv(12);
    mgr.classify_site(&mut weak);
    assert_eq!(weak.empirical_score, Some(3));
    assert!(weak.filters.test(GermlineFilter::LowGQX));
}

#[test]
fn phased_records_bypass_the_snv_model() {
    let dir = tempdir().unwrap();
    let snv_model = write_json(dir.path(), "snv.json", qual_forest("snv", SNV_FEATURES));
    let mgr = manager_with(ScoringOptions {
        snv_model: Some(snv_model),
        ..ScoringOptions::default()
    });

    let mut site = het_snv(12);
    site.phased = Some(PhasedAllele {
        phased_ref: "ACG".to_string(),
        phased_alt: "GCT".to_string(),
        allele_depths: vec![("ACG".to_string(), 12), ("GCT".to_string(), 12)],
    });
    mgr.classify_site(&mut site);
    assert!(site.empirical_score.is_none());
    assert!(site.samples[0].filters.test(GermlineFilter::LowGQX));
}

#[test]
fn logistic_model_loads_for_indels() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        "indel.json",
        json!({
            "model_type": "logistic",
            "variant_type": "indel",
            "features": INDEL_FEATURES,
            "intercept": 2.0,
            "coefficients": vec![0.0; INDEL_FEATURES.len()],
        }),
    );
    let models = ScoringModels::load(&ScoringOptions {
        indel_model: Some(path),
        ..ScoringOptions::default()
    })
    .unwrap();
    let model = models.indel().expect("indel model loaded");
    assert_eq!(model.variant_type(), VariantType::Indel);
    let error = model.score_variant(&vec![0.0; INDEL_FEATURES.len()]);
    assert!((error - 1.0 / (1.0 + 2f64.exp())).abs() < 1e-12);
}

#[test]
fn model_for_wrong_variant_type_is_rejected() {
    let dir = tempdir().unwrap();
    let path = write_json(dir.path(), "indel.json", qual_forest("indel", INDEL_FEATURES));
    let err = ScoringModels::load(&ScoringOptions {
        snv_model: Some(path),
        ..ScoringOptions::default()
    })
    .unwrap_err();
    assert!(matches!(
        err,
        ModelError::WrongVariantType {
            expected: VariantType::Snv,
            found: VariantType::Indel
        }
    ));
}

#[test]
fn model_with_foreign_features_is_rejected() {
    let dir = tempdir().unwrap();
    let path = write_json(dir.path(), "snv.json", qual_forest("snv", &["QUAL", "DP"]));
    let err = ScoringModels::load(&ScoringOptions {
        snv_model: Some(path),
        ..ScoringOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ModelError::FeatureMismatch { .. }));
}

#[test]
fn tree_with_backward_edge_is_invalid() {
    let dir = tempdir().unwrap();
    let mut doc = qual_forest("snv", SNV_FEATURES);
    doc["trees"][0]["nodes"][0]["left"] = json!(0);
    let path = write_json(dir.path(), "snv.json", doc);
    let err = ScoringModels::load(&ScoringOptions {
        snv_model: Some(path),
        ..ScoringOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ModelError::Invalid(_)));
}

#[test]
fn missing_and_malformed_model_files() {
    let dir = tempdir().unwrap();
    let missing = ScoringModels::load(&ScoringOptions {
        indel_model: Some(dir.path().join("absent.json")),
        ..ScoringOptions::default()
    })
    .unwrap_err();
    assert!(matches!(missing, ModelError::Io { .. }));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    let malformed = ScoringModels::load(&ScoringOptions {
        indel_model: Some(garbage),
        ..ScoringOptions::default()
    })
    .unwrap_err();
    assert!(matches!(malformed, ModelError::Malformed(_)));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        "config.json",
        json!({
            "phasing": {"enabled": true, "window": 5},
            "filters": {"min_gqx": 20, "max_snv_sb": null, "max_snv_hpol": 8},
        }),
    );
    let config = CallerConfig::from_json_path(&path).unwrap();
    assert!(config.phasing.enabled);
    assert_eq!(config.phasing.window, 5);
    assert_eq!(config.filters.min_gqx, Some(20));
    assert_eq!(config.filters.max_snv_sb, None);
    assert_eq!(config.filters.max_snv_hpol, Some(8));
    assert_eq!(config.filters.max_depth_factor, Some(3.0));
    assert_eq!(config.scoring, ScoringOptions::default());
}

#[test]
fn config_rejects_bad_values() {
    let window = CallerConfig::from_json_str(r#"{"phasing": {"enabled": true, "window": 0}}"#);
    assert!(matches!(window, Err(ConfigError::InvalidWindow(0))));

    let base_filt = CallerConfig::from_json_str(r#"{"filters": {"max_base_filt": 1.5}}"#);
    assert!(matches!(
        base_filt,
        Err(ConfigError::InvalidThreshold {
            name: "max_base_filt",
            ..
        })
    ));

    assert!(matches!(
        CallerConfig::from_json_str("[1, 2]"),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn chrom_depths_drive_the_depth_filter() {
    let dir = tempdir().unwrap();
    let depth_path = dir.path().join("depths.tsv");
    fs::write(&depth_path, "# expected depth\nchr1\t30\n\nchr2\t12.5\n").unwrap();
    let config = CallerConfig::default().with_chrom_depth_file(&depth_path);
    let table = config.load_chrom_depths().unwrap().expect("table configured");
    assert_eq!(table.len(), 2);

    let derived = DerivedOptions::for_contig(&config.filters, Some(&table), "chr1").unwrap();
    assert_eq!(derived.max_depth, Some(90.0));
    assert_eq!(derived.norm_depth, Some(30.0));
    assert!(derived.is_max_depth());

    let missing = DerivedOptions::for_contig(&config.filters, Some(&table), "chrM");
    assert!(matches!(missing, Err(ConfigError::MissingChromDepth { chrom }) if chrom == "chrM"));

    let unfiltered = DerivedOptions::for_contig(&config.filters, None, "chrM").unwrap();
    assert!(!unfiltered.is_max_depth());
}

#[test]
fn malformed_depth_line_reports_its_number() {
    let err = ChromDepthTable::from_reader(Cursor::new("chr1\t30\nchr2 thirty\n")).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MalformedDepthLine { line_number: 2, .. }
    ));
}

#[test]
fn deep_site_is_filtered_against_contig_depth() {
    let table: ChromDepthTable = [("chr1", 5.0)].into_iter().collect();
    let filters = FilterOptions::default();
    let derived = DerivedOptions::for_contig(&filters, Some(&table), "chr1").unwrap();
    let mgr = ScoringModelManager::new(filters, ScoringOptions::default(), derived, ScoringModels::none());

    let mut site = het_snv(45);
    mgr.classify_site(&mut site);
    assert!(site.filters.test(GermlineFilter::HighDepth));
    assert!(!site.samples[0].filters.any());
    assert_eq!(site.filters.to_string(), "HighDepth");
}

mod score_cap {
    use super::*;
    use proptest::prelude::*;
    use smallvar::scoring::{LogisticModel, MAX_EMPIRICAL_SCORE};
    use smallvar::stats::error_prob_to_qphred;

    fn constant_snv_model(error_prob: f64) -> Box<dyn VariantScoringModel> {
        Box::new(LogisticModel {
            variant_type: VariantType::Snv,
            features: SNV_FEATURES.iter().map(|name| name.to_string()).collect(),
            intercept: ((1.0 - error_prob) / error_prob).ln(),
            coefficients: vec![0.0; SNV_FEATURES.len()],
        })
    }

    proptest! {
        #[test]
        fn empirical_scores_never_exceed_cap(exponent in 0.5f64..12.0) {
            let error_prob = 10f64.powf(-exponent);
            let models = ScoringModels::from_models(Some(constant_snv_model(error_prob)), None);
            let mgr = ScoringModelManager::new(
                FilterOptions::default(),
                ScoringOptions::default(),
                DerivedOptions::default(),
                models,
            );
            let mut site = het_snv(40);
            mgr.classify_site(&mut site);

            let score = site.empirical_score.expect("simple SNV is scored");
            prop_assert!(score <= MAX_EMPIRICAL_SCORE);
            let expected = error_prob_to_qphred(error_prob).min(MAX_EMPIRICAL_SCORE);
            prop_assert!((score - expected).abs() <= 1, "score {} vs {}", score, expected);
        }
    }
}
