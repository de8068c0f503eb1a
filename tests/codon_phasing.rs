mod common;

use common::{diploid_reads, haplotype_site, het_records, init_tracing, phase_haplotypes, ReadSimulator};
use smallvar::phasing::{CodonPhaser, PhaserState, RunOutcome};
use smallvar::GermlineFilter;
use test_case::test_case;

#[test_case("ACGTACGTACGT", "ACGTACGTAC", "ACGTGCTTAC", 3, "GCT" ; "simple 3mer")]
#[test_case("ACGTACGTACGTACGT", "ACGTACGTACGTACGT", "ACGTGCTTGCTTACGT", 3, "GCTTGCT" ; "two adjacent 3mers")]
#[test_case("ACGTACGTACGT", "ACGTACGTAC", "GGGTACGTAC", 3, "GG" ; "snps at contig start")]
#[test_case(
    "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT",
    "ACGTACGTACGTACGTACGTACGT",
    "ACGTAAGAACGGAGGTACGTACGT",
    5,
    "AGAACGGAG" ;
    "window measured from last het"
)]
#[test_case("ACGTACGTACGT", "ACATGCGTAC", "ACCTCCGTAC", 3, "ATG,CTC" ; "het-alt run lists both fragments")]
#[test_case("ACGTACGTACGT", "ACGAAAGTAC", "ACATCCGTAC", 5, "GAAA,ATCC" ; "fragments in first-seen order")]
fn merges_consistent_run(reference: &str, hap1: &str, hap2: &str, window: u32, expected_alt: &str) {
    init_tracing();
    let reads = diploid_reads(hap1, hap2, 10);
    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, window);

    let hets = het_records(&emitted);
    let merged = hets.first().expect("a het record is emitted");
    let phased = merged.phased.as_ref().expect("first het record is phased");
    assert_eq!(phased.phased_alt, expected_alt);
    assert!(merged.is_phased_region());
    assert!(!merged.filters.any());
}

#[test]
fn merged_record_replaces_run() {
    let reference = "ACGTACGTACGT";
    let (hap1, hap2) = ("ACGTACGTAC", "ACGTGCTTAC");
    let reads = diploid_reads(hap1, hap2, 10);
    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);

    // positions 4..=6 collapse into one record
    assert_eq!(emitted.len(), hap1.len() - 2);
    let positions: Vec<u32> = emitted.iter().map(|site| site.pos).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4, 7, 8, 9]);

    let merged = &emitted[4];
    let phased = merged.phased.as_ref().unwrap();
    assert_eq!(phased.phased_ref, "ACG");
    assert_eq!(phased.span(), 3);
    assert_eq!(phased.allele_depths.len(), 2);
    assert!(phased.allele_depths.iter().all(|(_, depth)| *depth == 10));
}

#[test]
fn single_het_is_not_phased() {
    let reference = "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
    let (hap1, hap2) = ("ACGTACGT", "ACGGACGT");
    let reads = diploid_reads(hap1, hap2, 10);
    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);

    assert_eq!(emitted.len(), hap1.len());
    let hets = het_records(&emitted);
    assert_eq!(hets.len(), 1);
    for site in hets {
        assert!(!site.filters.any());
        assert!(!site.is_phased_region());
    }
}

#[test]
fn read_break_causes_phasing_conflict() {
    init_tracing();
    let reference = "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
    let hap1 = "ACGTACGTACGTACGT";
    let hap2 = "ACGTACGGAGGTACGT";

    let mut reads = ReadSimulator::new();
    for _ in 0..10 {
        reads.insert_reads("ACGTACGT", 0, 1);
        reads.insert_reads("ACGTACGT", hap1.len() as u32, 1);
    }
    reads.insert_reads(hap2, 0, 10);

    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);
    assert_eq!(emitted.len(), hap1.len());
    let hets = het_records(&emitted);
    assert_eq!(hets.len(), 2);
    for site in hets {
        assert!(site.filters.test(GermlineFilter::PhasingConflict));
        assert!(!site.is_phased_region());
    }
}

#[test]
fn tied_minor_haplotypes_conflict() {
    let reference = "ACGTA";
    let (hap1, hap2) = ("ATGCA", "ACGTA");
    let mut reads = ReadSimulator::new();
    reads.insert_reads(hap1, 0, 10);
    reads.insert_reads(hap2, 0, 4);
    reads.insert_reads("ATGTA", 0, 4);

    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);
    assert_eq!(emitted.len(), 5);
    for site in &emitted[1..4] {
        assert!(site.filters.test(GermlineFilter::PhasingConflict), "site {}", site.pos);
    }
    assert!(!emitted[0].filters.any());
    assert!(!emitted[4].filters.any());
}

#[test]
fn haplotypes_disagreeing_with_genotype_conflict() {
    let reference = "ACGTA";
    // genotypes say C/T at 1 and T/C at 3, reads carry A at 1
    let (hap1, hap2) = ("ATGCA", "ACGTA");
    let mut reads = ReadSimulator::new();
    reads.insert_reads("AAGCA", 0, 10);
    reads.insert_reads(hap2, 0, 10);

    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);
    let hets = het_records(&emitted);
    assert_eq!(hets.len(), 2);
    assert!(hets
        .iter()
        .all(|site| site.filters.test(GermlineFilter::PhasingConflict)));
}

#[test]
fn close_run_reports_trailing_sites() {
    let reference = "ACGTACGTACGT";
    let (hap1, hap2) = ("ACGTACGTAC", "ACGTGCTTAC");
    let reads = diploid_reads(hap1, hap2, 10);

    let mut phaser = CodonPhaser::new(3);
    for pos in 0..=7 {
        let site = haplotype_site(&reads, reference, hap1, hap2, pos, 30);
        phaser.process(site, reads.calls_at(pos));
    }
    assert_eq!(phaser.state(), PhaserState::FlushPending);

    match phaser.close_run() {
        RunOutcome::Merged { record, trailing } => {
            assert_eq!(record.pos, 4);
            assert_eq!(trailing.len(), 1);
            assert_eq!(trailing[0].pos, 7);
        }
        other => panic!("expected a merged run, got {other:?}"),
    }
    assert_eq!(phaser.state(), PhaserState::Idle);
    assert_eq!(phaser.buffered(), 0);
}

#[test]
fn emission_preserves_order() {
    let reference = "ACGTACGTACGTACGT";
    let (hap1, hap2) = ("ACGTACGTACGTACGT", "ACGTGCTTGCTTACGT");
    let reads = diploid_reads(hap1, hap2, 10);
    let emitted = phase_haplotypes(&reads, reference, hap1, hap2, 3);
    assert!(emitted.windows(2).all(|pair| pair[0].pos < pair[1].pos));
    assert!(emitted.len() < hap1.len());
}
