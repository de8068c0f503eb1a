#![allow(dead_code)]

use smallvar::evidence::{BaseCall, BaseCallBuffer, PositionSummary, ReadId};
use smallvar::phasing::CodonPhaser;
use smallvar::stats::{DiploidGenotype, SiteGenotypeCall};
use smallvar::SiteLocus;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Simulated read pileup with sequential read ids.
#[derive(Debug, Default)]
pub struct ReadSimulator {
    pub buffer: BaseCallBuffer,
    next_read: ReadId,
}

impl ReadSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `copies` forward-strand reads of `sequence` at `start`, Q30.
    pub fn insert_reads(&mut self, sequence: &str, start: u32, copies: usize) {
        for _ in 0..copies {
            self.buffer
                .insert_read(self.next_read, start, sequence.as_bytes(), 30, true);
            self.next_read += 1;
        }
    }

    pub fn calls_at(&self, pos: u32) -> &[BaseCall] {
        self.buffer.calls_at(pos)
    }

    pub fn summary_at(&self, pos: u32) -> PositionSummary {
        self.buffer.summary_at(pos)
    }
}

/// Site whose genotype is the pair of haplotype bases at `pos`.
pub fn haplotype_site(
    reads: &ReadSimulator,
    reference: &str,
    hap1: &str,
    hap2: &str,
    pos: u32,
    qphred: i32,
) -> SiteLocus {
    let i = pos as usize;
    let gt = DiploidGenotype::from_bases(hap1.as_bytes()[i], hap2.as_bytes()[i])
        .expect("haplotypes use unambiguous bases");
    SiteLocus::new(
        pos,
        reference.as_bytes()[i],
        SiteGenotypeCall::fixed(gt, qphred),
        reads.summary_at(pos),
    )
}

/// Feed every position of `hap1` through a phaser and collect the output.
pub fn phase_haplotypes(
    reads: &ReadSimulator,
    reference: &str,
    hap1: &str,
    hap2: &str,
    window: u32,
) -> Vec<SiteLocus> {
    let mut phaser = CodonPhaser::new(window);
    let mut emitted = Vec::new();
    for pos in 0..hap1.len() as u32 {
        let site = haplotype_site(reads, reference, hap1, hap2, pos, 30);
        emitted.extend(phaser.process(site, reads.calls_at(pos)));
    }
    emitted.extend(phaser.flush());
    emitted
}

/// Heterozygous records, as a VCF writer restricted to het calls would see.
pub fn het_records(sites: &[SiteLocus]) -> Vec<&SiteLocus> {
    sites
        .iter()
        .filter(|site| site.is_het() || site.is_hetalt())
        .collect()
}

/// Two haplotypes of `copies` reads each, both starting at 0.
pub fn diploid_reads(hap1: &str, hap2: &str, copies: usize) -> ReadSimulator {
    let mut reads = ReadSimulator::new();
    reads.insert_reads(hap1, 0, copies);
    reads.insert_reads(hap2, 0, copies);
    reads
}
