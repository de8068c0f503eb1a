use std::fmt;

use tracing::debug;

use crate::evidence::BaseCall;
use crate::locus::{GermlineFilter, PhasedAllele, SiteLocus};
use crate::phasing::haplotype::FragmentTally;

/// Phaser states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaserState {
    /// No run in progress.
    Idle,
    /// Run in progress, last buffered site heterozygous.
    Accumulating,
    /// Run in progress, trailing non-het sites buffered inside the window.
    FlushPending,
}

/// Result of closing a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Fewer than two heterozygous sites; every site unchanged.
    Passthrough(Vec<SiteLocus>),
    /// Run merged into one record at the run start.
    Merged {
        /// Merged phased record.
        record: SiteLocus,
        /// Buffered sites past the last het, unchanged.
        trailing: Vec<SiteLocus>,
    },
    /// Run could not be phased; sites inside the span carry `PhasingConflict`.
    Conflict(Vec<SiteLocus>),
}

impl RunOutcome {
    /// Records in emission order.
    pub fn into_records(self) -> Vec<SiteLocus> {
        match self {
            RunOutcome::Passthrough(sites) | RunOutcome::Conflict(sites) => sites,
            RunOutcome::Merged {
                record,
                mut trailing,
            } => {
                trailing.insert(0, record);
                trailing
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConflictReason {
    PartialOverlap { partial: u32, spanning: u32 },
    TooFewHaplotypes,
    AmbiguousRanking,
    InconsistentSite(u32),
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::PartialOverlap { partial, spanning } => {
                write!(f, "{partial} partially overlapping reads vs {spanning} spanning")
            }
            ConflictReason::TooFewHaplotypes => write!(f, "fewer than two haplotypes"),
            ConflictReason::AmbiguousRanking => write!(f, "tie between second and third haplotype"),
            ConflictReason::InconsistentSite(pos) => {
                write!(f, "leading haplotypes inconsistent with genotype at {pos}")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct BufferedSite {
    site: SiteLocus,
    calls: Vec<BaseCall>,
}

/// Streaming merger of adjacent heterozygous SNVs into phased multi-base
/// records.
///
/// Sites must arrive in increasing position order. Non-het sites following a
/// het are held while they stay within `window` of the last het, so a later het
/// can extend the run across them.
///
/// A het always extends the open run, so a stretch of contiguous hets is held
/// in full: buffered memory grows with the run length, not with `window`.
#[derive(Debug, Clone)]
pub struct CodonPhaser {
    enabled: bool,
    window: u32,
    state: PhaserState,
    buffer: Vec<BufferedSite>,
    run_start: u32,
    run_end: u32,
    het_count: u32,
}

impl CodonPhaser {
    /// Phaser merging hets less than `window` positions apart.
    pub fn new(window: u32) -> Self {
        Self {
            enabled: true,
            window,
            state: PhaserState::Idle,
            buffer: Vec::new(),
            run_start: 0,
            run_end: 0,
            het_count: 0,
        }
    }

    /// Phaser that passes every site straight through.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(0)
        }
    }

    /// Current state.
    pub fn state(&self) -> PhaserState {
        self.state
    }

    /// Sites currently held back.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one site with its per-read calls; returns the records that became
    /// final.
    pub fn process(&mut self, site: SiteLocus, calls: &[BaseCall]) -> Vec<SiteLocus> {
        if !self.enabled {
            return vec![site];
        }

        let mut emitted = Vec::new();
        let contiguous = self
            .buffer
            .last()
            .is_some_and(|last| last.site.pos.checked_add(1) == Some(site.pos));
        if self.state != PhaserState::Idle && !contiguous {
            emitted.extend(self.close_run().into_records());
        }

        if site.is_het() {
            if self.state == PhaserState::Idle {
                self.run_start = site.pos;
                self.het_count = 0;
            }
            self.run_end = site.pos;
            self.het_count += 1;
            self.hold(site, calls);
            self.state = PhaserState::Accumulating;
        } else if self.state != PhaserState::Idle {
            if site.pos - self.run_end + 1 < self.window {
                self.hold(site, calls);
                self.state = PhaserState::FlushPending;
            } else {
                emitted.extend(self.close_run().into_records());
                emitted.push(site);
            }
        } else {
            emitted.push(site);
        }
        emitted
    }

    /// Close any pending run and return everything still held.
    pub fn flush(&mut self) -> Vec<SiteLocus> {
        if self.state == PhaserState::Idle {
            return Vec::new();
        }
        self.close_run().into_records()
    }

    fn hold(&mut self, site: SiteLocus, calls: &[BaseCall]) {
        self.buffer.push(BufferedSite {
            site,
            calls: calls.to_vec(),
        });
    }

    /// Decide the pending run and reset to [`PhaserState::Idle`].
    pub fn close_run(&mut self) -> RunOutcome {
        let buffered = std::mem::take(&mut self.buffer);
        let het_count = self.het_count;
        self.state = PhaserState::Idle;
        self.het_count = 0;

        if het_count < 2 {
            debug!(start = self.run_start, het_count, "run too short to phase");
            return RunOutcome::Passthrough(buffered.into_iter().map(|b| b.site).collect());
        }

        let (run, trailing): (Vec<BufferedSite>, Vec<BufferedSite>) = buffered
            .into_iter()
            .partition(|b| b.site.pos <= self.run_end);
        let trailing: Vec<SiteLocus> = trailing.into_iter().map(|b| b.site).collect();

        match self.phase_run(&run) {
            Ok(phased) => {
                debug!(
                    start = self.run_start,
                    end = self.run_end,
                    alt = %phased.phased_alt,
                    "merged phased run"
                );
                match merge_run(run, phased) {
                    Some(record) => RunOutcome::Merged { record, trailing },
                    None => RunOutcome::Passthrough(trailing),
                }
            }
            Err(reason) => {
                debug!(start = self.run_start, end = self.run_end, %reason, "phasing conflict");
                let mut sites: Vec<SiteLocus> = run
                    .into_iter()
                    .map(|b| {
                        let mut site = b.site;
                        site.filters.set(GermlineFilter::PhasingConflict);
                        site
                    })
                    .collect();
                sites.extend(trailing);
                RunOutcome::Conflict(sites)
            }
        }
    }

    fn phase_run(&self, run: &[BufferedSite]) -> Result<PhasedAllele, ConflictReason> {
        let span: Vec<&[BaseCall]> = run.iter().map(|b| b.calls.as_slice()).collect();
        let tally = FragmentTally::from_calls(&span);

        if tally.partial_reads > tally.spanning_reads {
            return Err(ConflictReason::PartialOverlap {
                partial: tally.partial_reads,
                spanning: tally.spanning_reads,
            });
        }
        if tally.distinct() < 2 {
            return Err(ConflictReason::TooFewHaplotypes);
        }
        let ranked = tally.ranked();
        if ranked.len() > 2 && tally.get(ranked[1]).1 == tally.get(ranked[2]).1 {
            return Err(ConflictReason::AmbiguousRanking);
        }

        let (first, first_count) = tally.get(ranked[0]);
        let (second, second_count) = tally.get(ranked[1]);
        for (offset, buffered) in run.iter().enumerate() {
            let site = &buffered.site;
            if !site.is_het() {
                continue;
            }
            let b1 = first.as_bytes()[offset];
            let b2 = second.as_bytes()[offset];
            let (g1, g2) = site.genotype_bases();
            let matches = (b1 == g1 && b2 == g2) || (b1 == g2 && b2 == g1);
            if b1 == b2 || !matches {
                return Err(ConflictReason::InconsistentSite(site.pos));
            }
        }

        let phased_ref: String = run.iter().map(|b| b.site.ref_base as char).collect();
        let mut leading = [ranked[0], ranked[1]];
        leading.sort_unstable();
        let phased_alt: Vec<&str> = leading
            .iter()
            .map(|&slot| tally.get(slot).0.as_str())
            .filter(|fragment| *fragment != phased_ref)
            .collect();

        Ok(PhasedAllele {
            phased_alt: phased_alt.join(","),
            phased_ref,
            allele_depths: vec![(first.clone(), *first_count), (second.clone(), *second_count)],
        })
    }
}

/// Collapse the run into its first site carrying the phased allele.
///
/// Qualities are the weakest across the run's hets and filters are the union.
fn merge_run(run: Vec<BufferedSite>, phased: PhasedAllele) -> Option<SiteLocus> {
    let mut sites = run.into_iter().map(|b| b.site);
    let mut record = sites.next()?;
    let mut filters = record.filters;
    for site in sites {
        filters.merge(&site.filters);
        if !site.is_het() {
            continue;
        }
        record.call.max_gt_qphred = record.call.max_gt_qphred.min(site.call.max_gt_qphred);
        record.call.max_gt_poly_qphred = record.call.max_gt_poly_qphred.min(site.call.max_gt_poly_qphred);
        record.call.snp_qphred = record.call.snp_qphred.min(site.call.snp_qphred);
        for (merged, sample) in record.samples.iter_mut().zip(&site.samples) {
            merged.gq = merged.gq.min(sample.gq);
            merged.gqx = merged.gqx.min(sample.gqx);
            merged.depth = merged.depth.min(sample.depth);
            merged.filters.merge(&sample.filters);
        }
    }
    record.filters = filters;
    record.phased = Some(phased);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{BaseCallBuffer, PositionSummary};
    use crate::stats::{DiploidGenotype, SiteGenotypeCall};

    fn site(pos: u32, ref_base: u8, a1: u8, a2: u8) -> SiteLocus {
        let gt = DiploidGenotype::from_bases(a1, a2).unwrap();
        SiteLocus::new(pos, ref_base, SiteGenotypeCall::fixed(gt, 40), PositionSummary::new(pos))
    }

    #[test]
    fn contiguous_hets_are_held_past_the_window() {
        let mut phaser = CodonPhaser::new(3);
        for pos in 0..10 {
            assert!(phaser.process(site(pos, b'A', b'A', b'G'), &[]).is_empty());
        }
        assert_eq!(phaser.state(), PhaserState::Accumulating);
        assert_eq!(phaser.buffered(), 10);
    }

    #[test]
    fn disabled_phaser_passes_through() {
        let mut phaser = CodonPhaser::disabled();
        let out = phaser.process(site(0, b'A', b'A', b'G'), &[]);
        assert_eq!(out.len(), 1);
        assert!(phaser.flush().is_empty());
    }

    #[test]
    fn state_transitions() {
        let mut buffer = BaseCallBuffer::new();
        for read_id in 0..4 {
            buffer.insert_read(read_id, 0, b"AAAAA", 30, true);
        }
        let mut phaser = CodonPhaser::new(3);
        assert!(phaser.process(site(0, b'A', b'A', b'A'), buffer.calls_at(0)).len() == 1);
        assert_eq!(phaser.state(), PhaserState::Idle);

        assert!(phaser.process(site(1, b'A', b'A', b'G'), buffer.calls_at(1)).is_empty());
        assert_eq!(phaser.state(), PhaserState::Accumulating);

        assert!(phaser.process(site(2, b'A', b'A', b'A'), buffer.calls_at(2)).is_empty());
        assert_eq!(phaser.state(), PhaserState::FlushPending);
        assert_eq!(phaser.buffered(), 2);

        // window closes at distance 3 from the last het
        let out = phaser.process(site(3, b'A', b'A', b'A'), buffer.calls_at(3));
        assert_eq!(out.len(), 3);
        assert_eq!(phaser.state(), PhaserState::Idle);
    }

    #[test]
    fn gap_closes_run() {
        let mut phaser = CodonPhaser::new(10);
        assert!(phaser.process(site(5, b'A', b'A', b'G'), &[]).is_empty());
        let out = phaser.process(site(9, b'C', b'C', b'T'), &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pos, 5);
        assert_eq!(phaser.state(), PhaserState::Accumulating);
        assert_eq!(phaser.flush().len(), 1);
    }

    #[test]
    fn merged_outcome_emits_record_first() {
        let mut buffer = BaseCallBuffer::new();
        for read_id in 0..5 {
            buffer.insert_read(read_id, 0, b"ACGT", 30, true);
        }
        for read_id in 5..10 {
            buffer.insert_read(read_id, 0, b"GCAT", 30, false);
        }
        let mut phaser = CodonPhaser::new(3);
        let genotypes = [(b'A', b'G'), (b'C', b'C'), (b'G', b'A'), (b'T', b'T')];
        let mut emitted = Vec::new();
        for (pos, (a1, a2)) in genotypes.into_iter().enumerate() {
            let pos = pos as u32;
            let reference = b"ACGT"[pos as usize];
            emitted.extend(phaser.process(site(pos, reference, a1, a2), buffer.calls_at(pos)));
        }
        emitted.extend(phaser.flush());

        assert_eq!(emitted.len(), 2);
        let phased = emitted[0].phased.as_ref().unwrap();
        assert_eq!(phased.phased_ref, "ACG");
        assert_eq!(phased.phased_alt, "GCA");
        assert_eq!(emitted[0].pos, 0);
        assert!(emitted[0].is_phased_region());
        assert_eq!(emitted[1].pos, 3);
    }
}
