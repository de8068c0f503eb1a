//! Per-contig driver: genotypes buffered evidence position by position, runs
//! sites through the codon phaser, classifies everything and hands the records
//! to a [`VariantSink`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{CallerConfig, ChromDepthTable, DerivedOptions};
use crate::evidence::{
    AlignTier, BaseCall, BaseCallBuffer, IndelBuffer, IndelData, IndelKey, IndelObservation,
    ReadId, ReadPathScores,
};
use crate::locus::{homopolymer_length, IndelLocus, ReferenceWindow, SiteLocus};
use crate::phasing::CodonPhaser;
use crate::scoring::{ScoringModelManager, ScoringModels};
use crate::stats::{GenotypeParams, IndelGenotype};
use crate::CallerError;

/// Failure reported by a downstream record consumer.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Consumer of finished records, called in genomic order.
pub trait VariantSink {
    /// Accept one site record.
    fn process_site(&mut self, site: SiteLocus) -> Result<(), SinkError>;

    /// Accept one indel record.
    fn process_indel(&mut self, locus: IndelLocus) -> Result<(), SinkError>;
}

/// Sink collecting records in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    /// Sites in emission order.
    pub sites: Vec<SiteLocus>,
    /// Indels in emission order.
    pub indels: Vec<IndelLocus>,
}

impl VecSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariantSink for VecSink {
    fn process_site(&mut self, site: SiteLocus) -> Result<(), SinkError> {
        self.sites.push(site);
        Ok(())
    }

    fn process_indel(&mut self, locus: IndelLocus) -> Result<(), SinkError> {
        self.indels.push(locus);
        Ok(())
    }
}

/// Streaming caller for one contig window.
///
/// Evidence may be added for any position not yet processed; `process_through`
/// finalises positions in order and `finish` drains everything left.
#[derive(Debug)]
pub struct ContigPipeline<S: VariantSink> {
    chrom: Arc<str>,
    reference: Arc<[u8]>,
    region_start: u32,
    next_pos: u32,
    params: GenotypeParams,
    basecalls: BaseCallBuffer,
    indels: IndelBuffer,
    phaser: CodonPhaser,
    scorer: ScoringModelManager,
    sink: S,
}

impl<S: VariantSink> ContigPipeline<S> {
    /// Pipeline over `reference`, whose first base sits at `region_start`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chrom: impl Into<Arc<str>>,
        reference: Arc<[u8]>,
        region_start: u32,
        sample_count: usize,
        config: &CallerConfig,
        depths: Option<&ChromDepthTable>,
        models: Arc<ScoringModels>,
        sink: S,
    ) -> Result<Self, CallerError> {
        config.validate()?;
        let chrom = chrom.into();
        let derived = DerivedOptions::for_contig(&config.filters, depths, &chrom)?;
        let phaser = if config.phasing.enabled {
            CodonPhaser::new(config.phasing.window)
        } else {
            CodonPhaser::disabled()
        };
        let scorer = ScoringModelManager::new(
            config.filters.clone(),
            config.scoring.clone(),
            derived,
            models,
        );
        debug!(
            chrom = %chrom,
            region_start,
            len = reference.len(),
            phasing = config.phasing.enabled,
            "created contig pipeline"
        );
        Ok(Self {
            chrom,
            reference,
            region_start,
            next_pos: region_start,
            params: config.genotype.clone(),
            basecalls: BaseCallBuffer::new(),
            indels: IndelBuffer::new(sample_count),
            phaser,
            scorer,
            sink,
        })
    }

    /// Contig name.
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// First position not yet processed.
    pub fn next_pos(&self) -> u32 {
        self.next_pos
    }

    fn region_end(&self) -> u32 {
        self.region_start + self.reference.len() as u32
    }

    fn check_pending(&self, pos: u32) -> Result<(), CallerError> {
        if pos < self.next_pos {
            return Err(CallerError::StalePosition {
                pos,
                next_pos: self.next_pos,
            });
        }
        Ok(())
    }

    /// Record one base call.
    pub fn add_basecall(&mut self, pos: u32, call: BaseCall) -> Result<(), CallerError> {
        self.check_pending(pos)?;
        self.basecalls.insert_call(pos, call);
        Ok(())
    }

    /// Record the base calls of an ungapped read.
    pub fn add_read(
        &mut self,
        read_id: ReadId,
        start: u32,
        sequence: &[u8],
        qscore: u8,
        is_forward_strand: bool,
    ) -> Result<(), CallerError> {
        self.check_pending(start)?;
        self.basecalls
            .insert_read(read_id, start, sequence, qscore, is_forward_strand);
        Ok(())
    }

    /// Record an indel observation for `sample_index`.
    pub fn add_indel_observation(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        obs: &IndelObservation,
    ) -> Result<(), CallerError> {
        self.check_pending(key.pos)?;
        self.indels.add_observation(key, sample_index, obs)?;
        Ok(())
    }

    /// Attach read path scores to an indel.
    pub fn set_read_path_scores(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        read_id: ReadId,
        scores: ReadPathScores,
    ) -> Result<(), CallerError> {
        self.check_pending(key.pos)?;
        self.indels
            .set_read_path_scores(key, sample_index, read_id, scores)?;
        Ok(())
    }

    /// Record a read overlapping an indel without supporting it.
    pub fn add_suboverlap_read(
        &mut self,
        key: IndelKey,
        sample_index: usize,
        read_id: ReadId,
        tier: AlignTier,
    ) -> Result<(), CallerError> {
        self.check_pending(key.pos)?;
        self.indels
            .add_suboverlap_read(key, sample_index, read_id, tier)?;
        Ok(())
    }

    /// Finalise every position up to and including `pos`.
    pub fn process_through(&mut self, pos: u32) -> Result<(), CallerError> {
        let last = pos.min(self.region_end().saturating_sub(1));
        while self.next_pos <= last && self.next_pos < self.region_end() {
            let current = self.next_pos;
            self.process_indels_through(current)?;
            self.process_position(current)?;
            self.basecalls.clear_through(current);
            self.next_pos = current + 1;
        }
        Ok(())
    }

    /// Finalise the rest of the window, flush the phaser and return the sink.
    pub fn finish(mut self) -> Result<S, CallerError> {
        let end = self.region_end();
        if end > self.region_start {
            self.process_through(end - 1)?;
        }
        let remaining = self.phaser.flush();
        self.emit_sites(remaining)?;
        self.process_indels_through(u32::MAX)?;
        debug!(chrom = %self.chrom, "finished contig pipeline");
        Ok(self.sink)
    }

    fn process_position(&mut self, pos: u32) -> Result<(), CallerError> {
        let calls = self.basecalls.calls_at(pos);
        if calls.is_empty() {
            return Ok(());
        }
        let reference = ReferenceWindow::new(&self.reference, self.region_start);
        let Some(ref_base) = reference.base(pos) else {
            return Ok(());
        };
        let Some(site) = SiteLocus::from_calls(pos, ref_base, calls, &self.params) else {
            trace!(pos, "no usable calls");
            return Ok(());
        };
        let site = site.with_hpol(homopolymer_length(&reference, pos));
        let emitted = self.phaser.process(site, calls);
        self.emit_sites(emitted)
    }

    fn emit_sites(&mut self, sites: Vec<SiteLocus>) -> Result<(), CallerError> {
        for mut site in sites {
            self.scorer.classify_site(&mut site);
            self.sink.process_site(site)?;
        }
        Ok(())
    }

    fn process_indels_through(&mut self, pos: u32) -> Result<(), CallerError> {
        let finished = self.indels.drain_through(pos);
        if finished.is_empty() {
            return Ok(());
        }
        let reference = ReferenceWindow::new(&self.reference, self.region_start);
        let mut loci = Vec::with_capacity(finished.len());
        for mut data in finished {
            let locus = IndelLocus::from_evidence(&mut data, &reference, &self.params)?;
            if is_reportable(&data, &locus) {
                loci.push(locus);
            } else {
                trace!(indel = %data.key(), "dropping hom-ref indel");
            }
        }
        if loci.is_empty() {
            return Ok(());
        }

        // sites held by the phaser precede the indel
        let pending = self.phaser.flush();
        self.emit_sites(pending)?;

        for mut cluster in overlapping_clusters(loci) {
            self.scorer.classify_indels(&mut cluster);
            for locus in cluster {
                self.sink.process_indel(locus)?;
            }
        }
        Ok(())
    }
}

fn is_reportable(data: &IndelData, locus: &IndelLocus) -> bool {
    data.is_forced_output()
        || locus
            .first_allele()
            .is_some_and(|allele| allele.call.max_gt_poly != IndelGenotype::NoIndel)
}

/// Group key-ordered loci whose reference spans overlap.
fn overlapping_clusters(loci: Vec<IndelLocus>) -> Vec<Vec<IndelLocus>> {
    let mut clusters: Vec<Vec<IndelLocus>> = Vec::new();
    let mut cluster_end = 0u32;
    for locus in loci {
        let end = locus
            .alleles
            .iter()
            .map(|allele| allele.key.right_pos().max(allele.key.pos + 1))
            .max()
            .unwrap_or(locus.pos + 1);
        match clusters.last_mut() {
            Some(cluster) if locus.pos < cluster_end => {
                cluster.push(locus);
                cluster_end = cluster_end.max(end);
            }
            _ => {
                clusters.push(vec![locus]);
                cluster_end = end;
            }
        }
    }
    clusters
}
