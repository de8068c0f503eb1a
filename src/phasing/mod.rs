//! Codon phasing: merges runs of nearby heterozygous SNVs whose reads agree on
//! two haplotypes into a single multi-base record.
//!
//! The phaser is a small state machine (`Idle`, `Accumulating`,
//! `FlushPending`). Closing a run yields a [`RunOutcome`] so the merge/conflict
//! decision can be inspected without a downstream sink.

mod codon_phaser;
mod haplotype;

pub use codon_phaser::{CodonPhaser, PhaserState, RunOutcome};
