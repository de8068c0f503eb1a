use std::fmt;

use crate::evidence::IndelKey;

/// Log-probability score of a read path.
pub type Score = f64;

/// Maximum number of alternate-indel scores retained per read.
pub const MAX_ALT_INDELS: usize = 2;

/// Alignment log-scores of one read against the paths around one indel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPathScores {
    /// Score of the read aligned to the reference path.
    pub ref_score: Score,
    /// Score of the read aligned through the primary indel.
    pub indel_score: Score,
    /// Score of the neutral ("null site") path.
    pub nsite_score: Score,
    /// Whether the read belongs to the tier 1 evidence set.
    pub is_tier1_read: bool,
    alt_indel: [Option<(IndelKey, Score)>; MAX_ALT_INDELS],
}

impl ReadPathScores {
    /// Create scores for a read with no alternate indels.
    pub fn new(ref_score: Score, indel_score: Score, nsite_score: Score, is_tier1_read: bool) -> Self {
        Self {
            ref_score,
            indel_score,
            nsite_score,
            is_tier1_read,
            alt_indel: [None; MAX_ALT_INDELS],
        }
    }

    /// Offer an alternate-indel score.
    ///
    /// Empty slots fill first. Once full, the candidate replaces the weakest
    /// retained entry only when it scores strictly higher.
    pub fn insert_alt(&mut self, key: IndelKey, score: Score) {
        if let Some(slot) = self.alt_indel.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some((key, score));
            return;
        }

        let mut min_index = None;
        let mut min = score;
        for (i, entry) in self.alt_indel.iter().enumerate() {
            if let Some((_, alt_score)) = entry {
                if *alt_score < min {
                    min = *alt_score;
                    min_index = Some(i);
                }
            }
        }
        if let Some(i) = min_index {
            self.alt_indel[i] = Some((key, score));
        }
    }

    /// Retained alternate-indel scores in slot order.
    pub fn alt_indels(&self) -> impl Iterator<Item = &(IndelKey, Score)> {
        self.alt_indel.iter().flatten()
    }

    /// Best score over the reference and alternate-indel paths.
    pub fn best_non_indel_score(&self) -> Score {
        self.alt_indels()
            .map(|(_, score)| *score)
            .fold(self.ref_score, Score::max)
    }
}

impl fmt::Display for ReadPathScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ref: {} indel: {} nsite: {}",
            self.ref_score, self.indel_score, self.nsite_score
        )?;
        for (key, score) in self.alt_indels() {
            write!(f, " alt-{}: {}", key, score)?;
        }
        write!(f, " ist1?: {}", self.is_tier1_read)
    }
}
