//! Reference repeat context of indels and SNVs.

use crate::evidence::{IndelKey, IndelType};

/// Indel shapes as reported downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimplifiedIndelType {
    /// Pure insertion.
    Insert,
    /// Pure deletion.
    Delete,
    /// Combined deletion and insertion.
    Swap,
    /// Anything else (breakpoints).
    Other,
}

impl From<IndelType> for SimplifiedIndelType {
    fn from(kind: IndelType) -> Self {
        match kind {
            IndelType::Insert => SimplifiedIndelType::Insert,
            IndelType::Delete => SimplifiedIndelType::Delete,
            IndelType::Swap => SimplifiedIndelType::Swap,
            IndelType::BreakpointLeft | IndelType::BreakpointRight => SimplifiedIndelType::Other,
        }
    }
}

/// Reference window addressed in contig coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceWindow<'a> {
    /// Bases of the window, uppercase ASCII.
    pub bases: &'a [u8],
    /// Contig coordinate of `bases[0]`.
    pub start: u32,
}

impl<'a> ReferenceWindow<'a> {
    /// Window over `bases` beginning at contig position `start`.
    pub fn new(bases: &'a [u8], start: u32) -> Self {
        Self { bases, start }
    }

    /// Base at contig position `pos`, `None` outside the window.
    pub fn base(&self, pos: u32) -> Option<u8> {
        let offset = pos.checked_sub(self.start)? as usize;
        self.bases.get(offset).map(u8::to_ascii_uppercase)
    }

    /// Bases over `[start, end)`, truncated to the window.
    pub fn slice(&self, start: u32, end: u32) -> &'a [u8] {
        let lo = (start.saturating_sub(self.start) as usize).min(self.bases.len());
        let hi = (end.saturating_sub(self.start) as usize).clamp(lo, self.bases.len());
        &self.bases[lo..hi]
    }
}

/// Repeat context of one indel allele.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelReportInfo {
    /// Reported indel shape.
    pub kind: SimplifiedIndelType,
    /// Minimal repeat unit of the inserted/deleted sequence; empty for swaps and
    /// breakpoints.
    pub repeat_unit: String,
    /// Copies of the repeat unit in the reference at the indel.
    pub ref_repeat_count: u32,
    /// Copies of the repeat unit on the indel haplotype.
    pub indel_repeat_count: u32,
}

impl IndelReportInfo {
    /// Report info with no repeat context.
    pub fn without_repeat(kind: SimplifiedIndelType) -> Self {
        Self {
            kind,
            repeat_unit: String::new(),
            ref_repeat_count: 0,
            indel_repeat_count: 0,
        }
    }

    /// Whether a repeat unit was identified.
    pub fn is_repeat_unit(&self) -> bool {
        !self.repeat_unit.is_empty()
    }

    /// Derive repeat context for `key` from the reference.
    ///
    /// The indel sequence is the inserted sequence for insertions and the
    /// deleted reference bases for deletions. Reference copies of its minimal
    /// repeat unit are counted rightwards from the indel position, so the key
    /// is expected to be left-shifted.
    pub fn from_reference(key: &IndelKey, insert_seq: &str, reference: &ReferenceWindow<'_>) -> Self {
        let kind = SimplifiedIndelType::from(key.kind);
        let indel_seq: Vec<u8> = match kind {
            SimplifiedIndelType::Insert => insert_seq.as_bytes().to_ascii_uppercase(),
            SimplifiedIndelType::Delete => reference.slice(key.pos, key.right_pos()).to_vec(),
            _ => return Self::without_repeat(kind),
        };
        if indel_seq.is_empty() {
            return Self::without_repeat(kind);
        }

        let unit = minimal_repeat_unit(&indel_seq);
        let indel_copies = (indel_seq.len() / unit.len()) as u32;
        let ref_repeat_count = count_repeat_copies(unit, reference, key.pos);
        let indel_repeat_count = match kind {
            SimplifiedIndelType::Insert => ref_repeat_count + indel_copies,
            _ => ref_repeat_count.saturating_sub(indel_copies),
        };

        Self {
            kind,
            repeat_unit: String::from_utf8_lossy(unit).into_owned(),
            ref_repeat_count,
            indel_repeat_count,
        }
    }
}

/// Shortest prefix whose repetition spells `seq`.
fn minimal_repeat_unit(seq: &[u8]) -> &[u8] {
    let len = seq.len();
    (1..=len)
        .filter(|unit_len| len % unit_len == 0)
        .map(|unit_len| &seq[..unit_len])
        .find(|unit| seq.chunks(unit.len()).all(|chunk| chunk == *unit))
        .unwrap_or(seq)
}

fn count_repeat_copies(unit: &[u8], reference: &ReferenceWindow<'_>, pos: u32) -> u32 {
    let mut copies = 0;
    let mut cursor = pos;
    loop {
        let next = cursor + unit.len() as u32;
        if reference.slice(cursor, next) != unit {
            return copies;
        }
        copies += 1;
        cursor = next;
    }
}

/// Length of the longest homopolymer the base at `pos` could belong to.
///
/// The site base is treated as either of its neighbours' bases (or itself), so
/// an SNV next to a run reports that run's length plus one.
pub fn homopolymer_length(reference: &ReferenceWindow<'_>, pos: u32) -> u32 {
    let Some(site_base) = reference.base(pos) else {
        return 0;
    };
    let left = pos.checked_sub(1).and_then(|p| reference.base(p));
    let right = reference.base(pos + 1);

    [Some(site_base), left, right]
        .into_iter()
        .flatten()
        .map(|base| {
            let mut run = 1;
            let mut p = pos;
            while let Some(prev) = p.checked_sub(1) {
                if reference.base(prev) != Some(base) {
                    break;
                }
                run += 1;
                p = prev;
            }
            let mut p = pos + 1;
            while reference.base(p) == Some(base) {
                run += 1;
                p += 1;
            }
            run
        })
        .max()
        .unwrap_or(0)
}
