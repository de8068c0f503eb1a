use std::fmt;

/// Shape of an indel candidate relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndelType {
    /// Sequence inserted after `pos`.
    Insert,
    /// Reference bases removed starting at `pos`.
    Delete,
    /// Reference bases replaced by a different inserted sequence.
    Swap,
    /// Left side of a large-insertion breakpoint (insert length unknown).
    BreakpointLeft,
    /// Right side of a large-insertion breakpoint (insert length unknown).
    BreakpointRight,
}

impl IndelType {
    /// Short label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            IndelType::Insert => "I",
            IndelType::Delete => "D",
            IndelType::Swap => "S",
            IndelType::BreakpointLeft => "BP_LEFT",
            IndelType::BreakpointRight => "BP_RIGHT",
        }
    }
}

/// Identifies an indel candidate by position, type and length.
///
/// Keys order by position first, so an ordered map of keys iterates indels in
/// genomic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndelKey {
    /// 0-based reference position of the indel.
    pub pos: u32,
    /// Indel shape.
    pub kind: IndelType,
    /// Insert length for insertions and swaps, deleted length for deletions.
    pub length: u32,
    /// Deleted length of a swap; zero for every other type.
    pub swap_delete_length: u32,
}

impl IndelKey {
    /// Key for a plain insertion of `length` bases.
    pub fn insertion(pos: u32, length: u32) -> Self {
        Self::new(pos, IndelType::Insert, length)
    }

    /// Key for a plain deletion of `length` reference bases.
    pub fn deletion(pos: u32, length: u32) -> Self {
        Self::new(pos, IndelType::Delete, length)
    }

    /// Key for a swap replacing `delete_length` reference bases with
    /// `insert_length` inserted bases.
    pub fn swap(pos: u32, insert_length: u32, delete_length: u32) -> Self {
        Self {
            pos,
            kind: IndelType::Swap,
            length: insert_length,
            swap_delete_length: delete_length,
        }
    }

    /// Generic constructor without a swap component.
    pub fn new(pos: u32, kind: IndelType, length: u32) -> Self {
        Self {
            pos,
            kind,
            length,
            swap_delete_length: 0,
        }
    }

    /// Whether this key describes a breakpoint with undetermined insert length.
    pub fn is_breakpoint(&self) -> bool {
        matches!(self.kind, IndelType::BreakpointLeft | IndelType::BreakpointRight)
    }

    /// Number of inserted bases expected in read evidence for this indel.
    pub fn insert_length(&self) -> u32 {
        match self.kind {
            IndelType::Insert | IndelType::Swap => self.length,
            _ => 0,
        }
    }

    /// Number of reference bases removed by this indel.
    pub fn delete_length(&self) -> u32 {
        match self.kind {
            IndelType::Delete => self.length,
            IndelType::Swap => self.swap_delete_length,
            _ => 0,
        }
    }

    /// Exclusive reference end of the indel footprint.
    pub fn right_pos(&self) -> u32 {
        self.pos + self.delete_length()
    }
}

impl fmt::Display for IndelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}{}", self.pos, self.kind.label(), self.length)?;
        if self.kind == IndelType::Swap {
            write!(f, "/{}", self.swap_delete_length)?;
        }
        Ok(())
    }
}
