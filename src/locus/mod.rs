//! Genotyped locus records handed from the genotyper to phasing and scoring.

mod filters;
mod indel;
mod repeat;
mod site;

pub use filters::{FilterSet, GermlineFilter};
pub use indel::{IndelAllele, IndelLocus};
pub use repeat::{homopolymer_length, IndelReportInfo, ReferenceWindow, SimplifiedIndelType};
pub use site::{LocusSampleInfo, PhasedAllele, SiteLocus};
