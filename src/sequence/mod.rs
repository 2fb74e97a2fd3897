//! Reference sequences and pairwise alignment.

mod align;
mod reference;

pub use align::{AlignError, Aligner, EditKind, EditOp, ScoreMatrix};
pub use reference::{aa_three_letter, translate_codon, ReferenceSequence};
