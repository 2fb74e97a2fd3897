//! Reference (wild-type) sequence handling.
//!
//! A [`ReferenceSequence`] owns the canonical nucleotide sequence that reads
//! are called against, the coding frame, and the derived protein translation.
//! Coordinates reported to users are 1-based and offset-adjusted; internal
//! indices are 0-based.

use tracing::warn;

use crate::errors::ConfigError;

/// Translate one codon into a single-letter amino acid code.
///
/// Returns `None` for anything that is not a complete `ACGT` codon, which
/// covers codons disrupted by indels or by `N`/`X` bases.
pub fn translate_codon(codon: &[u8]) -> Option<char> {
    if codon.len() != 3 {
        return None;
    }
    let aa = match codon {
        b"TTT" | b"TTC" => 'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => 'L',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => 'S',
        b"TAT" | b"TAC" => 'Y',
        b"TAA" | b"TGA" | b"TAG" => '*',
        b"TGT" | b"TGC" => 'C',
        b"TGG" => 'W',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => 'P',
        b"CAT" | b"CAC" => 'H',
        b"CAA" | b"CAG" => 'Q',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => 'R',
        b"ATT" | b"ATC" | b"ATA" => 'I',
        b"ATG" => 'M',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => 'T',
        b"AAT" | b"AAC" => 'N',
        b"AAA" | b"AAG" => 'K',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => 'V',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => 'A',
        b"GAT" | b"GAC" => 'D',
        b"GAA" | b"GAG" => 'E',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => 'G',
        _ => return None,
    };
    Some(aa)
}

/// Three-letter amino acid code for a single-letter code.
///
/// `*` maps to `Ter` and the unresolved placeholder `?` maps to `???`.
pub fn aa_three_letter(aa: char) -> &'static str {
    match aa {
        'A' => "Ala",
        'R' => "Arg",
        'N' => "Asn",
        'D' => "Asp",
        'C' => "Cys",
        'E' => "Glu",
        'Q' => "Gln",
        'G' => "Gly",
        'H' => "His",
        'I' => "Ile",
        'L' => "Leu",
        'K' => "Lys",
        'M' => "Met",
        'F' => "Phe",
        'P' => "Pro",
        'S' => "Ser",
        'T' => "Thr",
        'W' => "Trp",
        'Y' => "Tyr",
        'V' => "Val",
        '*' => "Ter",
        _ => "???",
    }
}

/// Wild-type reference sequence with optional protein translation.
///
/// Immutable after construction. Equality is structural over the DNA, the
/// protein translation, and the DNA offset; the protein offset is derived
/// from those and does not participate.
#[derive(Debug, Clone)]
pub struct ReferenceSequence {
    dna: String,
    protein: Option<String>,
    dna_offset: usize,
    protein_offset: usize,
}

impl PartialEq for ReferenceSequence {
    fn eq(&self, other: &Self) -> bool {
        self.dna == other.dna
            && self.protein == other.protein
            && self.dna_offset == other.dna_offset
    }
}

impl Eq for ReferenceSequence {}

impl ReferenceSequence {
    /// Validate and construct a reference sequence.
    ///
    /// `dna` must contain only `ACGT` (case-insensitive). For coding
    /// references the length must be a multiple of three; a `dna_offset`
    /// that is not a multiple of three is kept for DNA coordinates but the
    /// protein offset falls back to 0 with a warning.
    pub fn new(
        name: &str,
        dna: &str,
        coding: bool,
        dna_offset: usize,
    ) -> Result<Self, ConfigError> {
        let dna = dna.to_ascii_uppercase();
        if dna.is_empty() || !dna.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T')) {
            return Err(ConfigError::InvalidReferenceCharacters {
                name: name.to_string(),
            });
        }

        let (protein, protein_offset) = if coding {
            if dna.len() % 3 != 0 {
                return Err(ConfigError::IncompleteCodons {
                    name: name.to_string(),
                });
            }
            let protein: String = dna
                .as_bytes()
                .chunks(3)
                .map(|codon| translate_codon(codon).unwrap_or('?'))
                .collect();
            let protein_offset = if dna_offset % 3 == 0 {
                dna_offset / 3
            } else {
                warn!(
                    name,
                    dna_offset, "ignoring reference offset for protein changes (not a multiple of three)"
                );
                0
            };
            (Some(protein), protein_offset)
        } else {
            (None, 0)
        };

        Ok(Self {
            dna,
            protein,
            dna_offset,
            protein_offset,
        })
    }

    /// The reference DNA sequence (uppercase).
    pub fn dna(&self) -> &str {
        &self.dna
    }

    /// The derived protein sequence, if coding.
    pub fn protein(&self) -> Option<&str> {
        self.protein.as_deref()
    }

    /// Offset added to 0-based DNA indices when reporting coordinates.
    pub fn dna_offset(&self) -> usize {
        self.dna_offset
    }

    /// Offset added to 0-based protein indices when reporting coordinates.
    pub fn protein_offset(&self) -> usize {
        self.protein_offset
    }

    /// Whether the reference is protein coding.
    pub fn is_coding(&self) -> bool {
        self.protein.is_some()
    }

    /// Reference length in bases.
    pub fn len(&self) -> usize {
        self.dna.len()
    }

    /// Whether the sequence is empty (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.dna.is_empty()
    }

    /// 1-based, offset-adjusted (position, symbol) pairs.
    ///
    /// With `protein = true` the pairs walk the protein translation; this is
    /// an error for non-coding references.
    pub fn position_tuples(
        &self,
        name: &str,
        protein: bool,
    ) -> Result<Vec<(usize, char)>, ConfigError> {
        let (seq, offset) = if protein {
            match &self.protein {
                Some(p) => (p.as_str(), self.protein_offset),
                None => {
                    return Err(ConfigError::NonCodingReference {
                        name: name.to_string(),
                    })
                }
            }
        } else {
            (self.dna.as_str(), self.dna_offset)
        };
        Ok(seq
            .chars()
            .enumerate()
            .map(|(i, symbol)| (i + offset + 1, symbol))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"AAA", Some('K'); "lysine")]
    #[test_case(b"AAC", Some('N'); "asparagine")]
    #[test_case(b"TAA", Some('*'); "stop")]
    #[test_case(b"AAN", None; "ambiguous base")]
    #[test_case(b"AA", None; "short codon")]
    fn codon_translation(codon: &[u8], expected: Option<char>) {
        assert_eq!(translate_codon(codon), expected);
    }

    #[test]
    fn coding_reference_translates() {
        let r = ReferenceSequence::new("wt", "ATGAAA", true, 0).unwrap();
        assert_eq!(r.protein(), Some("MK"));
        assert!(r.is_coding());
    }

    #[test]
    fn lowercase_input_is_normalized() {
        let r = ReferenceSequence::new("wt", "atgaaa", true, 0).unwrap();
        assert_eq!(r.dna(), "ATGAAA");
    }

    #[test]
    fn incomplete_codons_are_fatal() {
        let err = ReferenceSequence::new("wt", "ATGAA", true, 0).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteCodons { .. }));
    }

    #[test]
    fn invalid_characters_are_fatal() {
        let err = ReferenceSequence::new("wt", "ATGRAA", false, 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidReferenceCharacters { .. }));
    }

    #[test]
    fn misaligned_offset_resets_protein_offset_only() {
        let r = ReferenceSequence::new("wt", "ATGAAA", true, 4).unwrap();
        assert_eq!(r.dna_offset(), 4);
        assert_eq!(r.protein_offset(), 0);
    }

    #[test]
    fn position_tuples_apply_offsets() {
        let r = ReferenceSequence::new("wt", "ATGAAA", true, 6).unwrap();
        let dna = r.position_tuples("wt", false).unwrap();
        assert_eq!(dna[0], (7, 'A'));
        let protein = r.position_tuples("wt", true).unwrap();
        assert_eq!(protein, vec![(3, 'M'), (4, 'K')]);
    }

    #[test]
    fn protein_tuples_require_coding() {
        let r = ReferenceSequence::new("wt", "ATGAAA", false, 0).unwrap();
        assert!(r.position_tuples("wt", true).is_err());
    }

    #[test]
    fn equality_ignores_protein_offset() {
        let a = ReferenceSequence::new("a", "ATGAAA", true, 0).unwrap();
        let b = ReferenceSequence::new("b", "ATGAAA", true, 0).unwrap();
        assert_eq!(a, b);
    }
}
