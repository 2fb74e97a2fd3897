//! The variant-calling engine.
//!
//! [`VariantCaller::call`] converts one raw read into a canonical mutation
//! string against the reference, comparing base-by-base and falling back to
//! pairwise alignment for reads that look like they contain indels.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::DataError;
use crate::sequence::{
    aa_three_letter, translate_codon, AlignError, Aligner, EditKind, ReferenceSequence,
};

use super::{MUTATION_SEPARATOR, WILD_TYPE_VARIANT};

/// Change carried by one [`Mutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Single-base substitution.
    Substitution {
        /// Reference base.
        reference: char,
        /// Read base.
        alternate: char,
    },
    /// Bases present in the read only.
    Insertion {
        /// Inserted sequence.
        seq: String,
        /// Whether the insertion duplicates the bases immediately before it.
        duplication: bool,
    },
    /// Bases present in the reference only.
    Deletion {
        /// Number of deleted bases.
        length: usize,
    },
}

impl Change {
    /// Whether this change is an insertion or deletion.
    pub fn is_indel(&self) -> bool {
        !matches!(self, Change::Substitution { .. })
    }
}

/// One mutation at a 0-based reference position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// 0-based reference position (start of the run for indels).
    pub position: usize,
    /// The change at that position.
    pub change: Change,
}

/// Result of calling one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The read matches the reference exactly.
    WildType,
    /// Canonical mutation string for the read.
    Variant(String),
    /// The read was rejected; the reason is recorded per-read, not fatal.
    Rejected(DataError),
}

/// Converts raw reads into canonical variant strings.
///
/// Alignment results are cached per counting pass keyed by the raw read
/// sequence; the owning library clears the cache once its pass completes so
/// memory stays bounded by the pass, not the process.
#[derive(Debug)]
pub struct VariantCaller {
    reference: Arc<ReferenceSequence>,
    aligner: Option<Aligner>,
    max_mutations: usize,
    cache: HashMap<String, Vec<Mutation>>,
}

impl VariantCaller {
    /// Create a caller for `reference` with an optional alignment fallback.
    pub fn new(
        reference: Arc<ReferenceSequence>,
        aligner: Option<Aligner>,
        max_mutations: usize,
    ) -> Self {
        Self {
            reference,
            aligner,
            max_mutations,
            cache: HashMap::new(),
        }
    }

    /// The reference this caller calls against.
    pub fn reference(&self) -> &Arc<ReferenceSequence> {
        &self.reference
    }

    /// Whether an aligner is configured.
    pub fn has_aligner(&self) -> bool {
        self.aligner.is_some()
    }

    /// Number of alignments performed so far (0 without an aligner).
    pub fn aligner_calls(&self) -> u64 {
        self.aligner.as_ref().map_or(0, Aligner::calls)
    }

    /// Drop the per-pass alignment cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Call one read against the reference.
    ///
    /// Per-read problems (bad characters, length mismatch without an
    /// aligner, mutation budget overruns) come back as
    /// [`CallOutcome::Rejected`]; only internal alignment failures are
    /// errors.
    pub fn call(&mut self, read: &str) -> Result<CallOutcome, AlignError> {
        if read.is_empty()
            || !read
                .bytes()
                .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N' | b'X'))
        {
            return Ok(CallOutcome::Rejected(DataError::InvalidReadCharacters));
        }
        let read = read.to_ascii_uppercase();

        let mutations = if read.len() != self.reference.len() {
            // Indels guaranteed; alignment is mandatory here.
            if self.aligner.is_none() {
                debug!(read = %read, "rejected read: length mismatch without aligner");
                return Ok(CallOutcome::Rejected(DataError::LengthMismatchWithoutAligner));
            }
            self.align_read(&read)?
        } else {
            match self.walk_read(&read)? {
                Ok(mutations) => mutations,
                Err(rejection) => return Ok(CallOutcome::Rejected(rejection)),
            }
        };

        if mutations.is_empty() {
            return Ok(CallOutcome::WildType);
        }
        Ok(CallOutcome::Variant(self.render(&read, &mutations)))
    }

    /// Base-by-base comparison for equal-length reads, with the alignment
    /// fallback once the running mutation count exceeds the budget.
    fn walk_read(&mut self, read: &str) -> Result<Result<Vec<Mutation>, DataError>, AlignError> {
        let reference = Arc::clone(&self.reference);
        let ref_bytes = reference.dna().as_bytes();
        let read_bytes = read.as_bytes();

        let mut mutations = Vec::new();
        for (i, (&r, &q)) in ref_bytes.iter().zip(read_bytes.iter()).enumerate() {
            if r == q {
                continue;
            }
            mutations.push(Mutation {
                position: i,
                change: Change::Substitution {
                    reference: r as char,
                    alternate: q as char,
                },
            });
            if mutations.len() > self.max_mutations {
                if self.aligner.is_some() {
                    // The alignment wholly replaces the position walk.
                    let aligned = self.align_read(read)?;
                    if aligned.len() > self.max_mutations {
                        debug!(read = %read, "rejected read: excess mutations after alignment");
                        return Ok(Err(DataError::ExcessMutations {
                            max_mutations: self.max_mutations,
                        }));
                    }
                    return Ok(Ok(aligned));
                }
                debug!(read = %read, "rejected read: excess mutations");
                return Ok(Err(DataError::ExcessMutations {
                    max_mutations: self.max_mutations,
                }));
            }
        }
        Ok(Ok(mutations))
    }

    /// Align the read and convert the edit script to mutations, consulting
    /// the per-pass cache first.
    fn align_read(&mut self, read: &str) -> Result<Vec<Mutation>, AlignError> {
        if let Some(cached) = self.cache.get(read) {
            return Ok(cached.clone());
        }

        let aligner = self
            .aligner
            .as_mut()
            .expect("align_read called without an aligner");
        let edits = aligner.align(self.reference.dna().as_bytes(), read.as_bytes())?;

        let read_bytes = read.as_bytes();
        let ref_bytes = self.reference.dna().as_bytes();
        let mut mutations = Vec::new();
        for edit in edits {
            match edit.kind {
                EditKind::Match => {}
                EditKind::Mismatch => mutations.push(Mutation {
                    position: edit.ref_pos,
                    change: Change::Substitution {
                        reference: ref_bytes[edit.ref_pos] as char,
                        alternate: read_bytes[edit.query_pos] as char,
                    },
                }),
                EditKind::Insertion => {
                    let seq = String::from_utf8_lossy(
                        &read_bytes[edit.query_pos..edit.query_pos + edit.length],
                    )
                    .into_owned();
                    let duplication = edit.query_pos > edit.length
                        && read_bytes[edit.query_pos - edit.length..edit.query_pos]
                            == read_bytes[edit.query_pos..edit.query_pos + edit.length];
                    mutations.push(Mutation {
                        position: edit.ref_pos,
                        change: Change::Insertion { seq, duplication },
                    });
                }
                EditKind::Deletion => mutations.push(Mutation {
                    position: edit.ref_pos,
                    change: Change::Deletion {
                        length: edit.length,
                    },
                }),
            }
        }

        self.cache.insert(read.to_string(), mutations.clone());
        Ok(mutations)
    }

    /// Render mutations into the canonical joined string.
    fn render(&self, read: &str, mutations: &[Mutation]) -> String {
        let offset = self.reference.dna_offset();
        let coding = self.reference.is_coding();
        let prefix = if coding { "c" } else { "n" };

        // Translation of the read, with unresolved codons as '?'. Codons
        // touching an indel or an N/X base fail translation naturally.
        let read_protein: Option<Vec<char>> = coding.then(|| {
            read.as_bytes()
                .chunks(3)
                .map(|codon| translate_codon(codon).unwrap_or('?'))
                .collect()
        });

        let mut tokens = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            let dna_pos = mutation.position + offset + 1;
            let base = match &mutation.change {
                Change::Substitution {
                    reference,
                    alternate,
                } => format!("{prefix}.{dna_pos}{reference}>{alternate}"),
                Change::Insertion { seq, duplication } => {
                    if *duplication {
                        format!("{prefix}.{dna_pos}dup{seq}")
                    } else {
                        format!("{prefix}.{dna_pos}_{}ins{seq}", dna_pos + 1)
                    }
                }
                Change::Deletion { length } => {
                    format!("{prefix}.{dna_pos}_{}del", dna_pos + length - 1)
                }
            };

            let token = if let Some(protein) = self.reference.protein() {
                let pro_idx = mutation.position / 3;
                let pro_pos = pro_idx + self.reference.protein_offset() + 1;
                let ref_aa = protein.as_bytes()[pro_idx] as char;
                if mutation.change.is_indel() {
                    format!("{base} (p.{}{}fs)", aa_three_letter(ref_aa), pro_pos)
                } else {
                    let read_aa = read_protein
                        .as_ref()
                        .and_then(|p| p.get(pro_idx).copied())
                        .unwrap_or('?');
                    if read_aa == ref_aa {
                        format!("{base} (p.=)")
                    } else {
                        format!(
                            "{base} (p.{}{}{})",
                            aa_three_letter(ref_aa),
                            pro_pos,
                            aa_three_letter(read_aa)
                        )
                    }
                }
            } else {
                base
            };
            tokens.push(token);
        }
        tokens.join(MUTATION_SEPARATOR)
    }
}
