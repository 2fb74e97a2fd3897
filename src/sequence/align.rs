//! Global pairwise alignment between a read and the reference.
//!
//! Full Needleman-Wunsch dynamic programming over a symmetric six-symbol
//! (`ACGTNX`) score matrix with one constant gap penalty for both opening
//! and extension. O(m*n) time and space, which restricts it to
//! amplicon-scale input (hundreds of bases); it exists as the fallback for
//! indel-bearing reads, not as a general-purpose aligner.

use thiserror::Error;

/// Kind of a single edit between reference and query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Bases agree.
    Match,
    /// Bases differ (substitution).
    Mismatch,
    /// Bases present in the query only.
    Insertion,
    /// Bases present in the reference only.
    Deletion,
}

/// One entry of the edit script produced by [`Aligner::align`].
///
/// `ref_pos` and `query_pos` are 0-based positions into the reference and
/// query. Match and mismatch entries always have length 1; insertion and
/// deletion entries carry the merged run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOp {
    /// 0-based reference position.
    pub ref_pos: usize,
    /// 0-based query position.
    pub query_pos: usize,
    /// Edit kind.
    pub kind: EditKind,
    /// Run length (1 for match/mismatch).
    pub length: usize,
}

/// Errors surfaced during alignment.
#[derive(Debug, Error)]
pub enum AlignError {
    /// Reference or query was empty; callers must not request this.
    #[error("cannot align an empty sequence")]
    EmptySequence,

    /// Input contained a base outside `ACGTNX`.
    #[error("unsupported base '{base}' at offset {offset}")]
    UnsupportedBase {
        /// Offending base.
        base: char,
        /// Offset within the sequence.
        offset: usize,
    },

    /// Adjacent indel runs of different kinds could not be merged. This is
    /// an internal error that signals a misconfigured gap penalty.
    #[error("failed to combine adjacent indels, check the gap penalty")]
    GapMergeConflict,
}

const SYMBOLS: usize = 6;

fn symbol_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        b'N' => Some(4),
        b'X' => Some(5),
        _ => None,
    }
}

/// Symmetric substitution score matrix plus a constant gap penalty.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    scores: [[i32; SYMBOLS]; SYMBOLS],
    gap: i32,
}

impl ScoreMatrix {
    /// Default scores: +1 match, -1 mismatch, 0 against `N`/`X`, gap -1.
    pub fn simple() -> Self {
        let mut scores = [[0i32; SYMBOLS]; SYMBOLS];
        for (i, row) in scores.iter_mut().enumerate().take(4) {
            for (j, cell) in row.iter_mut().enumerate().take(4) {
                *cell = if i == j { 1 } else { -1 };
            }
        }
        // N and X rows/columns stay 0: unresolved bases are score-neutral.
        Self { scores, gap: -1 }
    }

    /// Build a custom matrix, rejecting asymmetric score tables.
    pub fn new(
        scores: [[i32; SYMBOLS]; SYMBOLS],
        gap: i32,
    ) -> Result<Self, crate::errors::ConfigError> {
        for i in 0..SYMBOLS {
            for j in 0..SYMBOLS {
                if scores[i][j] != scores[j][i] {
                    return Err(crate::errors::ConfigError::AsymmetricScoreMatrix);
                }
            }
        }
        Ok(Self { scores, gap })
    }

    fn score(&self, a: usize, b: usize) -> i32 {
        self.scores[a][b]
    }

    /// Gap penalty applied per inserted or deleted base.
    pub fn gap(&self) -> i32 {
        self.gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trace {
    End,
    Diagonal,
    Up,
    Left,
}

/// Needleman-Wunsch global aligner.
///
/// Tracks the number of alignments performed so callers can report how often
/// the slow path was taken.
#[derive(Debug, Clone)]
pub struct Aligner {
    matrix: ScoreMatrix,
    calls: u64,
}

impl Aligner {
    /// Aligner with a custom score matrix.
    pub fn new(matrix: ScoreMatrix) -> Self {
        Self { matrix, calls: 0 }
    }

    /// Aligner with the default score matrix.
    pub fn with_default_matrix() -> Self {
        Self::new(ScoreMatrix::simple())
    }

    /// Number of alignments performed so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Align `query` against `reference`, returning the ordered edit script.
    ///
    /// Adjacent insertion or deletion entries of the same kind are merged
    /// into one run with summed length.
    pub fn align(&mut self, reference: &[u8], query: &[u8]) -> Result<Vec<EditOp>, AlignError> {
        if reference.is_empty() || query.is_empty() {
            return Err(AlignError::EmptySequence);
        }
        let ref_codes = encode(reference)?;
        let query_codes = encode(query)?;

        let m = ref_codes.len();
        let n = query_codes.len();
        let gap = self.matrix.gap();

        // Dense score/trace matrix, row-major over (m + 1) x (n + 1).
        let cols = n + 1;
        let mut cells = vec![(0i32, Trace::End); (m + 1) * cols];
        for i in 1..=m {
            cells[i * cols] = (gap * i as i32, Trace::Up);
        }
        for j in 1..=n {
            cells[j] = (gap * j as i32, Trace::Left);
        }

        for i in 1..=m {
            for j in 1..=n {
                let diagonal = (
                    cells[(i - 1) * cols + (j - 1)].0
                        + self.matrix.score(ref_codes[i - 1], query_codes[j - 1]),
                    Trace::Diagonal,
                );
                let up = (cells[(i - 1) * cols + j].0 + gap, Trace::Up);
                let left = (cells[i * cols + (j - 1)].0 + gap, Trace::Left);

                // Tie preference: deletion, then insertion, then diagonal.
                let mut best = up;
                if left.0 > best.0 {
                    best = left;
                }
                if diagonal.0 > best.0 {
                    best = diagonal;
                }
                cells[i * cols + j] = best;
            }
        }

        // Reconstruct the per-base edit list from the traceback.
        let mut edits = Vec::with_capacity(m.max(n));
        let mut i = m;
        let mut j = n;
        while i > 0 || j > 0 {
            match cells[i * cols + j].1 {
                Trace::Diagonal => {
                    let kind = if ref_codes[i - 1] == query_codes[j - 1] {
                        EditKind::Match
                    } else {
                        EditKind::Mismatch
                    };
                    edits.push(EditOp {
                        ref_pos: i - 1,
                        query_pos: j - 1,
                        kind,
                        length: 1,
                    });
                    i -= 1;
                    j -= 1;
                }
                Trace::Left => {
                    edits.push(EditOp {
                        ref_pos: i.saturating_sub(1),
                        query_pos: j - 1,
                        kind: EditKind::Insertion,
                        length: 1,
                    });
                    j -= 1;
                }
                Trace::Up => {
                    edits.push(EditOp {
                        ref_pos: i - 1,
                        query_pos: j.saturating_sub(1),
                        kind: EditKind::Deletion,
                        length: 1,
                    });
                    i -= 1;
                }
                Trace::End => break,
            }
        }
        edits.reverse();

        self.calls += 1;
        merge_indel_runs(edits)
    }
}

fn encode(sequence: &[u8]) -> Result<Vec<usize>, AlignError> {
    sequence
        .iter()
        .enumerate()
        .map(|(offset, &base)| {
            symbol_index(base).ok_or(AlignError::UnsupportedBase {
                base: base as char,
                offset,
            })
        })
        .collect()
}

/// Merge adjacent indel entries of the same kind into single runs.
///
/// Two adjacent runs of *different* kinds indicate that the gap penalty let
/// an insertion and a deletion sit side by side, which the downstream
/// variant grammar cannot express; that is reported as a fatal error.
fn merge_indel_runs(edits: Vec<EditOp>) -> Result<Vec<EditOp>, AlignError> {
    let mut merged: Vec<EditOp> = Vec::with_capacity(edits.len());
    let mut pending: Option<EditOp> = None;

    for edit in edits {
        match edit.kind {
            EditKind::Insertion | EditKind::Deletion => match pending.as_mut() {
                Some(run) if run.kind == edit.kind => {
                    run.length += edit.length;
                }
                Some(_) => return Err(AlignError::GapMergeConflict),
                None => pending = Some(edit),
            },
            EditKind::Match | EditKind::Mismatch => {
                if let Some(run) = pending.take() {
                    merged.push(run);
                }
                merged.push(edit);
            }
        }
    }
    if let Some(run) = pending {
        merged.push(run);
    }
    Ok(merged)
}
