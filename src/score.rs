//! Pluggable scoring over canonical count tables.
//!
//! Scoring is delegated to a [`Scorer`] injected into the selection. The
//! aggregation pipeline exposes only a narrow capability surface
//! ([`SelectionData`]): the ordered timepoint list, the per-label canonical
//! table, coding and reference flags, and the default chunk size.

use thiserror::Error;

use crate::store::{ScoreTable, WideTable};
use crate::variant::WILD_TYPE_VARIANT;

/// Errors produced while scoring a canonical table.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The baseline (timepoint 0) column is required but missing.
    #[error("canonical table for '{label}' has no baseline column")]
    MissingBaseline {
        /// Element label being scored.
        label: String,
    },

    /// A canonical row was incomplete; filtering should have removed it.
    #[error("canonical table for '{label}' contains an unobserved cell at key '{key}'")]
    IncompleteRow {
        /// Element label being scored.
        label: String,
        /// Offending row key.
        key: String,
    },
}

/// What the aggregation pipeline exposes to a scorer.
pub trait SelectionData {
    /// Ordered, ascending timepoints.
    fn timepoints(&self) -> &[u32];

    /// Filtered canonical counts for an element label, if derived.
    fn canonical_table(&self, label: &str) -> Option<&WideTable>;

    /// Whether the selection scores against a protein-coding reference.
    fn is_coding(&self) -> bool;

    /// Whether the selection has a wild-type reference at all.
    fn has_reference(&self) -> bool;

    /// Preferred row-chunk size for table traversal.
    fn chunk_size(&self) -> usize;
}

/// A scoring method applied to each element label of a selection.
pub trait Scorer {
    /// Short method name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Minimum number of timepoints the method needs.
    fn minimum_timepoints(&self) -> usize;

    /// Whether scores carry variances usable for outlier detection.
    fn supports_outliers(&self) -> bool;

    /// Score one element label's canonical table.
    fn score(&self, data: &dyn SelectionData, label: &str) -> Result<ScoreTable, ScoreError>;
}

/// Log-ratio enrichment of the final timepoint against the baseline.
///
/// For counts `c0` at timepoint 0 and `cN` at the last timepoint, the score
/// is `ln((cN + 0.5) / (c0 + 0.5))` and the standard error is the Poisson
/// approximation `sqrt(1/(c0 + 0.5) + 1/(cN + 0.5))`. The half-count offset
/// keeps zero-count cells finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioScorer;

impl Scorer for RatioScorer {
    fn name(&self) -> &'static str {
        "ratios"
    }

    fn minimum_timepoints(&self) -> usize {
        2
    }

    fn supports_outliers(&self) -> bool {
        true
    }

    fn score(&self, data: &dyn SelectionData, label: &str) -> Result<ScoreTable, ScoreError> {
        let table = match data.canonical_table(label) {
            Some(table) => table,
            None => return Ok(ScoreTable::new()),
        };
        if table.timepoints().first() != Some(&0) {
            return Err(ScoreError::MissingBaseline {
                label: label.to_string(),
            });
        }

        let mut scores = ScoreTable::new();
        for (key, row) in table.iter() {
            let cell = |idx: usize| {
                row[idx].ok_or_else(|| ScoreError::IncompleteRow {
                    label: label.to_string(),
                    key: key.to_string(),
                })
            };
            let c0 = cell(0)? as f64 + 0.5;
            let c_last = cell(row.len() - 1)? as f64 + 0.5;
            let score = (c_last / c0).ln();
            let se = (1.0 / c0 + 1.0 / c_last).sqrt();
            scores.insert(key, score, se);
        }
        Ok(scores)
    }
}

/// Scoring method that stops after counting; produces no score tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountsOnlyScorer;

impl Scorer for CountsOnlyScorer {
    fn name(&self) -> &'static str {
        "counts only"
    }

    fn minimum_timepoints(&self) -> usize {
        2
    }

    fn supports_outliers(&self) -> bool {
        false
    }

    fn score(&self, _data: &dyn SelectionData, _label: &str) -> Result<ScoreTable, ScoreError> {
        Ok(ScoreTable::new())
    }
}

/// Whether a score table row should be skipped by outlier detection.
pub(crate) fn is_wild_type_key(key: &str) -> bool {
    key == WILD_TYPE_VARIANT
}
