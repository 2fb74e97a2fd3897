//! The aggregation tree: Experiment over Conditions over Selections over
//! Library leaves.
//!
//! Each node owns a keyed table store and is driven by one `calculate()`
//! entry point. Every stage checks whether its destination table already
//! exists before computing, so a rerun against a populated store performs
//! no further work and a crashed run resumes from the last completed stage.

mod condition;
mod experiment;
mod library;
mod selection;

use thiserror::Error;

pub use condition::Condition;
pub use experiment::Experiment;
pub use library::{CountSource, Library, LibraryKind, RejectionStats};
pub use selection::Selection;

use crate::errors::{ConfigError, ConsistencyError};
use crate::score::ScoreError;
use crate::sequence::AlignError;

/// Element labels in canonical processing order.
pub const ELEMENT_LABELS: [&str; 4] = ["barcodes", "identifiers", "variants", "synonymous"];

/// Default number of keys merged per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Any fatal error raised while running the aggregation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration detected before computation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Contradictory state detected after merging or filtering.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// Scoring failure.
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// Internal alignment failure.
    #[error(transparent)]
    Align(#[from] AlignError),
}
