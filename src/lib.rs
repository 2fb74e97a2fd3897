//! # Deep mutational scanning count engine
//!
//! Turns sequencing reads from a deep-mutational-scanning experiment into
//! per-variant count tables across time points, and aggregates those tables
//! for scoring.
//!
//! ## Pipeline
//!
//! 1. **Variant calling**: each read is compared base-by-base against the
//!    wild-type reference; reads that look like they contain indels fall
//!    back to full Needleman-Wunsch alignment. The result is a canonical
//!    HGVS-like mutation string.
//! 2. **Counting**: library leaves tabulate canonical keys (variants,
//!    barcodes, identifiers, synonymous groups) into per-label tables.
//! 3. **Aggregation**: selections merge same-timepoint libraries, filter to
//!    complete cases, combine barcode maps, score, and compute outlier
//!    statistics. Every stage is idempotent over the node's table store, so
//!    interrupted runs resume from the last completed stage.
//!
//! ## Usage Example
//!
//! ```ignore
//! use mutscan::config::{build_experiment, load_config};
//!
//! let config = load_config(Path::new("experiment.json"))?;
//! let mut experiment = build_experiment(&config)?;
//! experiment.calculate()?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod barcode; // Barcode-to-variant/identifier maps
pub mod config; // JSON documents and tree construction
pub mod errors; // Error taxonomy
pub mod score; // Pluggable scoring over canonical tables
pub mod sequence; // Reference sequences and pairwise alignment
pub mod stats; // Outlier statistics
pub mod store; // Keyed table storage
pub mod tree; // The aggregation tree
pub mod variant; // Variant descriptors and the calling engine

pub use barcode::{BarcodeIndex, ValueMode};
pub use errors::{ConfigError, ConsistencyError, DataError};
pub use sequence::{Aligner, ReferenceSequence, ScoreMatrix};
pub use tree::{Condition, Experiment, Library, LibraryKind, Selection};
pub use variant::{CallOutcome, VariantCaller};
