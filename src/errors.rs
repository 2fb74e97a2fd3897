//! Error taxonomy for the counting pipeline.
//!
//! Three scopes, matching how failures are handled:
//!
//! - [`ConfigError`]: fatal, raised while building the analysis tree and
//!   before any computation starts.
//! - [`DataError`]: scoped to a single read or row; counting loops absorb
//!   these as per-item rejections.
//! - [`ConsistencyError`]: fatal, aborts the enclosing aggregation after the
//!   merge/filter stages produced something contradictory.
//!
//! Fatal errors carry the name of the owning tree node for diagnosis.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems detected before computation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reference DNA contained characters outside `ACGT`.
    #[error("reference sequence contains unexpected characters [{name}]")]
    InvalidReferenceCharacters {
        /// Owning node name.
        name: String,
    },

    /// Coding reference whose length is not a multiple of three.
    #[error("reference sequence contains incomplete codons [{name}]")]
    IncompleteCodons {
        /// Owning node name.
        name: String,
    },

    /// Protein coordinates were requested from a non-coding reference.
    #[error("reference is non-coding, no protein positions available [{name}]")]
    NonCodingReference {
        /// Owning node name.
        name: String,
    },

    /// Alignment score matrix was not symmetric.
    #[error("asymmetric alignment score matrix")]
    AsymmetricScoreMatrix,

    /// Barcode map file could not be opened or read.
    #[error("could not read barcode map file '{path}'")]
    BarcodeMapIo {
        /// Map file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Barcode map line did not split into exactly two fields.
    #[error("unexpected barcode map line format at line {line} [{name}]")]
    BarcodeMapFormat {
        /// Map name (derived from the file name).
        name: String,
        /// 1-based line number.
        line: usize,
    },

    /// Barcode contained characters outside `ACGT`.
    #[error("barcode contains unexpected characters at line {line} [{name}]")]
    InvalidBarcode {
        /// Map name.
        name: String,
        /// 1-based line number.
        line: usize,
    },

    /// Variant-mode map value contained characters outside `ACGTN`.
    #[error("variant DNA contains unexpected characters at line {line} [{name}]")]
    InvalidBarcodeValue {
        /// Map name.
        name: String,
        /// 1-based line number.
        line: usize,
    },

    /// One barcode was assigned two different values.
    #[error("barcode '{barcode}' assigned to multiple unique values [{name}]")]
    AmbiguousBarcode {
        /// Map name.
        name: String,
        /// Offending barcode.
        barcode: String,
    },

    /// Selection has no timepoint 0 baseline.
    #[error("missing timepoint 0 [{name}]")]
    MissingBaseline {
        /// Owning node name.
        name: String,
    },

    /// Selection has fewer than two timepoints.
    #[error("multiple timepoints required [{name}]")]
    TooFewTimepoints {
        /// Owning node name.
        name: String,
    },

    /// Scorer needs more timepoints than the selection provides.
    #[error("scoring method '{scorer}' requires at least {required} timepoints [{name}]")]
    InsufficientTimepoints {
        /// Owning node name.
        name: String,
        /// Scorer name.
        scorer: String,
        /// Minimum timepoints the scorer needs.
        required: usize,
    },

    /// Node has no children to aggregate.
    #[error("no sequencing libraries configured [{name}]")]
    NoLibraries {
        /// Owning node name.
        name: String,
    },

    /// Two siblings share one name.
    #[error("non-unique child name '{child}' [{name}]")]
    DuplicateChildName {
        /// Owning node name.
        name: String,
        /// Duplicated child name.
        child: String,
    },

    /// Counts file could not be opened or read.
    #[error("could not read counts file '{path}'")]
    CountsIo {
        /// Counts file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Counts file line was not `key<tab/space>count`.
    #[error("malformed counts line {line} in '{path}'")]
    CountsFormat {
        /// Counts file path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },

    /// Configuration document could not be opened or read.
    #[error("could not read configuration '{path}'")]
    ConfigIo {
        /// Configuration path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration document failed to deserialize.
    #[error("malformed configuration document")]
    ConfigParse {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// Library configuration matched none of the known kinds.
    #[error("library declares no variants, barcodes, or identifiers section [{name}]")]
    UnclassifiableLibrary {
        /// Library name.
        name: String,
    },
}

/// Problems scoped to one read or row; never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Read contained characters outside `ACGTNX`.
    #[error("read contains unexpected characters")]
    InvalidReadCharacters,

    /// Read length differs from the reference and no aligner is configured.
    #[error("read length differs from reference and no aligner is configured")]
    LengthMismatchWithoutAligner,

    /// More mutations than the configured budget, even after alignment.
    #[error("read exceeds the mutation budget of {max_mutations}")]
    ExcessMutations {
        /// Configured budget.
        max_mutations: usize,
    },

    /// Counted barcode is absent from the barcode map.
    #[error("barcode not present in the barcode map")]
    UnmappedBarcode,

    /// Observed fewer times than the configured minimum count.
    #[error("observed fewer than {minimum} times")]
    BelowMinCount {
        /// Configured minimum.
        minimum: u64,
    },
}

/// Fatal contradictions detected after merging and filtering.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    /// A required table is missing from the store.
    #[error("required table '{key}' does not exist [{name}]")]
    MissingTable {
        /// Owning node name.
        name: String,
        /// Store key.
        key: String,
    },

    /// A required table exists but holds no rows.
    #[error("required table '{key}' is empty [{name}]")]
    EmptyTable {
        /// Owning node name.
        name: String,
        /// Store key.
        key: String,
    },

    /// Libraries at different timepoints disagree on the key set.
    #[error("timepoints disagree on the {label} set [{name}]")]
    TimepointsDisagree {
        /// Owning node name.
        name: String,
        /// Element label.
        label: String,
    },

    /// A canonical table contains only the wild-type sentinel.
    #[error("no {label} other than the wild type remain [{name}]")]
    OnlyWildType {
        /// Owning node name.
        name: String,
        /// Element label.
        label: String,
    },

    /// A store key held a table of an unexpected shape.
    #[error("table '{key}' has unexpected shape [{name}]")]
    WrongTableKind {
        /// Owning node name.
        name: String,
        /// Store key.
        key: String,
    },
}
