//! Variant descriptors and the read-to-variant calling engine.

mod caller;
mod hgvs;

pub use caller::{CallOutcome, Change, Mutation, VariantCaller};
pub use hgvs::{has_unresolvable, protein_variant, HgvsError};

/// Canonical key used to count reads identical to the reference.
pub const WILD_TYPE_VARIANT: &str = "_wt";

/// Canonical key for variants whose protein changes are all synonymous.
pub const SYNONYMOUS_VARIANT: &str = "_sy";

/// Separator joining mutation tokens into one canonical variant string.
pub const MUTATION_SEPARATOR: &str = ", ";

/// Default mutation budget for a single read.
pub const DEFAULT_MAX_MUTATIONS: usize = 10;
