//! JSON configuration documents and tree construction.
//!
//! The document layout mirrors the tree: an experiment of conditions of
//! selections of libraries. A library's kind is never named explicitly;
//! it is classified from which sections (`variants`, `barcodes`,
//! `identifiers`) it declares.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::barcode::{BarcodeIndex, ValueMode};
use crate::errors::ConfigError;
use crate::score::{CountsOnlyScorer, RatioScorer, Scorer};
use crate::sequence::{Aligner, ReferenceSequence};
use crate::stats::DEFAULT_MINIMUM_COMPONENTS;
use crate::tree::{Condition, CountSource, Experiment, Library, LibraryKind, Selection};
use crate::variant::{VariantCaller, DEFAULT_MAX_MUTATIONS};

/// Top-level experiment document.
#[derive(Debug, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment name.
    pub name: String,
    /// Scoring method applied to every selection.
    #[serde(default)]
    pub scorer: ScorerChoice,
    /// Child conditions.
    pub conditions: Vec<ConditionConfig>,
}

/// One experimental condition.
#[derive(Debug, Deserialize)]
pub struct ConditionConfig {
    /// Condition name.
    pub name: String,
    /// Replicate selections.
    pub selections: Vec<SelectionConfig>,
}

/// One time-course selection.
#[derive(Debug, Deserialize)]
pub struct SelectionConfig {
    /// Selection name.
    pub name: String,
    /// Child libraries.
    pub libraries: Vec<LibraryConfig>,
    /// Merge batch size override.
    #[serde(rename = "chunk size")]
    pub chunk_size: Option<usize>,
    /// Whether to run component-vs-parent outlier detection.
    #[serde(rename = "component outliers", default)]
    pub component_outliers: bool,
    /// Minimum components per parent for outlier statistics.
    #[serde(rename = "minimum components")]
    pub minimum_components: Option<usize>,
}

/// One sequencing library.
#[derive(Debug, Deserialize)]
pub struct LibraryConfig {
    /// Library name.
    pub name: String,
    /// Timepoint this library was sequenced at.
    pub timepoint: u32,
    /// Pre-counted two-column input file.
    #[serde(rename = "counts file")]
    pub counts_file: PathBuf,
    /// Variant-calling section.
    pub variants: Option<VariantsConfig>,
    /// Barcode section.
    pub barcodes: Option<BarcodesConfig>,
    /// Identifier section.
    pub identifiers: Option<IdentifiersConfig>,
}

/// Variant-calling settings.
#[derive(Debug, Deserialize)]
pub struct VariantsConfig {
    /// Wild-type reference.
    #[serde(rename = "wild type")]
    pub wild_type: WildTypeConfig,
    /// Whether to configure the alignment fallback.
    #[serde(rename = "use aligner", default)]
    pub use_aligner: bool,
    /// Mutation budget per read.
    #[serde(rename = "max mutations")]
    pub max_mutations: Option<usize>,
    /// Minimum variant count to keep.
    #[serde(rename = "min count", default)]
    pub min_count: u64,
}

/// Wild-type reference settings.
#[derive(Debug, Deserialize)]
pub struct WildTypeConfig {
    /// Reference DNA over `ACGT`.
    pub sequence: String,
    /// Whether the reference is protein coding.
    #[serde(default)]
    pub coding: bool,
    /// Offset added to reported nucleotide positions.
    #[serde(rename = "reference offset", default)]
    pub reference_offset: usize,
}

/// Barcode settings.
#[derive(Debug, Deserialize)]
pub struct BarcodesConfig {
    /// Barcode map file; absent for bare barcode counting.
    #[serde(rename = "map file")]
    pub map_file: Option<PathBuf>,
    /// Minimum barcode count to keep before mapping.
    #[serde(rename = "min count", default)]
    pub min_count: u64,
}

/// Identifier settings. Present-but-empty marks an identifier library.
#[derive(Debug, Default, Deserialize)]
pub struct IdentifiersConfig {}

/// Scoring method selector.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerChoice {
    /// Log-ratio enrichment of last timepoint over baseline.
    #[default]
    Ratios,
    /// Stop after producing canonical count tables.
    CountsOnly,
}

impl ScorerChoice {
    fn build(self) -> Box<dyn Scorer> {
        match self {
            ScorerChoice::Ratios => Box::new(RatioScorer),
            ScorerChoice::CountsOnly => Box::new(CountsOnlyScorer),
        }
    }
}

/// Read and deserialize an experiment document.
pub fn load_config(path: &Path) -> Result<ExperimentConfig, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_reader(BufReader::new(file))?;
    Ok(config)
}

/// Build the aggregation tree from a parsed document.
pub fn build_experiment(config: &ExperimentConfig) -> Result<Experiment, ConfigError> {
    let mut maps = MapCache::default();
    let mut conditions = Vec::with_capacity(config.conditions.len());
    for condition in &config.conditions {
        let mut selections = Vec::with_capacity(condition.selections.len());
        for selection in &condition.selections {
            selections.push(build_selection(selection, config.scorer, &mut maps)?);
        }
        conditions.push(Condition::new(&condition.name, selections)?);
    }
    info!(experiment = %config.name, "configured experiment tree");
    Experiment::new(&config.name, conditions)
}

fn build_selection(
    config: &SelectionConfig,
    scorer: ScorerChoice,
    maps: &mut MapCache,
) -> Result<Selection, ConfigError> {
    let mut libraries = Vec::with_capacity(config.libraries.len());
    for library in &config.libraries {
        libraries.push(build_library(library, maps)?);
    }
    let mut selection = Selection::new(&config.name, libraries, scorer.build())?;
    if let Some(chunk_size) = config.chunk_size {
        selection = selection.with_chunk_size(chunk_size);
    }
    if config.component_outliers {
        selection = selection.with_component_outliers(
            config.minimum_components.unwrap_or(DEFAULT_MINIMUM_COMPONENTS),
        );
    }
    Ok(selection)
}

fn build_library(config: &LibraryConfig, maps: &mut MapCache) -> Result<Library, ConfigError> {
    let kind = classify_library(config, maps)?;
    let mut library = Library::new(
        &config.name,
        config.timepoint,
        kind,
        CountSource::File(config.counts_file.clone()),
    );
    if let Some(barcodes) = &config.barcodes {
        library = library.with_barcode_min_count(barcodes.min_count);
    }
    if let Some(variants) = &config.variants {
        library = library.with_variant_min_count(variants.min_count);
    }
    Ok(library)
}

/// Decide a library's kind from which sections its configuration declares.
pub fn classify_library(
    config: &LibraryConfig,
    maps: &mut MapCache,
) -> Result<LibraryKind, ConfigError> {
    let map_file = config.barcodes.as_ref().and_then(|b| b.map_file.as_ref());
    match (&config.variants, &config.barcodes, &config.identifiers) {
        (Some(variants), Some(_), _) => {
            let Some(path) = map_file else {
                return Err(ConfigError::UnclassifiableLibrary {
                    name: config.name.clone(),
                });
            };
            Ok(LibraryKind::BarcodeVariant {
                map: maps.load(path, ValueMode::VariantDna)?,
                caller: build_caller(&config.name, variants)?,
            })
        }
        (None, Some(_), Some(_)) => {
            let Some(path) = map_file else {
                return Err(ConfigError::UnclassifiableLibrary {
                    name: config.name.clone(),
                });
            };
            Ok(LibraryKind::BarcodeId {
                map: maps.load(path, ValueMode::Identifier)?,
            })
        }
        (None, Some(_), None) => Ok(LibraryKind::Barcode),
        (Some(variants), None, _) => Ok(LibraryKind::Basic {
            caller: build_caller(&config.name, variants)?,
        }),
        (None, None, Some(_)) => Ok(LibraryKind::IdOnly),
        (None, None, None) => Err(ConfigError::UnclassifiableLibrary {
            name: config.name.clone(),
        }),
    }
}

fn build_caller(name: &str, config: &VariantsConfig) -> Result<VariantCaller, ConfigError> {
    let reference = Arc::new(ReferenceSequence::new(
        name,
        &config.wild_type.sequence,
        config.wild_type.coding,
        config.wild_type.reference_offset,
    )?);
    let aligner = config.use_aligner.then(Aligner::with_default_matrix);
    Ok(VariantCaller::new(
        reference,
        aligner,
        config.max_mutations.unwrap_or(DEFAULT_MAX_MUTATIONS),
    ))
}

/// Cache of loaded barcode maps keyed by path, so sibling libraries
/// declaring the same source share one parsed index.
#[derive(Debug, Default)]
pub struct MapCache {
    loaded: BTreeMap<(PathBuf, ValueMode), Arc<BarcodeIndex>>,
}

impl MapCache {
    fn load(&mut self, path: &Path, mode: ValueMode) -> Result<Arc<BarcodeIndex>, ConfigError> {
        if let Some(index) = self.loaded.get(&(path.to_path_buf(), mode)) {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(BarcodeIndex::load(path, mode)?);
        self.loaded
            .insert((path.to_path_buf(), mode), Arc::clone(&index));
        Ok(index)
    }
}
