//! Library leaves: one timepoint, one raw count source.
//!
//! A library turns its raw input into per-label count tables under
//! `raw/<label>/counts`. What the raw keys mean depends on the library
//! kind: sequencing reads called against a reference, barcode tags mapped
//! through a [`BarcodeIndex`], or pre-counted identifiers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::barcode::{open_with_gz, BarcodeIndex};
use crate::errors::{ConfigError, DataError};
use crate::store::{raw_counts_key, CountTable, MemoryStore, Table, TableStore};
use crate::variant::{protein_variant, CallOutcome, VariantCaller, WILD_TYPE_VARIANT};

use super::PipelineError;

/// Store key for a library's barcode-to-canonical-value map.
pub(super) const RAW_BARCODE_MAP_KEY: &str = "raw/barcodemap";

/// Where a library's raw (key, count) pairs come from.
#[derive(Debug)]
pub enum CountSource {
    /// In-memory pairs handed over by upstream read processing.
    Pairs(Vec<(String, u64)>),
    /// Two-column delimited file of `key<whitespace>count` lines.
    File(PathBuf),
}

/// What the raw keys of a library mean.
#[derive(Debug)]
pub enum LibraryKind {
    /// Raw keys are sequencing reads called directly against a reference.
    Basic {
        /// Caller configured with the reference and optional aligner.
        caller: VariantCaller,
    },
    /// Raw keys are barcode tags counted as-is.
    Barcode,
    /// Barcode tags mapped to variant DNA, then called against a reference.
    BarcodeVariant {
        /// Barcode-to-variant-DNA map shared across sibling libraries.
        map: Arc<BarcodeIndex>,
        /// Caller for the mapped variant DNA.
        caller: VariantCaller,
    },
    /// Barcode tags mapped to opaque identifiers.
    BarcodeId {
        /// Barcode-to-identifier map shared across sibling libraries.
        map: Arc<BarcodeIndex>,
    },
    /// Raw keys are identifiers counted as-is.
    IdOnly,
}

impl LibraryKind {
    /// Element labels this kind produces, in canonical order.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        match self {
            LibraryKind::Basic { caller } => {
                labels.push("variants");
                if caller.reference().is_coding() {
                    labels.push("synonymous");
                }
            }
            LibraryKind::Barcode => labels.push("barcodes"),
            LibraryKind::BarcodeVariant { caller, .. } => {
                labels.push("barcodes");
                labels.push("variants");
                if caller.reference().is_coding() {
                    labels.push("synonymous");
                }
            }
            LibraryKind::BarcodeId { .. } => {
                labels.push("barcodes");
                labels.push("identifiers");
            }
            LibraryKind::IdOnly => labels.push("identifiers"),
        }
        labels
    }

    /// Whether this kind calls variants against a reference.
    pub fn has_reference(&self) -> bool {
        matches!(
            self,
            LibraryKind::Basic { .. } | LibraryKind::BarcodeVariant { .. }
        )
    }

    /// Whether this kind calls against a protein-coding reference.
    pub fn is_coding(&self) -> bool {
        match self {
            LibraryKind::Basic { caller } | LibraryKind::BarcodeVariant { caller, .. } => {
                caller.reference().is_coding()
            }
            _ => false,
        }
    }

    /// Barcode map, for the kinds that carry one.
    pub fn barcode_map(&self) -> Option<&Arc<BarcodeIndex>> {
        match self {
            LibraryKind::BarcodeVariant { map, .. } | LibraryKind::BarcodeId { map } => Some(map),
            _ => None,
        }
    }
}

/// Per-reason tallies of rejected input, weighted by read count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionStats {
    total: u64,
    counted: u64,
    rejected: BTreeMap<String, u64>,
}

impl RejectionStats {
    fn observe(&mut self, count: u64) {
        self.total += count;
        self.counted += count;
    }

    fn reject(&mut self, reason: &DataError, count: u64) {
        self.total += count;
        *self.rejected.entry(reason.to_string()).or_insert(0) += count;
    }

    /// Move already-observed reads into the rejected tally, keeping the
    /// total unchanged. Used when counted input is dropped later, by the
    /// barcode map or a min-count filter.
    fn reclassify(&mut self, reason: &DataError, count: u64) {
        self.counted = self.counted.saturating_sub(count);
        *self.rejected.entry(reason.to_string()).or_insert(0) += count;
    }

    /// Total reads seen, counted or not.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Reads that produced a counted key.
    pub fn counted(&self) -> u64 {
        self.counted
    }

    /// Rejected read tallies keyed by rejection reason.
    pub fn rejected(&self) -> &BTreeMap<String, u64> {
        &self.rejected
    }
}

/// Leaf of the aggregation tree: one timepoint, one raw count source.
#[derive(Debug)]
pub struct Library {
    name: String,
    timepoint: u32,
    kind: LibraryKind,
    source: CountSource,
    barcode_min_count: u64,
    variant_min_count: u64,
    store: MemoryStore,
    rejections: RejectionStats,
}

impl Library {
    /// Create a library leaf.
    pub fn new(name: &str, timepoint: u32, kind: LibraryKind, source: CountSource) -> Self {
        Self {
            name: name.to_string(),
            timepoint,
            kind,
            source,
            barcode_min_count: 0,
            variant_min_count: 0,
            store: MemoryStore::new(),
            rejections: RejectionStats::default(),
        }
    }

    /// Drop barcodes observed fewer than `minimum` times before mapping.
    pub fn with_barcode_min_count(mut self, minimum: u64) -> Self {
        self.barcode_min_count = minimum;
        self
    }

    /// Drop variants observed fewer than `minimum` times.
    pub fn with_variant_min_count(mut self, minimum: u64) -> Self {
        self.variant_min_count = minimum;
        self
    }

    /// Node name, unique among siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timepoint this library was sequenced at.
    pub fn timepoint(&self) -> u32 {
        self.timepoint
    }

    /// Element labels this library produces.
    pub fn labels(&self) -> Vec<&'static str> {
        self.kind.labels()
    }

    /// Whether the library calls against a protein-coding reference.
    pub fn is_coding(&self) -> bool {
        self.kind.is_coding()
    }

    /// Whether the library calls variants against a reference at all.
    pub fn has_reference(&self) -> bool {
        self.kind.has_reference()
    }

    /// Barcode map shared with siblings, if this kind carries one.
    pub fn barcode_map(&self) -> Option<&Arc<BarcodeIndex>> {
        self.kind.barcode_map()
    }

    /// Read-only view of this library's store, for the parent's merge.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Rejection tallies from the last counting pass.
    pub fn rejections(&self) -> &RejectionStats {
        &self.rejections
    }

    /// Count the raw source into `raw/<label>/counts` tables.
    ///
    /// A no-op when every destination table already exists.
    pub fn calculate(&mut self) -> Result<(), PipelineError> {
        let mut expected: Vec<String> = self.labels().iter().map(|l| raw_counts_key(l)).collect();
        if self.kind.barcode_map().is_some() {
            expected.push(RAW_BARCODE_MAP_KEY.to_string());
        }
        if expected.iter().all(|key| self.store.contains(key)) {
            info!(library = %self.name, "counts already present, skipping");
            return Ok(());
        }

        let pairs = load_pairs(&self.source)?;
        debug!(library = %self.name, inputs = pairs.len(), "counting raw input");

        let mut tables: BTreeMap<&'static str, CountTable> = BTreeMap::new();
        let mut combined_map: Vec<(String, String)> = Vec::new();

        match &mut self.kind {
            LibraryKind::Basic { caller } => {
                let mut variants = CountTable::new();
                for (read, count) in &pairs {
                    match caller.call(read)? {
                        CallOutcome::WildType => {
                            self.rejections.observe(*count);
                            variants.add(WILD_TYPE_VARIANT, *count);
                        }
                        CallOutcome::Variant(key) => {
                            self.rejections.observe(*count);
                            variants.add(&key, *count);
                        }
                        CallOutcome::Rejected(reason) => {
                            self.rejections.reject(&reason, *count);
                        }
                    }
                }
                drop_below_min(&mut variants, self.variant_min_count, &mut self.rejections);
                if caller.reference().is_coding() {
                    tables.insert("synonymous", derive_synonymous(&variants));
                }
                tables.insert("variants", variants);
                caller.clear_cache();
            }
            LibraryKind::Barcode => {
                let mut barcodes = count_direct(&pairs, &mut self.rejections);
                drop_below_min(&mut barcodes, self.barcode_min_count, &mut self.rejections);
                tables.insert("barcodes", barcodes);
            }
            LibraryKind::BarcodeVariant { map, caller } => {
                let mut barcodes = count_direct(&pairs, &mut self.rejections);
                drop_below_min(&mut barcodes, self.barcode_min_count, &mut self.rejections);

                let mut variants = CountTable::new();
                let mut canonical: BTreeMap<String, Option<String>> = BTreeMap::new();
                for (barcode, count) in barcodes.iter() {
                    let Some(dna) = map.get(barcode) else {
                        self.rejections.reclassify(&DataError::UnmappedBarcode, count);
                        continue;
                    };
                    let key = match canonical.get(dna) {
                        Some(cached) => cached.clone(),
                        None => {
                            let key = match caller.call(dna)? {
                                CallOutcome::WildType => Some(WILD_TYPE_VARIANT.to_string()),
                                CallOutcome::Variant(key) => Some(key),
                                CallOutcome::Rejected(_) => None,
                            };
                            canonical.insert(dna.to_string(), key.clone());
                            key
                        }
                    };
                    match key {
                        Some(key) => {
                            variants.add(&key, count);
                            combined_map.push((barcode.to_string(), key));
                        }
                        None => {
                            // The mapped variant DNA itself failed calling.
                            self.rejections.reclassify(&DataError::UnmappedBarcode, count);
                        }
                    }
                }
                drop_below_min(&mut variants, self.variant_min_count, &mut self.rejections);
                if caller.reference().is_coding() {
                    tables.insert("synonymous", derive_synonymous(&variants));
                }
                tables.insert("variants", variants);
                tables.insert("barcodes", barcodes);
                caller.clear_cache();
            }
            LibraryKind::BarcodeId { map } => {
                let mut barcodes = count_direct(&pairs, &mut self.rejections);
                drop_below_min(&mut barcodes, self.barcode_min_count, &mut self.rejections);

                let mut identifiers = CountTable::new();
                for (barcode, count) in barcodes.iter() {
                    let Some(identifier) = map.get(barcode) else {
                        self.rejections.reclassify(&DataError::UnmappedBarcode, count);
                        continue;
                    };
                    identifiers.add(identifier, count);
                    combined_map.push((barcode.to_string(), identifier.to_string()));
                }
                tables.insert("identifiers", identifiers);
                tables.insert("barcodes", barcodes);
            }
            LibraryKind::IdOnly => {
                tables.insert("identifiers", count_direct(&pairs, &mut self.rejections));
            }
        }

        for (label, table) in tables {
            let key = raw_counts_key(label);
            if !self.store.contains(&key) {
                info!(library = %self.name, label, rows = table.len(), "stored raw counts");
                self.store.put(&key, Table::Counts(table));
                self.store.set_metadata(&key, self.table_metadata());
            }
        }
        if self.kind.barcode_map().is_some() && !self.store.contains(RAW_BARCODE_MAP_KEY) {
            self.store
                .put(RAW_BARCODE_MAP_KEY, Table::BarcodeMap(combined_map));
            self.store
                .set_metadata(RAW_BARCODE_MAP_KEY, self.table_metadata());
        }
        info!(
            library = %self.name,
            total = self.rejections.total(),
            counted = self.rejections.counted(),
            rejected = ?self.rejections.rejected(),
            "counting pass complete"
        );
        Ok(())
    }

    /// Metadata recorded alongside every table this library stores.
    fn table_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("node".to_string(), self.name.clone()),
            ("timepoint".to_string(), self.timepoint.to_string()),
        ])
    }
}

/// Apply a min-count filter, reclassifying the dropped reads as rejected.
fn drop_below_min(table: &mut CountTable, minimum: u64, stats: &mut RejectionStats) {
    let dropped = table.retain_min_count(minimum);
    if dropped > 0 {
        stats.reclassify(&DataError::BelowMinCount { minimum }, dropped);
    }
}

/// Count keys as-is, recording every pair as accepted.
fn count_direct(pairs: &[(String, u64)], stats: &mut RejectionStats) -> CountTable {
    let mut table = CountTable::new();
    for (key, count) in pairs {
        stats.observe(*count);
        table.add(key, *count);
    }
    table
}

/// Collapse a variant count table to protein-level changes.
fn derive_synonymous(variants: &CountTable) -> CountTable {
    let mut synonymous = CountTable::new();
    for (key, count) in variants.iter() {
        match protein_variant(key) {
            Ok(collapsed) => synonymous.add(&collapsed, count),
            Err(err) => {
                warn!(variant = key, %err, "skipping variant in synonymous collapse");
            }
        }
    }
    synonymous
}

/// Materialize (key, count) pairs from a count source.
fn load_pairs(source: &CountSource) -> Result<Vec<(String, u64)>, ConfigError> {
    match source {
        CountSource::Pairs(pairs) => Ok(pairs.clone()),
        CountSource::File(path) => {
            use std::io::BufRead;

            let reader = open_with_gz(path).map_err(|source| ConfigError::CountsIo {
                path: path.clone(),
                source,
            })?;
            let mut pairs = Vec::new();
            for (idx, line) in reader.lines().enumerate() {
                let line = line.map_err(|source| ConfigError::CountsIo {
                    path: path.clone(),
                    source,
                })?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                let mut fields = trimmed.split_whitespace();
                let parsed = match (fields.next(), fields.next(), fields.next()) {
                    (Some(key), Some(count), None) => {
                        count.parse::<u64>().ok().map(|count| (key, count))
                    }
                    _ => None,
                };
                match parsed {
                    Some((key, count)) => pairs.push((key.to_string(), count)),
                    None => {
                        return Err(ConfigError::CountsFormat {
                            path: path.clone(),
                            line: idx + 1,
                        })
                    }
                }
            }
            Ok(pairs)
        }
    }
}
