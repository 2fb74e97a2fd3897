//! Selection nodes: a time course of replicate libraries.
//!
//! A selection owns the merge, filter, consistency-check, barcode-map
//! combination, scoring, and outlier stages, in that order. Each stage
//! writes one destination table and skips itself when that table already
//! exists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{info, warn};

use crate::barcode::ValueMode;
use crate::errors::{ConfigError, ConsistencyError};
use crate::score::{Scorer, SelectionData};
use crate::stats::component_outliers;
use crate::store::{
    counts_key, outliers_key, raw_counts_key, require_scores, require_wide, scores_key,
    unfiltered_counts_key, MemoryStore, Table, TableStore, WideTable, BARCODE_MAP_KEY,
};
use crate::variant::{has_unresolvable, protein_variant, WILD_TYPE_VARIANT};

use super::library::RAW_BARCODE_MAP_KEY;
use super::{Library, PipelineError, DEFAULT_CHUNK_SIZE, ELEMENT_LABELS};

/// Time-course node over replicate [`Library`] children.
pub struct Selection {
    name: String,
    libraries: BTreeMap<u32, Vec<Library>>,
    store: MemoryStore,
    scorer: Box<dyn Scorer>,
    chunk_size: usize,
    component_outliers: bool,
    minimum_components: usize,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("name", &self.name)
            .field("timepoints", &self.timepoints())
            .field("scorer", &self.scorer.name())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl Selection {
    /// Create a selection over its child libraries.
    ///
    /// Timepoint rules are enforced here, before any computation: a
    /// timepoint 0 baseline is mandatory, at least two distinct timepoints
    /// are required, and the scorer's own minimum must be met.
    pub fn new(
        name: &str,
        children: Vec<Library>,
        scorer: Box<dyn Scorer>,
    ) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::NoLibraries {
                name: name.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for child in &children {
            if !seen.insert(child.name().to_string()) {
                return Err(ConfigError::DuplicateChildName {
                    name: name.to_string(),
                    child: child.name().to_string(),
                });
            }
        }

        let mut libraries: BTreeMap<u32, Vec<Library>> = BTreeMap::new();
        for child in children {
            libraries.entry(child.timepoint()).or_default().push(child);
        }
        if !libraries.contains_key(&0) {
            return Err(ConfigError::MissingBaseline {
                name: name.to_string(),
            });
        }
        if libraries.len() < 2 {
            return Err(ConfigError::TooFewTimepoints {
                name: name.to_string(),
            });
        }
        if libraries.len() < scorer.minimum_timepoints() {
            return Err(ConfigError::InsufficientTimepoints {
                name: name.to_string(),
                scorer: scorer.name().to_string(),
                required: scorer.minimum_timepoints(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            libraries,
            store: MemoryStore::new(),
            scorer,
            chunk_size: DEFAULT_CHUNK_SIZE,
            component_outliers: false,
            minimum_components: crate::stats::DEFAULT_MINIMUM_COMPONENTS,
        })
    }

    /// Override the merge batch size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Enable component-vs-parent outlier detection.
    pub fn with_component_outliers(mut self, minimum_components: usize) -> Self {
        self.component_outliers = true;
        self.minimum_components = minimum_components;
        self
    }

    /// Node name, unique among siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered, ascending timepoints.
    pub fn timepoints(&self) -> Vec<u32> {
        self.libraries.keys().copied().collect()
    }

    /// Read-only view of this selection's store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Child libraries, grouped by timepoint.
    pub fn libraries(&self) -> &BTreeMap<u32, Vec<Library>> {
        &self.libraries
    }

    /// Element labels present among children, in canonical order.
    ///
    /// The synonymous label only survives when every child is coding.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut present = BTreeSet::new();
        for lib in self.children() {
            present.extend(lib.labels());
        }
        if !self.is_coding() {
            present.remove("synonymous");
        }
        ELEMENT_LABELS
            .iter()
            .copied()
            .filter(|l| present.contains(l))
            .collect()
    }

    /// Whether every child calls against a protein-coding reference.
    pub fn is_coding(&self) -> bool {
        self.children().all(Library::is_coding)
    }

    /// Whether every child has a wild-type reference.
    pub fn has_reference(&self) -> bool {
        self.children().all(Library::has_reference)
    }

    fn children(&self) -> impl Iterator<Item = &Library> {
        self.libraries.values().flatten()
    }

    /// Run the full pipeline: count children, merge, filter, check,
    /// combine barcode maps, score, and detect outliers.
    pub fn calculate(&mut self) -> Result<(), PipelineError> {
        let labels = self.labels();
        info!(selection = %self.name, ?labels, "calculating selection");

        for libs in self.libraries.values_mut() {
            for lib in libs {
                lib.calculate()?;
            }
        }

        for label in &labels {
            self.merge_counts_unfiltered(label)?;
            self.filter_counts(label)?;
        }

        if self.children().any(|lib| lib.barcode_map().is_some()) {
            self.combine_barcode_maps();
        }

        for label in &labels {
            require_wide(&self.store, &self.name, &counts_key(label))?;
        }
        self.check_not_only_wild_type(&labels)?;

        self.score(&labels)?;

        if self.component_outliers && self.scorer.supports_outliers() {
            if self.barcode_parent_label().is_some() {
                self.calc_outliers("barcodes")?;
            }
            if self.is_coding() {
                self.calc_outliers("variants")?;
            }
        }
        Ok(())
    }

    /// Union the children's raw counts for `label` into one wide table with
    /// a column per timepoint.
    ///
    /// Libraries at the same timepoint are combined by summing. Keys a
    /// timepoint never observed stay explicitly unobserved, distinct from
    /// zero, until filtering.
    fn merge_counts_unfiltered(&mut self, label: &str) -> Result<(), PipelineError> {
        let dest = unfiltered_counts_key(label);
        if self.store.contains(&dest) {
            info!(selection = %self.name, label, "unfiltered counts already present, skipping");
            return Ok(());
        }

        let raw_key = raw_counts_key(label);
        let timepoints = self.timepoints();

        let mut union: BTreeSet<String> = BTreeSet::new();
        for lib in self.children() {
            if let Some(Table::Counts(table)) = lib.store().get(&raw_key) {
                union.extend(table.keys().map(str::to_string));
            }
        }
        let keys: Vec<String> = union.into_iter().collect();
        info!(
            selection = %self.name,
            label,
            keys = keys.len(),
            "created shared key set for merge"
        );

        let mut wide = WideTable::new(timepoints.clone());
        for chunk in keys.chunks(self.chunk_size) {
            for (column, tp) in timepoints.iter().enumerate() {
                let tables: Vec<_> = self.libraries[tp]
                    .iter()
                    .filter_map(|lib| match lib.store().get(&raw_key) {
                        Some(Table::Counts(table)) => Some(table),
                        _ => None,
                    })
                    .collect();
                for key in chunk {
                    let mut sum: Option<u64> = None;
                    for table in &tables {
                        if let Some(count) = table.get(key) {
                            sum = Some(sum.unwrap_or(0) + count);
                        }
                    }
                    if let Some(sum) = sum {
                        wide.set(key, column, sum);
                    }
                }
            }
        }

        self.store.put(&dest, Table::Wide(wide));
        self.store.set_metadata(&dest, self.table_metadata());
        Ok(())
    }

    /// Keep complete cases only: rows observed at every timepoint.
    ///
    /// One rule for every label; barcode-derived labels are filtered from
    /// their own merged table, the same as everything else.
    fn filter_counts(&mut self, label: &str) -> Result<(), PipelineError> {
        let dest = counts_key(label);
        if self.store.contains(&dest) {
            info!(selection = %self.name, label, "filtered counts already present, skipping");
            return Ok(());
        }
        let unfiltered = require_wide(&self.store, &self.name, &unfiltered_counts_key(label))?;
        let filtered = unfiltered.complete_cases();
        info!(
            selection = %self.name,
            label,
            kept = filtered.len(),
            dropped = unfiltered.len() - filtered.len(),
            "filtered to complete cases"
        );
        self.store.put(&dest, Table::Wide(filtered));
        self.store.set_metadata(&dest, self.table_metadata());
        Ok(())
    }

    /// Union the children's barcode maps, sorted by mapped value.
    ///
    /// Where children disagree because one side is missing a barcode, the
    /// present value is kept. When two children map the same barcode to
    /// different values, the earliest timepoint's value wins; children are
    /// visited in ascending timepoint order.
    fn combine_barcode_maps(&mut self) {
        if self.store.contains(BARCODE_MAP_KEY) {
            return;
        }
        let mut combined: BTreeMap<String, String> = BTreeMap::new();
        for lib in self.children() {
            if let Some(Table::BarcodeMap(entries)) = lib.store().get(RAW_BARCODE_MAP_KEY) {
                for (barcode, value) in entries {
                    combined.entry(barcode.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        let mut entries: Vec<(String, String)> = combined.into_iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        info!(selection = %self.name, barcodes = entries.len(), "combined barcode maps");
        self.store.put(BARCODE_MAP_KEY, Table::BarcodeMap(entries));
        self.store
            .set_metadata(BARCODE_MAP_KEY, self.table_metadata());
    }

    /// Metadata recorded alongside every table this selection stores.
    fn table_metadata(&self) -> BTreeMap<String, String> {
        let timepoints: Vec<String> = self.timepoints().iter().map(u32::to_string).collect();
        BTreeMap::from([
            ("node".to_string(), self.name.clone()),
            ("timepoints".to_string(), timepoints.join(",")),
        ])
    }

    /// Strict cross-timepoint agreement: every child's raw key set for
    /// every label must be identical.
    ///
    /// Not part of `calculate()`; the merge stage tolerates differing key
    /// sets by marking the gaps unobserved. Callers wanting a hard
    /// guarantee can run this before calculating.
    pub fn verify_timepoint_agreement(&self) -> Result<(), ConsistencyError> {
        for label in self.labels() {
            let raw_key = raw_counts_key(label);
            let mut first: Option<BTreeSet<&str>> = None;
            for lib in self.children() {
                let Some(Table::Counts(table)) = lib.store().get(&raw_key) else {
                    continue;
                };
                let keys: BTreeSet<&str> = table.keys().collect();
                match &first {
                    None => first = Some(keys),
                    Some(expected) if *expected != keys => {
                        return Err(ConsistencyError::TimepointsDisagree {
                            name: self.name.clone(),
                            label: label.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// No label's canonical table may consist solely of the wild type.
    fn check_not_only_wild_type(&self, labels: &[&'static str]) -> Result<(), ConsistencyError> {
        for label in labels {
            let table = require_wide(&self.store, &self.name, &counts_key(label))?;
            let only_wt = table.keys().all(|key| key == WILD_TYPE_VARIANT);
            if only_wt {
                return Err(ConsistencyError::OnlyWildType {
                    name: self.name.clone(),
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run the injected scorer over every label's canonical table.
    fn score(&mut self, labels: &[&'static str]) -> Result<(), PipelineError> {
        let mut computed: Vec<(&'static str, crate::store::ScoreTable)> = Vec::new();
        {
            let mut tables: BTreeMap<String, &WideTable> = BTreeMap::new();
            for label in labels {
                if let Some(Table::Wide(table)) = self.store.get(&counts_key(label)) {
                    tables.insert(label.to_string(), table);
                }
            }
            let view = SelectionView {
                timepoints: self.timepoints(),
                tables,
                is_coding: self.is_coding(),
                has_reference: self.has_reference(),
                chunk_size: self.chunk_size,
            };
            for label in labels {
                if self.store.contains(&scores_key(label)) {
                    info!(selection = %self.name, label, "scores already present, skipping");
                    continue;
                }
                let scores = self.scorer.score(&view, label)?;
                computed.push((*label, scores));
            }
        }
        for (label, scores) in computed {
            if scores.is_empty() {
                continue;
            }
            info!(
                selection = %self.name,
                label,
                scorer = self.scorer.name(),
                rows = scores.len(),
                "stored scores"
            );
            let key = scores_key(label);
            self.store.put(&key, Table::Scores(scores));
            self.store.set_metadata(&key, self.table_metadata());
        }
        Ok(())
    }

    /// The parent label barcode scores collapse into, if any child maps
    /// barcodes at all.
    fn barcode_parent_label(&self) -> Option<&'static str> {
        self.children()
            .filter_map(|lib| lib.barcode_map())
            .map(|map| match map.mode() {
                ValueMode::VariantDna => "variants",
                ValueMode::Identifier => "identifiers",
            })
            .next()
    }

    /// Component-vs-parent outlier statistics for one label.
    fn calc_outliers(&mut self, label: &str) -> Result<(), PipelineError> {
        let dest = outliers_key(label);
        if self.store.contains(&dest) {
            return Ok(());
        }

        let (parent_label, mapping) = match label {
            "variants" => {
                let table = require_wide(&self.store, &self.name, &counts_key("variants"))?;
                ("synonymous", synonymous_parent_mapping(table.keys()))
            }
            "barcodes" => {
                let parent_label = self.barcode_parent_label().ok_or_else(|| {
                    ConsistencyError::MissingTable {
                        name: self.name.clone(),
                        key: BARCODE_MAP_KEY.to_string(),
                    }
                })?;
                let mapping = match self.store.get(BARCODE_MAP_KEY) {
                    Some(Table::BarcodeMap(entries)) => entries.iter().cloned().collect(),
                    _ => {
                        return Err(ConsistencyError::MissingTable {
                            name: self.name.clone(),
                            key: BARCODE_MAP_KEY.to_string(),
                        }
                        .into())
                    }
                };
                (parent_label, mapping)
            }
            other => {
                return Err(ConsistencyError::MissingTable {
                    name: self.name.clone(),
                    key: outliers_key(other),
                }
                .into())
            }
        };

        let outliers = {
            let parents = require_scores(&self.store, &self.name, &scores_key(parent_label))?;
            let components = require_scores(&self.store, &self.name, &scores_key(label))?;
            component_outliers(parents, components, &mapping, self.minimum_components)
        };
        info!(
            selection = %self.name,
            label,
            parent = parent_label,
            rows = outliers.len(),
            "stored outlier statistics"
        );
        self.store.put(&dest, Table::Outliers(outliers));
        self.store.set_metadata(&dest, self.table_metadata());
        Ok(())
    }
}

/// Map coding variant keys to their protein-level parents.
///
/// Keys whose protein change is unresolvable (`???` placeholders from `N`
/// bases or partial codons) are skipped; their parents carry no usable
/// signal.
fn synonymous_parent_mapping<'a>(
    keys: impl Iterator<Item = &'a str>,
) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    for key in keys {
        match protein_variant(key) {
            Ok(parent) if has_unresolvable(&parent) => {
                warn!(variant = key, "skipping unresolvable protein change in outlier mapping");
            }
            Ok(parent) => {
                mapping.insert(key.to_string(), parent);
            }
            Err(err) => {
                warn!(variant = key, %err, "skipping variant in outlier mapping");
            }
        }
    }
    mapping
}

/// Narrow capability surface handed to the scorer.
struct SelectionView<'a> {
    timepoints: Vec<u32>,
    tables: BTreeMap<String, &'a WideTable>,
    is_coding: bool,
    has_reference: bool,
    chunk_size: usize,
}

impl SelectionData for SelectionView<'_> {
    fn timepoints(&self) -> &[u32] {
        &self.timepoints
    }

    fn canonical_table(&self, label: &str) -> Option<&WideTable> {
        self.tables.get(label).copied()
    }

    fn is_coding(&self) -> bool {
        self.is_coding
    }

    fn has_reference(&self) -> bool {
        self.has_reference
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{CountsOnlyScorer, RatioScorer};
    use crate::tree::{CountSource, LibraryKind};

    fn id_library(name: &str, timepoint: u32, pairs: &[(&str, u64)]) -> Library {
        let pairs = pairs.iter().map(|(k, c)| (k.to_string(), *c)).collect();
        Library::new(
            name,
            timepoint,
            LibraryKind::IdOnly,
            CountSource::Pairs(pairs),
        )
    }

    #[test]
    fn missing_baseline_is_a_config_error() {
        let libs = vec![id_library("a", 1, &[]), id_library("b", 2, &[])];
        let err = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseline { .. }));
    }

    #[test]
    fn single_timepoint_is_a_config_error() {
        let libs = vec![id_library("a", 0, &[])];
        let err = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewTimepoints { .. }));
    }

    #[test]
    fn duplicate_child_names_are_a_config_error() {
        let libs = vec![id_library("a", 0, &[]), id_library("a", 1, &[])];
        let err = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChildName { .. }));
    }

    #[test]
    fn no_children_is_a_config_error() {
        let err = Selection::new("sel", Vec::new(), Box::new(RatioScorer)).unwrap_err();
        assert!(matches!(err, ConfigError::NoLibraries { .. }));
    }

    #[test]
    fn merge_sums_within_a_timepoint_and_unions_across() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 5), ("id_2", 1)]),
            id_library("t1a", 1, &[("id_1", 3), ("id_3", 2)]),
            id_library("t1b", 1, &[("id_1", 4)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        sel.calculate().unwrap();

        let table = match sel.store().get("main/identifiers/counts_unfiltered").unwrap() {
            Table::Wide(table) => table,
            other => panic!("unexpected table {other:?}"),
        };
        // Shared keys sum within timepoint 1; unseen cells stay unobserved.
        assert_eq!(table.get("id_1").unwrap(), &[Some(5), Some(7)]);
        assert_eq!(table.get("id_2").unwrap(), &[Some(1), None]);
        assert_eq!(table.get("id_3").unwrap(), &[None, Some(2)]);
    }

    #[test]
    fn filtering_keeps_complete_cases_only() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 5), ("id_2", 1)]),
            id_library("t1", 1, &[("id_2", 2)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        sel.calculate().unwrap();

        let table = match sel.store().get("main/identifiers/counts").unwrap() {
            Table::Wide(table) => table,
            other => panic!("unexpected table {other:?}"),
        };
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("id_2").unwrap(), &[Some(1), Some(2)]);
    }

    #[test]
    fn recalculate_leaves_tables_unchanged() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 5)]),
            id_library("t1", 1, &[("id_1", 2)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap();
        sel.calculate().unwrap();
        let before = sel.store().clone();
        sel.calculate().unwrap();
        assert_eq!(before.keys(), sel.store().keys());
        for key in before.keys() {
            assert_eq!(before.get(&key), sel.store().get(&key));
        }
    }

    #[test]
    fn ratio_scores_are_stored() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 10), ("id_2", 10)]),
            id_library("t1", 1, &[("id_1", 40), ("id_2", 5)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap();
        sel.calculate().unwrap();
        let table = match sel.store().get("main/identifiers/scores").unwrap() {
            Table::Scores(table) => table,
            other => panic!("unexpected table {other:?}"),
        };
        assert!(table.get("id_1").unwrap().score > 0.0);
        assert!(table.get("id_2").unwrap().score < 0.0);
    }

    #[test]
    fn empty_canonical_table_is_fatal() {
        // Disjoint key sets leave nothing after filtering.
        let libs = vec![
            id_library("t0", 0, &[("id_1", 5)]),
            id_library("t1", 1, &[("id_2", 2)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        let err = sel.calculate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Consistency(ConsistencyError::EmptyTable { .. })
        ));
    }

    #[test]
    fn only_wild_type_is_fatal() {
        let libs = vec![
            id_library("t0", 0, &[("_wt", 5)]),
            id_library("t1", 1, &[("_wt", 2)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        let err = sel.calculate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Consistency(ConsistencyError::OnlyWildType { .. })
        ));
    }

    #[test]
    fn stored_tables_carry_node_metadata() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 10), ("id_2", 10)]),
            id_library("t1", 1, &[("id_1", 40), ("id_2", 5)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(RatioScorer)).unwrap();
        sel.calculate().unwrap();
        let meta = sel.store().get_metadata("main/identifiers/counts").unwrap();
        assert_eq!(meta.get("node").map(String::as_str), Some("sel"));
        assert_eq!(meta.get("timepoints").map(String::as_str), Some("0,1"));
        assert!(sel
            .store()
            .get_metadata("main/identifiers/scores")
            .is_some());
    }

    #[test]
    fn conflicting_barcode_maps_keep_the_earliest_value() {
        use std::io::Write;
        use std::sync::Arc;

        use crate::barcode::BarcodeIndex;

        let mut map0 = tempfile::NamedTempFile::new().unwrap();
        writeln!(map0, "AAAA\tid_1\nCCCC\tid_2").unwrap();
        let mut map1 = tempfile::NamedTempFile::new().unwrap();
        writeln!(map1, "AAAA\tid_9\nCCCC\tid_2").unwrap();

        let lib = |name: &str, tp: u32, path: &std::path::Path| {
            let map = Arc::new(BarcodeIndex::load(path, ValueMode::Identifier).unwrap());
            Library::new(
                name,
                tp,
                LibraryKind::BarcodeId { map },
                CountSource::Pairs(vec![("AAAA".to_string(), 5), ("CCCC".to_string(), 5)]),
            )
        };
        let libs = vec![lib("t0", 0, map0.path()), lib("t1", 1, map1.path())];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        sel.calculate().unwrap();

        let entries = match sel.store().get(BARCODE_MAP_KEY).unwrap() {
            Table::BarcodeMap(entries) => entries,
            other => panic!("unexpected table {other:?}"),
        };
        assert!(entries.contains(&("AAAA".to_string(), "id_1".to_string())));
        assert!(!entries.iter().any(|(_, value)| value == "id_9"));
    }

    #[test]
    fn outlier_mapping_skips_unresolvable_protein_changes() {
        let keys = ["c.6A>C (p.Lys2Asn)", "c.6A>T (p.Lys2???)", "n.6A>C"];
        let mapping = synonymous_parent_mapping(keys.into_iter());
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.get("c.6A>C (p.Lys2Asn)").map(String::as_str),
            Some("p.Lys2Asn")
        );
    }

    #[test]
    fn timepoint_agreement_check_flags_differing_key_sets() {
        let libs = vec![
            id_library("t0", 0, &[("id_1", 5)]),
            id_library("t1", 1, &[("id_1", 3), ("id_2", 2)]),
        ];
        let mut sel = Selection::new("sel", libs, Box::new(CountsOnlyScorer)).unwrap();
        sel.calculate().unwrap();
        let err = sel.verify_timepoint_agreement().unwrap_err();
        assert!(matches!(err, ConsistencyError::TimepointsDisagree { .. }));
    }
}
