//! Keyed table storage shared by every node of the analysis tree.
//!
//! Keys follow a two-level scheme: `raw/<label>/counts` for single-library
//! single-pass counts, and `main/...` for merged, filtered, and derived
//! tables (`main/<label>/counts_unfiltered`, `main/<label>/counts`,
//! `main/barcodemap`, `main/<label>/scores`, `main/<label>/outliers`).
//! Computation steps check for their output key before working, so rerunning
//! a node against a populated store is a no-op.

mod table;

use std::collections::BTreeMap;

pub use table::{CountTable, OutlierRow, OutlierTable, ScoreRow, ScoreTable, WideTable};

use crate::errors::ConsistencyError;

/// A stored table of any shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// Single-pass counts.
    Counts(CountTable),
    /// Multi-timepoint counts.
    Wide(WideTable),
    /// Scores with standard errors.
    Scores(ScoreTable),
    /// Outlier statistics.
    Outliers(OutlierTable),
    /// Combined barcode map, sorted by value.
    BarcodeMap(Vec<(String, String)>),
}

/// Keyed table storage.
pub trait TableStore {
    /// Whether `key` holds a table.
    fn contains(&self, key: &str) -> bool;

    /// Store `table` under `key`, replacing any existing table.
    fn put(&mut self, key: &str, table: Table);

    /// Table under `key`, if present.
    fn get(&self, key: &str) -> Option<&Table>;

    /// Remove and return the table under `key`.
    fn remove(&mut self, key: &str) -> Option<Table>;

    /// All populated keys, in order.
    fn keys(&self) -> Vec<String>;

    /// Attach key-value metadata to the table under `table_key`,
    /// replacing any metadata already recorded for it.
    fn set_metadata(&mut self, table_key: &str, metadata: BTreeMap<String, String>);

    /// Metadata recorded for the table under `table_key`, if any.
    fn get_metadata(&self, table_key: &str) -> Option<&BTreeMap<String, String>>;
}

/// In-memory [`TableStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
    metadata: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn contains(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    fn put(&mut self, key: &str, table: Table) {
        self.tables.insert(key.to_string(), table);
    }

    fn get(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    fn remove(&mut self, key: &str) -> Option<Table> {
        self.metadata.remove(key);
        self.tables.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn set_metadata(&mut self, table_key: &str, metadata: BTreeMap<String, String>) {
        self.metadata.insert(table_key.to_string(), metadata);
    }

    fn get_metadata(&self, table_key: &str) -> Option<&BTreeMap<String, String>> {
        self.metadata.get(table_key)
    }
}

/// Fetch a required single-pass counts table.
pub fn require_counts<'a>(
    store: &'a dyn TableStore,
    name: &str,
    key: &str,
) -> Result<&'a CountTable, ConsistencyError> {
    match store.get(key) {
        None => Err(ConsistencyError::MissingTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Counts(table)) if table.is_empty() => Err(ConsistencyError::EmptyTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Counts(table)) => Ok(table),
        Some(_) => Err(ConsistencyError::WrongTableKind {
            name: name.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Fetch a required multi-timepoint counts table.
pub fn require_wide<'a>(
    store: &'a dyn TableStore,
    name: &str,
    key: &str,
) -> Result<&'a WideTable, ConsistencyError> {
    match store.get(key) {
        None => Err(ConsistencyError::MissingTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Wide(table)) if table.is_empty() => Err(ConsistencyError::EmptyTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Wide(table)) => Ok(table),
        Some(_) => Err(ConsistencyError::WrongTableKind {
            name: name.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Fetch a required score table.
pub fn require_scores<'a>(
    store: &'a dyn TableStore,
    name: &str,
    key: &str,
) -> Result<&'a ScoreTable, ConsistencyError> {
    match store.get(key) {
        None => Err(ConsistencyError::MissingTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Scores(table)) if table.is_empty() => Err(ConsistencyError::EmptyTable {
            name: name.to_string(),
            key: key.to_string(),
        }),
        Some(Table::Scores(table)) => Ok(table),
        Some(_) => Err(ConsistencyError::WrongTableKind {
            name: name.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Key for a library's single-pass counts.
pub fn raw_counts_key(label: &str) -> String {
    format!("raw/{label}/counts")
}

/// Key for a selection's merged, unfiltered counts.
pub fn unfiltered_counts_key(label: &str) -> String {
    format!("main/{label}/counts_unfiltered")
}

/// Key for a selection's filtered, canonical counts.
pub fn counts_key(label: &str) -> String {
    format!("main/{label}/counts")
}

/// Key for a selection's combined barcode map.
pub const BARCODE_MAP_KEY: &str = "main/barcodemap";

/// Key for a selection's scores.
pub fn scores_key(label: &str) -> String {
    format!("main/{label}/scores")
}

/// Key for a selection's outlier statistics.
pub fn outliers_key(label: &str) -> String {
    format!("main/{label}/outliers")
}
