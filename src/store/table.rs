//! Table shapes held by a [`TableStore`](super::TableStore).
//!
//! All tables key rows by the element string (variant, barcode, identifier,
//! or protein change) and keep rows in key order so serialized output and
//! test assertions are deterministic.

use std::collections::BTreeMap;

/// Single-pass counts: element key to observation count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    rows: BTreeMap<String, u64>,
}

impl CountTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` observations of `key`.
    pub fn add(&mut self, key: &str, count: u64) {
        *self.rows.entry(key.to_string()).or_insert(0) += count;
    }

    /// Count for `key`, if observed.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.rows.get(key).copied()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Total observations across all keys.
    pub fn total(&self) -> u64 {
        self.rows.values().sum()
    }

    /// Drop rows with counts below `minimum`, returning the total count
    /// removed.
    pub fn retain_min_count(&mut self, minimum: u64) -> u64 {
        let before = self.total();
        self.rows.retain(|_, count| *count >= minimum);
        before - self.total()
    }
}

impl FromIterator<(String, u64)> for CountTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, count) in iter {
            table.add(&key, count);
        }
        table
    }
}

/// Multi-timepoint counts with one column per timepoint.
///
/// A `None` cell records that the element was unobserved at that timepoint,
/// which is distinct from a zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    timepoints: Vec<u32>,
    rows: BTreeMap<String, Vec<Option<u64>>>,
}

impl WideTable {
    /// Empty table over the given timepoint columns.
    pub fn new(timepoints: Vec<u32>) -> Self {
        Self {
            timepoints,
            rows: BTreeMap::new(),
        }
    }

    /// Timepoint column headers, in ascending order.
    pub fn timepoints(&self) -> &[u32] {
        &self.timepoints
    }

    /// Set one cell. Rows are created on demand with all cells unobserved.
    pub fn set(&mut self, key: &str, timepoint_index: usize, count: u64) {
        let width = self.timepoints.len();
        let row = self
            .rows
            .entry(key.to_string())
            .or_insert_with(|| vec![None; width]);
        row[timepoint_index] = Some(count);
    }

    /// Row for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&[Option<u64>]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<u64>])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Rows observed at every timepoint, with the `None`s unwrapped.
    pub fn complete_cases(&self) -> WideTable {
        let mut filtered = WideTable::new(self.timepoints.clone());
        for (key, row) in &self.rows {
            if row.iter().all(Option::is_some) {
                filtered.rows.insert(key.clone(), row.clone());
            }
        }
        filtered
    }
}

/// Per-element scores with standard errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    rows: BTreeMap<String, ScoreRow>,
}

/// One scored element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRow {
    /// Point estimate.
    pub score: f64,
    /// Standard error of the estimate.
    pub se: f64,
}

impl ScoreRow {
    /// Variance of the estimate.
    pub fn variance(&self) -> f64 {
        self.se * self.se
    }
}

impl ScoreTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row.
    pub fn insert(&mut self, key: &str, score: f64, se: f64) {
        self.rows.insert(key.to_string(), ScoreRow { score, se });
    }

    /// Row for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&ScoreRow> {
        self.rows.get(key)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScoreRow)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Component-vs-parent outlier statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierTable {
    rows: BTreeMap<String, OutlierRow>,
}

/// Outlier test result for one component element.
///
/// Fields are `None` when the test was not applicable: the component's
/// parent is missing from the parent table, the parent has too few
/// components, or the component is the wild-type sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierRow {
    /// Parent element this component collapses into.
    pub parent: Option<String>,
    /// Absolute z statistic of the component against its parent.
    pub z: Option<f64>,
    /// Two-sided p-value for the z statistic.
    pub pvalue: Option<f64>,
}

impl OutlierTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row.
    pub fn insert(&mut self, key: &str, row: OutlierRow) {
        self.rows.insert(key.to_string(), row);
    }

    /// Row for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&OutlierRow> {
        self.rows.get(key)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutlierRow)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_table_accumulates() {
        let mut table = CountTable::new();
        table.add("a", 2);
        table.add("a", 3);
        table.add("b", 1);
        assert_eq!(table.get("a"), Some(5));
        assert_eq!(table.total(), 6);
    }

    #[test]
    fn count_table_min_count_filter() {
        let mut table = CountTable::new();
        table.add("keep", 10);
        table.add("drop", 2);
        assert_eq!(table.retain_min_count(5), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("keep"), Some(10));
    }

    #[test]
    fn wide_table_distinguishes_unobserved_from_zero() {
        let mut table = WideTable::new(vec![0, 1]);
        table.set("v", 0, 0);
        let row = table.get("v").unwrap();
        assert_eq!(row, &[Some(0), None]);
    }

    #[test]
    fn complete_cases_drops_partial_rows() {
        let mut table = WideTable::new(vec![0, 1, 2]);
        table.set("v1", 0, 5);
        table.set("v1", 2, 3);
        table.set("v2", 0, 4);
        table.set("v2", 1, 1);
        table.set("v2", 2, 7);
        let complete = table.complete_cases();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete.get("v2").unwrap(), &[Some(4), Some(1), Some(7)]);
    }

    #[test]
    fn score_row_variance() {
        let row = ScoreRow { score: 1.0, se: 0.5 };
        assert!((row.variance() - 0.25).abs() < 1e-12);
    }
}
