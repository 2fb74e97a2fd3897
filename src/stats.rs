//! Component-vs-parent outlier statistics.
//!
//! After scoring, element labels that collapse into a coarser label (barcodes
//! into variants or identifiers, variants into synonymous groups) can be
//! checked for components whose score disagrees with their parent's.

use std::collections::BTreeMap;

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::score::is_wild_type_key;
use crate::store::{OutlierRow, OutlierTable, ScoreTable};

/// Default minimum number of components a parent needs before its
/// components are tested.
pub const DEFAULT_MINIMUM_COMPONENTS: usize = 4;

/// Compute outlier statistics for every scored component.
///
/// `mapping` sends each component key to its parent key. For a component
/// `c` with parent `p`, the statistic is
/// `z = |score(p) - score(c)| / sqrt(var(p) + var(c))` with the two-sided
/// normal-tail p-value `2 * (1 - Phi(z))`.
///
/// Every scored component gets a row. The z and p fields are left
/// not-applicable when the component is the wild-type sentinel, its parent
/// is absent from the parent table, or the parent has fewer than
/// `minimum_components` scored components.
pub fn component_outliers(
    parents: &ScoreTable,
    components: &ScoreTable,
    mapping: &BTreeMap<String, String>,
    minimum_components: usize,
) -> OutlierTable {
    let mut components_per_parent: BTreeMap<&str, usize> = BTreeMap::new();
    for (key, _) in components.iter() {
        if let Some(parent) = mapping.get(key) {
            *components_per_parent.entry(parent.as_str()).or_insert(0) += 1;
        }
    }

    // Unit normal; the parameters are constants so construction cannot fail.
    let normal = Normal::new(0.0, 1.0)
        .unwrap_or_else(|_| unreachable!("unit normal parameters are valid"));

    let mut table = OutlierTable::new();
    let mut tested = 0usize;
    for (key, component) in components.iter() {
        let parent_key = mapping.get(key);
        let mut row = OutlierRow {
            parent: parent_key.cloned(),
            z: None,
            pvalue: None,
        };

        if !is_wild_type_key(key) {
            if let Some(parent_key) = parent_key {
                let eligible = components_per_parent
                    .get(parent_key.as_str())
                    .is_some_and(|n| *n >= minimum_components);
                if eligible {
                    if let Some(parent) = parents.get(parent_key) {
                        let spread = (parent.variance() + component.variance()).sqrt();
                        let z = (parent.score - component.score).abs() / spread;
                        row.z = Some(z);
                        row.pvalue = Some(2.0 * (1.0 - normal.cdf(z)));
                        tested += 1;
                    }
                }
            }
        }
        table.insert(key, row);
    }

    debug!(
        components = table.len(),
        tested, minimum_components, "computed outlier statistics"
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn z_and_pvalue_for_a_disagreeing_component() {
        let mut parents = ScoreTable::new();
        parents.insert("v1", 1.0, 0.01f64.sqrt());
        let mut components = ScoreTable::new();
        components.insert("b1", 1.5, 0.02f64.sqrt());
        components.insert("b2", 1.0, 0.1);
        components.insert("b3", 1.0, 0.1);
        components.insert("b4", 1.0, 0.1);
        let map = mapping(&[("b1", "v1"), ("b2", "v1"), ("b3", "v1"), ("b4", "v1")]);

        let outliers = component_outliers(&parents, &components, &map, 4);
        let row = outliers.get("b1").unwrap();
        assert_eq!(row.parent.as_deref(), Some("v1"));
        let z = row.z.unwrap();
        assert!((z - 0.5 / 0.03f64.sqrt()).abs() < 1e-9);
        assert!((row.pvalue.unwrap() - 0.0039).abs() < 1e-4);
    }

    #[test]
    fn parents_below_the_component_floor_are_skipped() {
        let mut parents = ScoreTable::new();
        parents.insert("v1", 1.0, 0.1);
        let mut components = ScoreTable::new();
        components.insert("b1", 1.5, 0.1);
        components.insert("b2", 0.5, 0.1);
        let map = mapping(&[("b1", "v1"), ("b2", "v1")]);

        let outliers = component_outliers(&parents, &components, &map, 4);
        let row = outliers.get("b1").unwrap();
        assert_eq!(row.parent.as_deref(), Some("v1"));
        assert!(row.z.is_none());
        assert!(row.pvalue.is_none());
    }

    #[test]
    fn unmapped_components_keep_a_blank_row() {
        let parents = ScoreTable::new();
        let mut components = ScoreTable::new();
        components.insert("b1", 1.5, 0.1);
        let outliers = component_outliers(&parents, &components, &BTreeMap::new(), 1);
        let row = outliers.get("b1").unwrap();
        assert!(row.parent.is_none());
        assert!(row.z.is_none());
    }

    #[test]
    fn wild_type_rows_are_not_applicable() {
        let mut parents = ScoreTable::new();
        parents.insert("_wt", 0.0, 0.01);
        let mut components = ScoreTable::new();
        components.insert("_wt", 0.0, 0.01);
        for i in 0..4 {
            components.insert(&format!("b{i}"), 0.1, 0.1);
        }
        let mut map = mapping(&[("b0", "_wt"), ("b1", "_wt"), ("b2", "_wt"), ("b3", "_wt")]);
        map.insert("_wt".to_string(), "_wt".to_string());

        let outliers = component_outliers(&parents, &components, &map, 4);
        let wt = outliers.get("_wt").unwrap();
        assert!(wt.z.is_none());
        assert!(wt.pvalue.is_none());
        assert!(outliers.get("b0").unwrap().z.is_some());
    }
}
