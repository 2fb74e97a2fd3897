//! End-to-end tests for the selection pipeline: counting, merging,
//! filtering, barcode-map combination, scoring, and outlier detection.

use std::io::Write;
use std::sync::Arc;

use mutscan::score::RatioScorer;
use mutscan::sequence::ReferenceSequence;
use mutscan::store::{Table, TableStore};
use mutscan::tree::{CountSource, Library, LibraryKind, Selection};
use mutscan::{BarcodeIndex, ValueMode, VariantCaller};

const LYS2ASN: &str = "c.6A>C (p.Lys2Asn)";

/// Barcode map over the coding reference AAAAAA: four barcodes share one
/// missense variant, one maps to a synonymous change, one to the wild
/// type, and one to a variant only present at timepoint 0.
fn barcode_index() -> Arc<BarcodeIndex> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "AAAA AAAAAA\n\
         CCCC AAAAAC\n\
         GGGG AAAAAC\n\
         ACGT AAAAAC\n\
         AGGA AAAAAC\n\
         TTTT AAAAAG\n\
         CACA AAACAA\n"
    )
    .unwrap();
    Arc::new(BarcodeIndex::load(file.path(), ValueMode::VariantDna).unwrap())
}

fn barcode_variant_library(
    name: &str,
    timepoint: u32,
    map: &Arc<BarcodeIndex>,
    pairs: &[(&str, u64)],
) -> Library {
    let reference = Arc::new(ReferenceSequence::new(name, "AAAAAA", true, 0).unwrap());
    let caller = VariantCaller::new(reference, None, 10);
    let pairs = pairs.iter().map(|(k, c)| (k.to_string(), *c)).collect();
    Library::new(
        name,
        timepoint,
        LibraryKind::BarcodeVariant {
            map: Arc::clone(map),
            caller,
        },
        CountSource::Pairs(pairs),
    )
}

fn build_selection() -> Selection {
    let map = barcode_index();
    let t0 = barcode_variant_library(
        "t0",
        0,
        &map,
        &[
            ("AAAA", 100),
            ("CCCC", 10),
            ("GGGG", 10),
            ("ACGT", 10),
            ("AGGA", 10),
            ("TTTT", 10),
            ("CACA", 7),
        ],
    );
    let t1 = barcode_variant_library(
        "t1",
        1,
        &map,
        &[
            ("AAAA", 100),
            ("CCCC", 40),
            ("GGGG", 40),
            ("ACGT", 40),
            ("AGGA", 5),
            ("TTTT", 10),
        ],
    );
    Selection::new("sel", vec![t0, t1], Box::new(RatioScorer))
        .unwrap()
        .with_component_outliers(4)
}

fn wide<'a>(selection: &'a Selection, key: &str) -> &'a mutscan::store::WideTable {
    match selection.store().get(key) {
        Some(Table::Wide(table)) => table,
        other => panic!("expected wide table at {key}, got {other:?}"),
    }
}

#[test]
fn pipeline_produces_every_expected_table() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    for key in [
        "main/barcodes/counts_unfiltered",
        "main/barcodes/counts",
        "main/variants/counts_unfiltered",
        "main/variants/counts",
        "main/synonymous/counts",
        "main/barcodemap",
        "main/barcodes/scores",
        "main/variants/scores",
        "main/synonymous/scores",
        "main/barcodes/outliers",
        "main/variants/outliers",
    ] {
        assert!(selection.store().contains(key), "missing {key}");
    }
}

#[test]
fn merge_marks_unseen_cells_unobserved_and_filter_drops_them() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    let unfiltered = wide(&selection, "main/barcodes/counts_unfiltered");
    assert_eq!(unfiltered.get("CACA").unwrap(), &[Some(7), None]);
    assert_eq!(unfiltered.get("CCCC").unwrap(), &[Some(10), Some(40)]);

    let filtered = wide(&selection, "main/barcodes/counts");
    assert!(filtered.get("CACA").is_none());
    assert!(filtered.get("CCCC").is_some());

    // The variant observed only at timepoint 0 is dropped too.
    let variants = wide(&selection, "main/variants/counts");
    assert!(variants.get("c.4A>C (p.Lys2Gln)").is_none());
}

#[test]
fn variant_counts_sum_over_barcodes_sharing_a_variant() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    let variants = wide(&selection, "main/variants/counts");
    assert_eq!(variants.get(LYS2ASN).unwrap(), &[Some(40), Some(125)]);
    assert_eq!(variants.get("_wt").unwrap(), &[Some(100), Some(100)]);

    let synonymous = wide(&selection, "main/synonymous/counts");
    assert_eq!(synonymous.get("p.Lys2Asn").unwrap(), &[Some(40), Some(125)]);
    assert_eq!(synonymous.get("_sy").unwrap(), &[Some(10), Some(10)]);
}

#[test]
fn combined_barcode_map_is_sorted_by_value() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    let entries = match selection.store().get("main/barcodemap") {
        Some(Table::BarcodeMap(entries)) => entries,
        other => panic!("expected barcode map, got {other:?}"),
    };
    assert_eq!(entries.len(), 7);
    let values: Vec<&str> = entries.iter().map(|(_, v)| v.as_str()).collect();
    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(values, sorted);
}

#[test]
fn barcode_outliers_are_tested_against_their_variant() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    let outliers = match selection.store().get("main/barcodes/outliers") {
        Some(Table::Outliers(table)) => table,
        other => panic!("expected outlier table, got {other:?}"),
    };

    // Four barcodes share the missense parent, meeting the component floor.
    let row = outliers.get("AGGA").unwrap();
    assert_eq!(row.parent.as_deref(), Some(LYS2ASN));
    assert!(row.z.is_some());
    assert!(row.pvalue.is_some());

    // AGGA dropped while its siblings rose; it should look most extreme.
    let agga_z = outliers.get("AGGA").unwrap().z.unwrap();
    let cccc_z = outliers.get("CCCC").unwrap().z.unwrap();
    assert!(agga_z > cccc_z);

    // The wild-type barcode has a parent but no statistics.
    let wt_row = outliers.get("AAAA").unwrap();
    assert_eq!(wt_row.parent.as_deref(), Some("_wt"));
    assert!(wt_row.z.is_none());
}

#[test]
fn variant_outliers_respect_the_component_floor() {
    let mut selection = build_selection();
    selection.calculate().unwrap();

    let outliers = match selection.store().get("main/variants/outliers") {
        Some(Table::Outliers(table)) => table,
        other => panic!("expected outlier table, got {other:?}"),
    };
    // No synonymous group collects four variants, so nothing is tested.
    for (_, row) in outliers.iter() {
        assert!(row.z.is_none());
    }
}

#[test]
fn recalculate_is_idempotent_across_the_whole_store() {
    let mut selection = build_selection();
    selection.calculate().unwrap();
    let keys = selection.store().keys();
    let before: Vec<_> = keys
        .iter()
        .map(|k| (k.clone(), selection.store().get(k).cloned()))
        .collect();

    selection.calculate().unwrap();
    assert_eq!(selection.store().keys(), keys);
    for (key, table) in before {
        assert_eq!(selection.store().get(&key), table.as_ref());
    }
}

#[test]
fn unmapped_barcodes_are_rejected_per_read_not_fatally() {
    let map = barcode_index();
    let t0 = barcode_variant_library("t0", 0, &map, &[("AAAA", 5), ("CCCC", 3), ("TGTG", 9)]);
    let t1 = barcode_variant_library("t1", 1, &map, &[("AAAA", 5), ("CCCC", 4)]);
    let mut selection = Selection::new("sel", vec![t0, t1], Box::new(RatioScorer)).unwrap();
    selection.calculate().unwrap();

    let lib = &selection.libraries()[&0][0];
    assert_eq!(lib.rejections().rejected().values().sum::<u64>(), 9);

    let barcodes = wide(&selection, "main/barcodes/counts");
    assert!(barcodes.get("TGTG").is_none());
}
