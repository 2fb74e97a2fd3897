//! Integration tests for the variant-calling engine.

use std::sync::Arc;

use mutscan::errors::DataError;
use mutscan::sequence::{Aligner, ReferenceSequence};
use mutscan::variant::{CallOutcome, VariantCaller};

fn caller(dna: &str, coding: bool, offset: usize, align: bool) -> VariantCaller {
    let reference = Arc::new(ReferenceSequence::new("wt", dna, coding, offset).unwrap());
    let aligner = align.then(Aligner::with_default_matrix);
    VariantCaller::new(reference, aligner, 10)
}

fn expect_variant(outcome: CallOutcome) -> String {
    match outcome {
        CallOutcome::Variant(v) => v,
        other => panic!("expected a variant, got {other:?}"),
    }
}

#[test]
fn reads_equal_to_the_reference_are_wild_type() {
    let mut caller = caller("ACGTACGTA", true, 0, false);
    assert_eq!(caller.call("ACGTACGTA").unwrap(), CallOutcome::WildType);
    // Case-insensitive input.
    assert_eq!(caller.call("acgtacgta").unwrap(), CallOutcome::WildType);
}

#[test]
fn single_substitutions_use_offset_adjusted_coordinates() {
    for position in 0..6 {
        let mut caller = caller("AAAAAA", false, 12, false);
        let mut read = "AAAAAA".to_string().into_bytes();
        read[position] = b'T';
        let read = String::from_utf8(read).unwrap();
        let variant = expect_variant(caller.call(&read).unwrap());
        assert_eq!(variant, format!("n.{}A>T", position + 12 + 1));
    }
}

#[test]
fn coding_substitution_carries_the_protein_change() {
    let mut caller = caller("AAAAAA", true, 0, false);
    let variant = expect_variant(caller.call("AAAAAC").unwrap());
    assert_eq!(variant, "c.6A>C (p.Lys2Asn)");
}

#[test]
fn multiple_substitutions_stay_in_position_order() {
    let mut caller = caller("AAAAAA", false, 0, false);
    let variant = expect_variant(caller.call("CAAAGA").unwrap());
    assert_eq!(variant, "n.1A>C, n.5A>G");
}

#[test]
fn stop_codon_renders_ter() {
    // TAA is a stop codon.
    let mut caller = caller("AAAAAA", true, 0, false);
    let variant = expect_variant(caller.call("TAAAAA").unwrap());
    assert_eq!(variant, "c.1A>T (p.Lys1Ter)");
}

#[test]
fn shorter_read_is_called_as_a_frameshift_deletion() {
    let mut caller = caller("AAACCCGGG", true, 0, true);
    let variant = expect_variant(caller.call("AAAGGG").unwrap());
    assert_eq!(variant, "c.4_6del (p.Pro2fs)");
}

#[test]
fn longer_read_is_called_as_an_insertion() {
    let mut caller = caller("AAAGGGCCC", true, 0, true);
    let variant = expect_variant(caller.call("AAATTGGGCCC").unwrap());
    assert!(variant.contains("ins") || variant.contains("dup"), "{variant}");
    assert!(variant.contains("fs)"), "{variant}");
}

#[test]
fn length_mismatch_without_aligner_is_rejected_not_miscalled() {
    let mut caller = caller("AAACCCGGG", true, 0, false);
    assert_eq!(
        caller.call("AAAGGG").unwrap(),
        CallOutcome::Rejected(DataError::LengthMismatchWithoutAligner)
    );
}

#[test]
fn mutation_budget_rejects_noisy_reads() {
    let reference = Arc::new(ReferenceSequence::new("wt", "AAAAAAAAA", false, 0).unwrap());
    let mut caller = VariantCaller::new(reference, None, 2);
    assert_eq!(
        caller.call("TTTAAAAAA").unwrap(),
        CallOutcome::Rejected(DataError::ExcessMutations { max_mutations: 2 })
    );
}

#[test]
fn budget_overflow_with_aligner_still_rejects_true_excess() {
    let reference = Arc::new(ReferenceSequence::new("wt", "AAAAAAAAA", false, 0).unwrap());
    let mut caller = VariantCaller::new(reference, Some(Aligner::with_default_matrix()), 2);
    // Alignment re-derives the same three substitutions; still over budget.
    assert_eq!(
        caller.call("TTTAAAAAA").unwrap(),
        CallOutcome::Rejected(DataError::ExcessMutations { max_mutations: 2 })
    );
}
